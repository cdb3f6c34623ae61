//! twemproxy-sync
//!
//! Keeps twemproxy (`nutcracker`) pools in line with cluster state.
//!
//! # Architecture Overview
//!
//! ```text
//!   state feed ──PUT /v1/state──▶ http ──▶ sync::Synchronizer   (one update at a time)
//!                                              │
//!                                              ├─▶ pool::compile        snapshot → pools
//!                                              ├─▶ diff vs last applied (unchanged → done)
//!                                              ├─▶ proxy::writer        YAML → config path
//!                                              ├─▶ proxy::validator     nutcracker -t -c
//!                                              └─▶ proxy::supervisor    start / SIGUSR1
//! ```

use std::path::PathBuf;

use clap::Parser;

use twemproxy_sync::config::loader::{read_config, ConfigError};
use twemproxy_sync::config::validation::validate_config;
use twemproxy_sync::config::SyncConfig;
use twemproxy_sync::lifecycle::startup;
use twemproxy_sync::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "twemproxy-sync", version)]
#[command(about = "Keeps twemproxy pools in sync with cluster state", long_about = None)]
struct Cli {
    /// Address to accept state deliveries on
    #[arg(short = 'u', long = "listen")]
    listen: Option<String>,

    /// IP address every pool binds to
    #[arg(short = 'b', long = "bind")]
    bind: Option<String>,

    /// twemproxy config path
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Extra args for twemproxy, space separated
    #[arg(short = 'a', long = "args", allow_hyphen_values = true)]
    args: Option<String>,

    /// twemproxy binary
    #[arg(long)]
    binary: Option<String>,

    /// TOML settings file; flags override its values
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<SyncConfig, ConfigError> {
        let mut config = match &self.settings {
            Some(path) => read_config(path)?,
            None => SyncConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(bind) = self.bind {
            config.proxy.bind_host = bind;
        }
        if let Some(path) = self.config {
            config.proxy.config_path = path;
        }
        if let Some(args) = self.args {
            config.proxy.extra_args = split_args(&args);
        }
        if let Some(binary) = self.binary {
            config.proxy.binary = binary;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        extra_args = ?config.proxy.extra_args,
        "twemproxy-sync starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
