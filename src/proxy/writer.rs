//! Config file writer.

use std::path::Path;

use crate::pool::PoolConfiguration;
use crate::proxy::error::{ProxyError, ProxyResult};

/// Render `pools` as YAML and overwrite `path` with it.
pub async fn write_config(path: &Path, pools: &PoolConfiguration) -> ProxyResult<()> {
    let rendered = pools.to_yaml()?;

    tokio::fs::write(path, rendered)
        .await
        .map_err(|source| ProxyError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %path.display(), pools = pools.len(), "Config written");
    Ok(())
}
