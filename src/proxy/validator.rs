//! Offline config validation (`<binary> -t -c <path>`).

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tokio::time;

use crate::proxy::error::{ProxyError, ProxyResult};

/// Run the proxy in test mode against `path`.
///
/// Succeeds only when the proxy exits with status zero. The child is killed
/// if it outlives `timeout`.
pub async fn validate_config(binary: &str, path: &Path, timeout: Duration) -> ProxyResult<()> {
    let mut cmd = Command::new(binary);
    cmd.arg("-t").arg("-c").arg(path).kill_on_drop(true);

    let output = match time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map_err(|source| ProxyError::Validate {
            binary: binary.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ProxyError::ValidateTimeout {
                secs: timeout.as_secs(),
            })
        }
    };

    if output.status.success() {
        return Ok(());
    }

    let mut text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stdout.trim());
    }

    Err(ProxyError::Invalid {
        code: output.status.code(),
        output: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_zero_exit_is_valid() {
        validate_config("true", Path::new("/nonexistent.yml"), TIMEOUT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_invalid() {
        let err = validate_config("false", Path::new("/nonexistent.yml"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Invalid { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let err = validate_config("/definitely/not/a/proxy", Path::new("x.yml"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Validate { .. }));
    }
}
