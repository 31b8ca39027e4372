//! Write a starter configuration file.

use std::path::Path;

use tracing::info;

use crate::config::DEFAULT_CONFIG_TEMPLATE;
use crate::error::{ServerError, ServerResult};

/// Execute the init command.
pub fn init(path: &Path, force: bool) -> ServerResult<String> {
    if path.exists() && !force {
        return Err(ServerError::ConfigExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    info!(path = %path.display(), "Wrote config");
    Ok(format!("Wrote {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("walletgate.toml");
        init(&path, false).unwrap();
        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.server.confirmation_timeout_secs, 60);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("walletgate.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        assert!(matches!(init(&path, false), Err(ServerError::ConfigExists(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        init(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TEMPLATE);
    }
}
