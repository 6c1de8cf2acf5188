//! Client profile lookup

use std::path::{Path, PathBuf};

use replay_engine::ClientConfig;
use tracing::debug;

use crate::CliError;

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".replay"))
}

/// Get the user's client profile path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("client.toml"))
}

/// Load the client profile: `explicit` if given, else the user's profile if
/// it exists, else the built-in one
pub fn load_client_config(explicit: Option<&Path>) -> Result<ClientConfig, CliError> {
    if let Some(path) = explicit {
        debug!("loading client profile {:?}", path);
        return Ok(ClientConfig::load(path)?);
    }
    if let Some(path) = config_path().filter(|p| p.exists()) {
        debug!("loading client profile {:?}", path);
        return Ok(ClientConfig::load(&path)?);
    }
    Ok(ClientConfig::builtin()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "name = \"custom\"\nforks = [\"Cancun\"]\n").unwrap();

        let config = load_client_config(Some(&path)).unwrap();
        assert_eq!(config.name, "custom");
        assert!(config.supports("Cancun"));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_client_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
