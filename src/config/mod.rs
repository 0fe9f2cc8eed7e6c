//! Configuration for Roteiro.
//!
//! Preferences live in `config.kdl` inside the workspace's storage directory
//! (`~/.local/share/roteiro/<workspace-hash>/config.kdl`):
//!
//! - `output-format` - "json" or "human"
//! - `default-user` - email of the user commands act as
//! - `default-product` - product tag for new items
//! - `default-duration-months` - duration for new dated items (1-36)
//! - `action-log-enabled` - whether commands are recorded in action.log
//!
//! Use the [`resolver`] module for precedence resolution against CLI flags
//! and environment variables.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, USER_ENV, ValueSource, resolve_config,
};
pub use schema::{OutputFormat, RoteiroConfig};

use crate::storage::Storage;
use crate::{Error, Result};
use kdl::KdlDocument;
use std::fs;
use std::path::PathBuf;

/// Config file name inside a workspace's storage directory.
pub const CONFIG_FILE: &str = "config.kdl";

/// Path of the workspace config file.
pub fn config_path(storage: &Storage) -> PathBuf {
    storage.root().join(CONFIG_FILE)
}

/// Load the workspace config. A missing file yields an empty config.
pub fn load_config(storage: &Storage) -> Result<RoteiroConfig> {
    let path = config_path(storage);
    if !path.exists() {
        return Ok(RoteiroConfig::new());
    }
    let content = fs::read_to_string(&path)?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(RoteiroConfig::from_kdl(&doc))
}

/// Validate and write the workspace config.
pub fn save_config(storage: &Storage, config: &RoteiroConfig) -> Result<()> {
    config.validate().map_err(Error::Config)?;
    fs::write(config_path(storage), config.to_kdl().to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_missing_config_is_empty() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        assert_eq!(load_config(&storage).unwrap(), RoteiroConfig::new());
    }

    #[test]
    fn test_save_and_load() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let mut config = RoteiroConfig::new();
        config.set("default-user", "ana@example.com").unwrap();
        config.set("default-duration-months", "3").unwrap();
        save_config(&storage, &config).unwrap();

        assert_eq!(load_config(&storage).unwrap(), config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        fs::write(config_path(&storage), "output-format \"human").unwrap();
        assert!(matches!(load_config(&storage), Err(Error::Config(_))));
    }
}
