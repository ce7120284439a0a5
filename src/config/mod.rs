//! Configuration: `config.toml` settings and vault profiles.

pub mod settings;

pub use settings::{validate_profile_name, LoggingSettings, Settings};

use std::path::PathBuf;

use crate::errors::{RabbitHoleError, Result};

/// Environment variable that overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "RABBITHOLE_CONFIG_DIR";

/// Resolve the config directory.
///
/// Order: explicit `--config-dir`, then `RABBITHOLE_CONFIG_DIR`, then
/// `~/RabbitHole/config`.
pub fn resolve_config_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::home_dir()
        .map(|home| home.join("RabbitHole").join("config"))
        .ok_or_else(|| {
            RabbitHoleError::ConfigError(format!(
                "cannot determine home directory; set {CONFIG_DIR_ENV} or pass --config-dir"
            ))
        })
}
