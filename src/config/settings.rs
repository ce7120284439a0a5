use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{RabbitHoleError, Result};

/// Application configuration, loaded from `<config_dir>/config.toml`.
///
/// Every field has a sensible default so RabbitHole works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Profile used when `--profile` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// Seconds before a copied secret is cleared from the clipboard.
    #[serde(default = "default_clipboard_timeout_secs")]
    pub clipboard_timeout_secs: u64,

    /// Argon2 memory cost in KiB for new vaults' password hash (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Profile name -> vault database path.
    #[serde(default)]
    pub profiles: BTreeMap<String, PathBuf>,
}

/// The `[logging]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Default level filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory.  Relative paths are resolved against the config dir.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_clipboard_timeout_secs() -> u64 {
    30
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("log")
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_profile: None,
            clipboard_timeout_secs: default_clipboard_timeout_secs(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            logging: LoggingSettings::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the config directory.
    pub const FILE_NAME: &'static str = "config.toml";

    /// Load settings from `<config_dir>/config.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned and
    /// the file is left untouched.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            RabbitHoleError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Write settings to `<config_dir>/config.toml` atomically.
    ///
    /// Writes to a temp file in the same directory, then renames it over
    /// the target so readers never see a half-written file.
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        fs::create_dir_all(config_dir)?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| RabbitHoleError::ConfigError(format!("Failed to serialize config: {e}")))?;

        let config_path = config_dir.join(Self::FILE_NAME);
        let tmp_path = config_dir.join(format!(".{}.tmp", Self::FILE_NAME));
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &config_path)?;

        tracing::debug!(path = %config_path.display(), "configuration saved");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    /// Register a new profile.  The first profile becomes the default.
    pub fn add_profile(&mut self, name: &str, db_path: &Path) -> Result<()> {
        validate_profile_name(name)?;
        if self.profiles.contains_key(name) {
            return Err(RabbitHoleError::ProfileAlreadyExists(name.to_string()));
        }

        self.profiles.insert(name.to_string(), db_path.to_path_buf());
        if self.default_profile.is_none() {
            self.default_profile = Some(name.to_string());
        }
        Ok(())
    }

    /// Look up the vault path for a profile.
    pub fn profile_path(&self, name: &str) -> Result<&Path> {
        self.profiles
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| RabbitHoleError::ProfileNotFound(name.to_string()))
    }

    /// All profile names, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Where `init` puts a profile's vault when no path is given.
    ///
    /// Example: `<config_dir>/vaults/work.db`
    pub fn default_vault_path(config_dir: &Path, profile: &str) -> PathBuf {
        config_dir.join("vaults").join(format!("{profile}.db"))
    }

    // ------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------

    /// Resolve the log directory against the config directory.
    pub fn log_dir(&self, config_dir: &Path) -> PathBuf {
        if self.logging.log_dir.is_absolute() {
            self.logging.log_dir.clone()
        } else {
            config_dir.join(&self.logging.log_dir)
        }
    }

    pub fn clipboard_timeout(&self) -> Duration {
        Duration::from_secs(self.clipboard_timeout_secs)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

/// Validate that a profile name is safe to use as a file name.
///
/// Allowed: ASCII letters, digits, hyphens, underscores.  Max 64 characters.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RabbitHoleError::ConfigError(
            "profile name cannot be empty".into(),
        ));
    }

    if name.len() > 64 {
        return Err(RabbitHoleError::ConfigError(
            "profile name cannot exceed 64 characters".into(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RabbitHoleError::ConfigError(format!(
            "profile name '{name}' is invalid — only ASCII letters, digits, hyphens, and underscores are allowed"
        )));
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
