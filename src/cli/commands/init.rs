//! `rabbithole init` — register a profile and create its vault.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::output;
use crate::cli::{prompt_new_password, Context};
use crate::config::{validate_profile_name, Settings};
use crate::errors::{RabbitHoleError, Result};
use crate::vault::Vault;

/// Execute the `init` command.
pub fn execute(ctx: &mut Context, profile: &str, path: Option<PathBuf>) -> Result<()> {
    // 1. Validate the name before asking for anything.
    validate_profile_name(profile)?;
    if ctx.settings.profiles.contains_key(profile) {
        return Err(RabbitHoleError::ProfileAlreadyExists(profile.to_string()));
    }

    let vault_path =
        path.unwrap_or_else(|| Settings::default_vault_path(&ctx.config_dir, profile));
    if vault_path.exists() {
        return Err(RabbitHoleError::VaultAlreadyExists(vault_path));
    }

    // 2. Create the parent directory if it doesn't exist.
    if let Some(parent) = vault_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            output::info(&format!("Created vault directory: {}", parent.display()));
        }
    }

    // 3. Prompt for a new password and create the vault.
    let password = prompt_new_password()?;
    let params = ctx.settings.argon2_params();
    Vault::create(&vault_path, password.as_bytes(), Some(&params))?;

    // 4. Record the profile.
    let first = ctx.settings.profiles.is_empty();
    register(ctx, profile, &vault_path)?;
    tracing::info!(profile, path = %vault_path.display(), "profile created");

    output::success(&format!(
        "Vault created for profile '{profile}' at {}",
        vault_path.display()
    ));
    if first {
        output::info(&format!("'{profile}' is now the default profile."));
    }
    output::tip("Run `rabbithole add <LABEL>` to store an API key.");

    Ok(())
}

/// Record `profile` in the config file.
///
/// If that fails the freshly created vault is removed again, so a retry
/// does not trip over an unregistered file.
fn register(ctx: &mut Context, profile: &str, vault_path: &Path) -> Result<()> {
    let mut settings = ctx.settings.clone();
    let saved = settings
        .add_profile(profile, vault_path)
        .and_then(|()| settings.save(&ctx.config_dir));

    match saved {
        Ok(()) => {
            ctx.settings = settings;
            Ok(())
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(vault_path) {
                tracing::warn!(error = %rm, path = %vault_path.display(), "could not remove unregistered vault");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Argon2Params;
    use tempfile::TempDir;

    fn new_vault(dir: &Path) -> PathBuf {
        let path = dir.join("work.db");
        let fast = Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        };
        Vault::create(&path, b"pw", Some(&fast)).unwrap();
        path
    }

    #[test]
    fn register_saves_profile() {
        let tmp = TempDir::new().unwrap();
        let vault = new_vault(tmp.path());
        let mut ctx = Context {
            config_dir: tmp.path().join("config"),
            settings: Settings::default(),
        };

        register(&mut ctx, "work", &vault).unwrap();

        assert_eq!(ctx.settings.default_profile.as_deref(), Some("work"));
        let reloaded = Settings::load(&ctx.config_dir).unwrap();
        assert_eq!(reloaded.profile_path("work").unwrap(), vault.as_path());
    }

    #[test]
    fn failed_save_removes_new_vault() {
        let tmp = TempDir::new().unwrap();
        let vault = new_vault(tmp.path());

        // A regular file where the config dir should be makes saving fail.
        let blocker = tmp.path().join("config");
        fs::write(&blocker, b"").unwrap();
        let mut ctx = Context {
            config_dir: blocker,
            settings: Settings::default(),
        };

        assert!(register(&mut ctx, "work", &vault).is_err());
        assert!(!vault.exists());
        assert!(ctx.settings.profiles.is_empty());
    }
}
