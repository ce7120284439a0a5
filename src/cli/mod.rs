//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use dialoguer::FuzzySelect;
use zeroize::Zeroizing;

use crate::config::{self, Settings};
use crate::errors::{RabbitHoleError, Result};
use crate::vault::{LockedVault, UnlockedVault};

/// Environment variable holding the vault password for scripted use.
pub const PASSWORD_ENV: &str = "RABBITHOLE_PASSWORD";

/// Passwords shorter than this get a warning at `init`.
const MIN_PASSWORD_LEN: usize = 8;

/// Interactive unlock attempts before giving up.
const MAX_UNLOCK_ATTEMPTS: usize = 3;

/// RabbitHole CLI: password-protected API key vault.
#[derive(Parser)]
#[command(
    name = "rabbithole",
    about = "Password-protected API key vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default: ~/RabbitHole/config)
    #[arg(long, global = true, env = config::CONFIG_DIR_ENV)]
    pub config_dir: Option<PathBuf>,

    /// Profile to use (default: the configured default profile)
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new profile and its vault
    Init {
        /// Profile name (letters, digits, '-', '_')
        #[arg(value_name = "PROFILE")]
        name: String,

        /// Vault database path (default: <config-dir>/vaults/<profile>.db)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Add an API key to the vault
    Add {
        /// Label for the key (omit for interactive prompt)
        label: Option<String>,
    },

    /// Copy an API key to the clipboard
    Get {
        /// Label of the key (omit to pick from a list)
        label: Option<String>,

        /// Print the value to stdout instead of copying it
        #[arg(long)]
        print: bool,
    },

    /// List stored labels
    List,

    /// List configured profiles
    Profiles,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Resolved config directory plus the settings loaded from it.
pub struct Context {
    pub config_dir: PathBuf,
    pub settings: Settings,
}

impl Context {
    /// Resolve the config dir from the CLI arguments and load its settings.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_dir = config::resolve_config_dir(cli.config_dir.clone())?;
        let settings = Settings::load(&config_dir)?;
        Ok(Self {
            config_dir,
            settings,
        })
    }

    /// Pick the profile for this invocation.
    ///
    /// Order: `--profile`, the configured default, the only profile, then
    /// an interactive picker when stdin is a terminal.
    pub fn resolve_profile(&self, cli: &Cli) -> Result<String> {
        if let Some(name) = &cli.profile {
            self.settings.profile_path(name)?;
            return Ok(name.clone());
        }

        if let Some(name) = &self.settings.default_profile {
            if self.settings.profiles.contains_key(name) {
                return Ok(name.clone());
            }
            tracing::warn!(profile = %name, "default profile is not configured; ignoring");
        }

        let names = self.settings.profile_names();
        match names.len() {
            0 => Err(RabbitHoleError::NoProfiles),
            1 => Ok(names[0].clone()),
            _ if io::stdin().is_terminal() => select_from("Select profile", &names),
            _ => Err(RabbitHoleError::CommandFailed(
                "several profiles configured — pass --profile".into(),
            )),
        }
    }

    /// Open the vault behind the resolved profile (still locked).
    pub fn open_vault(&self, cli: &Cli) -> Result<(String, LockedVault)> {
        let profile = self.resolve_profile(cli)?;
        let path = self.settings.profile_path(&profile)?;
        let vault = LockedVault::open(path)?;
        tracing::debug!(profile = %profile, path = %path.display(), "vault opened");
        Ok((profile, vault))
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault password, trying in order:
/// 1. `RABBITHOLE_PASSWORD` env var (scripts)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .interact()
        .map_err(|e| RabbitHoleError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used during `init`).
///
/// Also respects `RABBITHOLE_PASSWORD` for scripted usage.  Empty
/// passwords are rejected; short ones only get a warning.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    let password = match password_from_env() {
        Some(pw) => pw,
        None => loop {
            let pw = dialoguer::Password::new()
                .with_prompt("Choose vault password")
                .with_confirmation(
                    "Confirm vault password",
                    "Passwords do not match, try again",
                )
                .allow_empty_password(true)
                .interact()
                .map(Zeroizing::new)
                .map_err(|e| RabbitHoleError::CommandFailed(format!("password prompt: {e}")))?;

            if pw.is_empty() {
                output::warning("Password cannot be empty. Try again.");
                continue;
            }
            break pw;
        },
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        output::warning(&format!(
            "Password is shorter than {MIN_PASSWORD_LEN} characters — consider a stronger one."
        ));
    }

    Ok(password)
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Unlock `vault`, re-prompting on a wrong password.
///
/// With `RABBITHOLE_PASSWORD` set there is exactly one attempt.
pub fn unlock(vault: &LockedVault) -> Result<UnlockedVault<'_>> {
    let attempts = if password_from_env().is_some() {
        1
    } else {
        MAX_UNLOCK_ATTEMPTS
    };

    let mut attempt = 1;
    loop {
        let password = prompt_password()?;
        match vault.unlock(password.as_bytes()) {
            Ok(unlocked) => return Ok(unlocked),
            Err(e) if e.is_recoverable() && attempt < attempts => {
                output::warning(&format!("{e} ({attempt}/{attempts})"));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fuzzy-pick one of `items`.  Escape cancels.
pub fn select_from(prompt: &str, items: &[String]) -> Result<String> {
    let choice = FuzzySelect::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()
        .map_err(|e| RabbitHoleError::CommandFailed(format!("selection prompt: {e}")))?;

    choice
        .and_then(|i| items.get(i).cloned())
        .ok_or(RabbitHoleError::UserCancelled)
}
