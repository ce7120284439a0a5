//! `rabbithole get` — decrypt an API key to the clipboard or stdout.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use crate::cli::output;
use crate::cli::{select_from, unlock, Cli, Context};
use crate::clipboard::{self, SystemClipboard};
use crate::errors::{RabbitHoleError, Result};

/// Execute the `get` command.
pub fn execute(ctx: &Context, cli: &Cli, label: Option<&str>, print: bool) -> Result<()> {
    let (_profile, locked) = ctx.open_vault(cli)?;

    // Labels are stored in clear, so pick one before asking for the password.
    let label = match label {
        Some(l) => l.to_string(),
        None => {
            let labels: Vec<String> = locked
                .list_secrets()?
                .into_iter()
                .map(|m| m.label)
                .collect();
            if labels.is_empty() {
                output::info("No API keys in this vault yet.");
                return Ok(());
            }
            if !io::stdin().is_terminal() {
                return Err(RabbitHoleError::CommandFailed(
                    "a label is required when stdin is not a terminal".into(),
                ));
            }
            select_from("Select API key", &labels)?
        }
    };

    let vault = unlock(&locked)?;
    let value = vault.reveal_secret(&label)?;

    if print {
        println!("{}", value.as_str());
        return Ok(());
    }

    let timeout = ctx.settings.clipboard_timeout();
    let clear = clipboard::copy_secret(Arc::new(SystemClipboard::new()?), &value, timeout)?;
    drop(value);

    output::success(&format!(
        "Copied '{label}' to the clipboard; clearing in {}s.",
        timeout.as_secs()
    ));

    // SIGINT would otherwise kill the process with the key still copied.
    let trigger = clear.trigger();
    match ctrlc::set_handler(move || trigger.fire()) {
        Ok(()) => output::tip("Press Ctrl-C to clear it now."),
        Err(e) => tracing::warn!(error = %e, "could not install Ctrl-C handler"),
    }

    clear.wait();
    output::info("Clipboard cleared.");
    Ok(())
}
