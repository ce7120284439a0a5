//! `rabbithole add` — encrypt and store a new API key.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{unlock, Cli, Context};
use crate::errors::{RabbitHoleError, Result};

/// Execute the `add` command.
pub fn execute(ctx: &Context, cli: &Cli, label: Option<&str>) -> Result<()> {
    let (profile, locked) = ctx.open_vault(cli)?;
    let vault = unlock(&locked)?;

    let label = match label {
        Some(l) => l.trim().to_string(),
        None if io::stdin().is_terminal() => dialoguer::Input::<String>::new()
            .with_prompt("Label")
            .interact_text()
            .map_err(|e| RabbitHoleError::CommandFailed(format!("input prompt: {e}")))?
            .trim()
            .to_string(),
        None => {
            return Err(RabbitHoleError::CommandFailed(
                "a label is required when stdin is not a terminal".into(),
            ))
        }
    };

    // Fail on a duplicate before asking for the value.
    if vault.contains(&label)? {
        return Err(RabbitHoleError::SecretAlreadyExists(label));
    }

    let value = read_value(&label)?;
    vault.add_secret(&label, &value)?;

    output::success(&format!(
        "API key '{label}' added to profile '{profile}' ({} total)",
        vault.secret_count()?
    ));
    output::tip(&format!("Run `rabbithole get {label}` to copy it."));

    Ok(())
}

/// Read the secret from piped stdin, or a hidden prompt on a terminal.
fn read_value(label: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = Zeroizing::new(buf.trim_end_matches(['\r', '\n']).to_string());
        return Ok(trimmed);
    }

    dialoguer::Password::new()
        .with_prompt(format!("Enter value for {label}"))
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| RabbitHoleError::CommandFailed(format!("input prompt: {e}")))
}
