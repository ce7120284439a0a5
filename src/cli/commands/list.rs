//! `rabbithole list` — display stored labels in a table.

use crate::cli::output;
use crate::cli::{unlock, Cli, Context};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(ctx: &Context, cli: &Cli) -> Result<()> {
    let (profile, locked) = ctx.open_vault(cli)?;

    // Require the password even though labels are not encrypted.
    let vault = unlock(&locked)?;
    let secrets = vault.list_secrets()?;

    output::info(&format!("{profile} — {} API key(s)", secrets.len()));
    output::print_secrets_table(&secrets);

    Ok(())
}
