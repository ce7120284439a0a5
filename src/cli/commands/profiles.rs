//! `rabbithole profiles` — show configured profiles.

use crate::cli::output;
use crate::cli::Context;
use crate::errors::Result;

/// Execute the `profiles` command.
pub fn execute(ctx: &Context) -> Result<()> {
    output::info(&format!("Config: {}", ctx.config_dir.display()));
    output::print_profiles_table(&ctx.settings);
    Ok(())
}
