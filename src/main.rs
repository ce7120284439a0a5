use clap::Parser;
use rabbithole::cli::{commands, output, Cli, Commands, Context};
use rabbithole::errors::Result;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        tracing::error!(error = %e, "command failed");
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Completions need neither config nor logging.
    if let Commands::Completions { shell } = cli.command {
        return commands::completions::execute(shell);
    }

    let mut ctx = Context::load(cli)?;
    rabbithole::logging::init(
        &ctx.settings.log_dir(&ctx.config_dir),
        &ctx.settings.logging.level,
        cli.verbose,
    );

    match cli.command {
        Commands::Init { ref name, ref path } => {
            commands::init::execute(&mut ctx, name, path.clone())
        }
        Commands::Add { ref label } => commands::add::execute(&ctx, cli, label.as_deref()),
        Commands::Get { ref label, print } => {
            commands::get::execute(&ctx, cli, label.as_deref(), print)
        }
        Commands::List => commands::list::execute(&ctx, cli),
        Commands::Profiles => commands::profiles::execute(&ctx),
        Commands::Completions { .. } => Ok(()),
    }
}
