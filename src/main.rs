use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use goldwatch::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for goldwatch::AppCommand {
    fn from(cmd: Commands) -> goldwatch::AppCommand {
        match cmd {
            Commands::Balance => goldwatch::AppCommand::Balance,
            Commands::Watch => goldwatch::AppCommand::Watch,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch balances and prices once
    Balance,
    /// Keep refreshing balances until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => goldwatch::cli::setup::setup_at_path(path),
            None => goldwatch::cli::setup::setup(),
        },
        Some(cmd) => goldwatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
