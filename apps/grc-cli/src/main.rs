// grc: command-line access to the risk register and workshop agendas.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use grc_daemon::GrcConfig;

#[derive(Parser)]
#[command(name = "grc", about = "Risk register and workshop agenda tool", version)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect risks and move them between phases.
    Risk {
        #[command(subcommand)]
        command: commands::risk::RiskCommands,
    },
    /// Inspect treatments, request extensions, decide closures.
    Treatment {
        #[command(subcommand)]
        command: commands::treatment::TreatmentCommands,
    },
    /// Inspect workshops and edit their agendas.
    Workshop {
        #[command(subcommand)]
        command: commands::workshop::WorkshopCommands,
    },
    /// Start the HTTP API (same as running grcd).
    Serve {
        /// Address to listen on, overriding the config file.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    grc_daemon::init_tracing()?;
    let project_root = cli.project_root.canonicalize()?;
    let config = GrcConfig::for_project(&project_root);

    match &cli.command {
        Commands::Risk { command } => commands::risk::execute(command, &config),
        Commands::Treatment { command } => commands::treatment::execute(command, &config),
        Commands::Workshop { command } => commands::workshop::execute(command, &config),
        Commands::Serve { bind } => commands::serve::execute(config, bind.clone()),
    }
}
