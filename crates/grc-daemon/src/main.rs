//! # grcd
//!
//! Risk register HTTP daemon.
//!
//! ```text
//! grcd --project-root . --bind 127.0.0.1:7420
//! ```
//!
//! Reads `.grc/grc.toml` under the project root (or `--config`), opens the
//! document store, and serves the API until interrupted.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use grc_daemon::GrcConfig;

/// Risk register HTTP daemon.
#[derive(Parser)]
#[command(name = "grcd", about = "Risk register HTTP daemon", version)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Config file (defaults to <project-root>/.grc/grc.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file.
    #[arg(long)]
    bind: Option<String>,

    /// Keep documents in memory only.
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr.
    grc_daemon::init_tracing()?;

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize()?;

    tracing::info!("Starting grcd");
    tracing::info!("Project root: {}", project_root.display());

    let mut config = match &cli.config {
        Some(path) => GrcConfig::load(path)?.resolved(&project_root),
        None => GrcConfig::for_project(&project_root),
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if cli.ephemeral {
        config.store.ephemeral = true;
    }

    grc_daemon::serve(&config).await
}
