//! # grc-daemon
//!
//! HTTP API for the risk register. Plain CRUD pass-throughs for risks,
//! treatments, and workshops sit next to the endpoints that run the agenda
//! engine and the lifecycle operations:
//!
//! - `POST /workshops/{workshopId}/agenda`: eligibility-checked agenda add
//! - `POST /treatments/{riskId}/{treatmentId}/extensions`: extension request
//! - `POST /treatments/{riskId}/{treatmentId}/closure`: closure decision
//! - `POST /risks/{riskId}/phase`: phase advance
//!
//! Every response carries `success`; failures add an `error` string.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

pub use config::GrcConfig;
pub use error::{ApiError, DaemonError};
pub use router::create_router;
pub use state::AppState;

/// Install the stderr log subscriber. Call once per process, from `main`;
/// a second call is an error.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("grc_daemon=info".parse()?)
                .add_directive("grc_agenda=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing already initialised: {}", e))
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &GrcConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("grcd shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
