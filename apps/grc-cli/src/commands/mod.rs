pub mod risk;
pub mod serve;
pub mod treatment;
pub mod workshop;

use grc_daemon::{AppState, GrcConfig};

/// Open the configured store with the same engine and event wiring the
/// daemon uses.
pub fn open(config: &GrcConfig) -> anyhow::Result<AppState> {
    Ok(AppState::from_config(config)?)
}

/// Render an optional field for table output.
pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
