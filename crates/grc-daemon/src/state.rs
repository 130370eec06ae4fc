//! Application state for API handlers

use std::sync::Arc;

use grc_agenda::{AgendaEngine, LifecycleService};
use grc_register::{EventDispatcher, LogSink};
use grc_store::{EntityStore, JsonFileStore, MemoryStore};

use crate::config::GrcConfig;
use crate::error::DaemonError;

/// Shared application state
///
/// Handlers call the synchronous store directly on the runtime threads.
/// Each call reads or rewrites one small JSON document; move calls into
/// `tokio::task::spawn_blocking` if a store backend ever does more.
#[derive(Clone)]
pub struct AppState {
    /// Document store
    pub store: Arc<dyn EntityStore>,

    /// Agenda eligibility engine
    pub engine: Arc<AgendaEngine>,

    /// Extension, closure, and phase operations
    pub lifecycle: Arc<LifecycleService>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<dyn EntityStore>, events: EventDispatcher) -> Self {
        let events = Arc::new(events);
        Self {
            engine: Arc::new(AgendaEngine::new(Arc::clone(&store)).with_events(Arc::clone(&events))),
            lifecycle: Arc::new(LifecycleService::new(Arc::clone(&store)).with_events(events)),
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Open the configured store and wire up the event log.
    pub fn from_config(config: &GrcConfig) -> Result<Self, DaemonError> {
        let store: Arc<dyn EntityStore> = if config.store.ephemeral {
            tracing::warn!("using in-memory store; nothing will be persisted");
            Arc::new(MemoryStore::new())
        } else {
            tracing::info!("Store directory: {}", config.store.dir.display());
            Arc::new(JsonFileStore::new(&config.store.dir)?)
        };

        let mut events = EventDispatcher::new();
        if config.events.enabled {
            tracing::info!("Event log: {}", config.events.log.display());
            events.add_sink(Box::new(LogSink::new(&config.events.log)));
        }

        Ok(Self::new(store, events))
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
