// events.rs: Register events and notification dispatch.
//
// Every successful mutation of the register emits a RegisterEvent. Sinks
// (the JSONL activity log, and whatever else is wired in) receive them
// through the EventDispatcher. A failing sink is logged and skipped; it
// never undoes or blocks the mutation that produced the event.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RegisterError;
use crate::phase::RiskPhase;
use crate::treatment::ClosureApproval;
use crate::workshop::AgendaTopic;

/// Events emitted at register lifecycle points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RegisterEvent {
    /// A risk was put on a workshop agenda.
    AgendaItemAdded {
        event_id: Uuid,
        workshop_id: String,
        risk_id: String,
        topic: AgendaTopic,
        selected_treatments: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A risk was taken off a workshop agenda.
    AgendaItemRemoved {
        event_id: Uuid,
        workshop_id: String,
        risk_id: String,
        topic: AgendaTopic,
        timestamp: DateTime<Utc>,
    },

    /// A treatment asked for a later due date.
    ExtensionRequested {
        event_id: Uuid,
        risk_id: String,
        treatment_id: String,
        extended_due_date: NaiveDate,
        number_of_extensions: usize,
        timestamp: DateTime<Utc>,
    },

    /// An extension request was signed off.
    ExtensionApproved {
        event_id: Uuid,
        risk_id: String,
        treatment_id: String,
        index: usize,
        approver: String,
        timestamp: DateTime<Utc>,
    },

    /// A treatment's closure gate was decided.
    ClosureDecided {
        event_id: Uuid,
        risk_id: String,
        treatment_id: String,
        decision: ClosureApproval,
        approver: String,
        timestamp: DateTime<Utc>,
    },

    /// A risk moved to its next phase.
    RiskPhaseAdvanced {
        event_id: Uuid,
        risk_id: String,
        from_phase: RiskPhase,
        to_phase: RiskPhase,
        timestamp: DateTime<Utc>,
    },
}

impl RegisterEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            RegisterEvent::AgendaItemAdded { .. } => "agenda_item_added",
            RegisterEvent::AgendaItemRemoved { .. } => "agenda_item_removed",
            RegisterEvent::ExtensionRequested { .. } => "extension_requested",
            RegisterEvent::ExtensionApproved { .. } => "extension_approved",
            RegisterEvent::ClosureDecided { .. } => "closure_decided",
            RegisterEvent::RiskPhaseAdvanced { .. } => "risk_phase_advanced",
        }
    }

    pub fn agenda_item_added(
        workshop_id: &str,
        risk_id: &str,
        topic: AgendaTopic,
        selected_treatments: &[String],
        timestamp: DateTime<Utc>,
    ) -> Self {
        RegisterEvent::AgendaItemAdded {
            event_id: Uuid::new_v4(),
            workshop_id: workshop_id.to_string(),
            risk_id: risk_id.to_string(),
            topic,
            selected_treatments: selected_treatments.to_vec(),
            timestamp,
        }
    }

    pub fn agenda_item_removed(workshop_id: &str, risk_id: &str, topic: AgendaTopic) -> Self {
        RegisterEvent::AgendaItemRemoved {
            event_id: Uuid::new_v4(),
            workshop_id: workshop_id.to_string(),
            risk_id: risk_id.to_string(),
            topic,
            timestamp: Utc::now(),
        }
    }

    pub fn extension_requested(
        risk_id: &str,
        treatment_id: &str,
        extended_due_date: NaiveDate,
        number_of_extensions: usize,
    ) -> Self {
        RegisterEvent::ExtensionRequested {
            event_id: Uuid::new_v4(),
            risk_id: risk_id.to_string(),
            treatment_id: treatment_id.to_string(),
            extended_due_date,
            number_of_extensions,
            timestamp: Utc::now(),
        }
    }

    pub fn extension_approved(risk_id: &str, treatment_id: &str, index: usize, approver: &str) -> Self {
        RegisterEvent::ExtensionApproved {
            event_id: Uuid::new_v4(),
            risk_id: risk_id.to_string(),
            treatment_id: treatment_id.to_string(),
            index,
            approver: approver.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn closure_decided(
        risk_id: &str,
        treatment_id: &str,
        decision: ClosureApproval,
        approver: &str,
    ) -> Self {
        RegisterEvent::ClosureDecided {
            event_id: Uuid::new_v4(),
            risk_id: risk_id.to_string(),
            treatment_id: treatment_id.to_string(),
            decision,
            approver: approver.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn risk_phase_advanced(risk_id: &str, from: RiskPhase, to: RiskPhase) -> Self {
        RegisterEvent::RiskPhaseAdvanced {
            event_id: Uuid::new_v4(),
            risk_id: risk_id.to_string(),
            from_phase: from,
            to_phase: to,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for receiving register events.
///
/// Implementations decide what to do with each event: append to a file,
/// call a webhook, and so on.
pub trait NotificationSink: Send + Sync {
    /// Handle an event. Errors are logged but don't stop the system.
    fn send(&self, event: &RegisterEvent) -> Result<(), RegisterError>;
}

/// Logs events as JSONL to a file (always-on sink).
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &RegisterEvent) -> Result<(), RegisterError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RegisterError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| RegisterError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        // One write per event so concurrent appenders never interleave lines.
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        file.write_all(line.as_bytes())
            .map_err(|source| RegisterError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        Ok(())
    }
}

/// Dispatches events to multiple sinks.
///
/// Errors from individual sinks are logged (via tracing) but don't
/// prevent other sinks from receiving the event.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    /// Create a new dispatcher with no sinks.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a notification sink.
    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Dispatch an event to all sinks.
    pub fn dispatch(&self, event: &RegisterEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event_type = event.event_type(), "notification sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
