// error.rs: Error types for the register records and their lifecycle rules.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by record parsing and lifecycle operations.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// A phase string did not name any known risk phase.
    #[error("unknown risk phase '{0}'")]
    UnknownPhase(String),

    /// A closure approval string was not Pending, Approved, or Rejected.
    #[error("unknown closure approval '{0}'")]
    UnknownClosureApproval(String),

    /// A workshop status string was not one of the lifecycle states.
    #[error("unknown workshop status '{0}'")]
    UnknownWorkshopStatus(String),

    /// An agenda topic was not extensions, closure, or newRisks.
    #[error("unknown agenda topic '{0}': expected extensions, closure, or newRisks")]
    UnknownTopic(String),

    /// A date string could not be read as a calendar date.
    #[error("invalid date '{0}': expected YYYY-MM-DD or an ISO-8601 timestamp")]
    InvalidDate(String),

    /// A requested date lies before today.
    #[error("date {requested} is in the past (today is {today})")]
    DateInPast {
        requested: NaiveDate,
        today: NaiveDate,
    },

    /// An extension request carried no justification.
    #[error("justification is required")]
    MissingJustification,

    /// An approver name was empty.
    #[error("approver is required")]
    MissingApprover,

    /// Invalid state transition.
    #[error("invalid transition from {from} to {to} for {entity}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// No extension exists at the given position.
    #[error("treatment {treatment_id} has no extension #{index}")]
    ExtensionNotFound { treatment_id: String, index: usize },

    /// The extension has already been signed off.
    #[error("extension #{index} on treatment {treatment_id} is already approved")]
    ExtensionAlreadyApproved { treatment_id: String, index: usize },

    /// A natural key did not match its expected format.
    #[error("invalid identifier '{value}': expected {expected}")]
    InvalidIdentifier { value: String, expected: String },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize a record.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
