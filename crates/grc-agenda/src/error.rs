// error.rs: Error taxonomy for agenda and lifecycle operations.
//
// Every variant except Conflict and Store is caller-fixable. The HTTP layer
// maps them to status codes; nothing here is retried.

use grc_register::validation::summarize;
use grc_register::{AgendaTopic, FieldError, RegisterError, RiskPhase};
use grc_store::StoreError;
use thiserror::Error;

/// Errors returned by the agenda engine and the lifecycle service.
#[derive(Debug, Error)]
pub enum AgendaError {
    /// Missing or malformed input fields.
    #[error("{}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// A referenced workshop, risk, treatment, or agenda item does not exist.
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// The risk's phase does not fit the requested agenda topic.
    #[error("risk {risk_id} is in phase {phase}, which is not eligible for the {topic} topic")]
    PhaseMismatch {
        risk_id: String,
        phase: RiskPhase,
        topic: AgendaTopic,
    },

    /// A workshop or treatment is not in a state that allows the operation.
    #[error("{0}")]
    InvalidState(String),

    /// The risk is already listed under the topic.
    #[error("risk {risk_id} is already on the {topic} agenda of workshop {workshop_id}")]
    DuplicateEntry {
        workshop_id: String,
        risk_id: String,
        topic: AgendaTopic,
    },

    /// The write matched nothing although the document was just read.
    #[error("workshop {workshop_id} disappeared before the agenda could be written")]
    Conflict { workshop_id: String },

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AgendaError {
    /// One-field validation error.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AgendaError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        AgendaError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Short machine-readable name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AgendaError::Validation(_) => "validation",
            AgendaError::NotFound { .. } => "not_found",
            AgendaError::PhaseMismatch { .. } => "phase_mismatch",
            AgendaError::InvalidState(_) => "invalid_state",
            AgendaError::DuplicateEntry { .. } => "duplicate_entry",
            AgendaError::Conflict { .. } => "conflict",
            AgendaError::Store(_) => "store",
        }
    }
}

impl From<RegisterError> for AgendaError {
    fn from(err: RegisterError) -> Self {
        let message = err.to_string();
        match err {
            RegisterError::InvalidDate(_) | RegisterError::DateInPast { .. } => {
                AgendaError::invalid("extendedDueDate", message)
            }
            RegisterError::MissingJustification => AgendaError::invalid("justification", message),
            RegisterError::MissingApprover => AgendaError::invalid("approver", message),
            RegisterError::UnknownPhase(_) => AgendaError::invalid("phase", message),
            RegisterError::UnknownClosureApproval(_) => AgendaError::invalid("decision", message),
            RegisterError::UnknownWorkshopStatus(_) => AgendaError::invalid("status", message),
            RegisterError::UnknownTopic(_) => AgendaError::invalid("topic", message),
            RegisterError::InvalidIdentifier { .. } => AgendaError::invalid("id", message),
            RegisterError::InvalidTransition { .. }
            | RegisterError::ExtensionAlreadyApproved { .. } => AgendaError::InvalidState(message),
            RegisterError::ExtensionNotFound {
                treatment_id,
                index,
            } => AgendaError::not_found("extension", format!("{}#{}", treatment_id, index)),
            RegisterError::IoError { path, source } => {
                AgendaError::Store(StoreError::IoError { path, source })
            }
            RegisterError::SerializationError(e) => {
                AgendaError::Store(StoreError::SerializationError(e))
            }
        }
    }
}
