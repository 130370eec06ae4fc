//! # grc-register
//!
//! Typed records for the risk register and the lifecycle rules that govern
//! them.
//!
//! A [`Risk`] moves through ordered [`RiskPhase`]s. A [`Treatment`] belongs to
//! exactly one risk, accrues extension requests, and carries a
//! [`ClosureApproval`] gate. A [`Workshop`] holds three agenda topic lists
//! ([`AgendaTopic`]) that the agenda engine appends to.
//!
//! ## Key components
//!
//! - [`RiskPhase`]: phase ordering and topic eligibility predicates
//! - [`Treatment`]: extension history and the Pending → Approved/Rejected gate
//! - [`Workshop`]: status, date window, and agenda lists
//! - [`validation`]: ingress checks that turn loose JSON into typed records
//! - [`RegisterEvent`] / [`EventDispatcher`]: notifications at lifecycle points

pub mod dates;
pub mod error;
pub mod events;
pub mod phase;
pub mod risk;
pub mod treatment;
pub mod validation;
pub mod workshop;

pub use error::RegisterError;
pub use events::{EventDispatcher, LogSink, NotificationSink, RegisterEvent};
pub use phase::RiskPhase;
pub use risk::{next_risk_id, Risk};
pub use treatment::{
    next_treatment_id, ClosureApproval, ExtensionRecord, Treatment, PENDING_APPROVER,
};
pub use validation::FieldError;
pub use workshop::{AgendaItem, AgendaTopic, Workshop, WorkshopStatus};
