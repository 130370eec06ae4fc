//! # grc-agenda
//!
//! The workshop agenda eligibility engine and the treatment/risk lifecycle
//! operations that run against an [`EntityStore`](grc_store::EntityStore).
//!
//! [`AgendaEngine`] is the one place where a risk, its treatments, and a
//! workshop are judged together: it decides whether a risk may be put on a
//! workshop's extensions, closure, or newRisks agenda and, if so, appends the
//! item in a single guarded write. [`LifecycleService`] covers the
//! single-document operations: extension requests and approvals, closure
//! decisions, and phase advances.
//!
//! Both return [`AgendaError`], whose variants line up with the caller-facing
//! error taxonomy (validation, not found, phase mismatch, invalid state,
//! duplicate, conflict, store).

pub mod eligibility;
pub mod error;
pub mod lifecycle;

pub use eligibility::{AgendaAddition, AgendaEngine, AgendaNotes, AgendaRequest};
pub use error::AgendaError;
pub use lifecycle::LifecycleService;
