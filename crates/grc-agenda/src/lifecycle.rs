// lifecycle.rs: Treatment and risk lifecycle operations against the store.
//
// Each operation is a single guarded read-modify-write of one document. The
// record's own rules (Treatment::request_extension, Risk::advance_phase, ...)
// run inside the write guard; if they fail, nothing is written.

use std::sync::Arc;

use chrono::NaiveDate;
use grc_register::dates;
use grc_register::{
    ClosureApproval, EventDispatcher, ExtensionRecord, FieldError, RegisterError, RegisterEvent,
    Risk, RiskPhase, Treatment,
};
use grc_store::{EntityStore, Mutation, StoreResult};

use crate::error::AgendaError;

/// Extension, closure, and phase operations.
pub struct LifecycleService {
    store: Arc<dyn EntityStore>,
    events: Option<Arc<EventDispatcher>>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Request a due-date extension, judged against today's local date.
    pub fn request_extension(
        &self,
        risk_id: &str,
        treatment_id: &str,
        extended_due_date: &str,
        justification: &str,
    ) -> Result<(Treatment, ExtensionRecord), AgendaError> {
        self.request_extension_as_of(
            risk_id,
            treatment_id,
            extended_due_date,
            justification,
            dates::today(),
        )
    }

    pub fn request_extension_as_of(
        &self,
        risk_id: &str,
        treatment_id: &str,
        extended_due_date: &str,
        justification: &str,
        today: NaiveDate,
    ) -> Result<(Treatment, ExtensionRecord), AgendaError> {
        let mut missing = Vec::new();
        if extended_due_date.trim().is_empty() {
            missing.push(FieldError::new("extendedDueDate", "is required"));
        }
        if justification.trim().is_empty() {
            missing.push(FieldError::new("justification", "is required"));
        }
        if !missing.is_empty() {
            return Err(AgendaError::Validation(missing));
        }

        let (treatment, extension) = guarded(
            |m| self.store.modify_treatment(risk_id, treatment_id, m),
            |t: &mut Treatment| {
                t.request_extension(extended_due_date, justification, today)
                    .cloned()
            },
        )?
        .ok_or_else(|| treatment_not_found(risk_id, treatment_id))?;

        tracing::info!(
            risk_id,
            treatment_id,
            extended_due_date = %extension.extended_due_date,
            number_of_extensions = treatment.number_of_extensions,
            "extension requested"
        );
        self.emit(RegisterEvent::extension_requested(
            risk_id,
            treatment_id,
            extension.extended_due_date,
            treatment.number_of_extensions,
        ));
        Ok((treatment, extension))
    }

    /// Sign off the extension at `index` (0-based).
    pub fn approve_extension(
        &self,
        risk_id: &str,
        treatment_id: &str,
        index: usize,
        approver: &str,
    ) -> Result<ExtensionRecord, AgendaError> {
        let (_, extension) = guarded(
            |m| self.store.modify_treatment(risk_id, treatment_id, m),
            |t: &mut Treatment| t.approve_extension(index, approver).cloned(),
        )?
        .ok_or_else(|| treatment_not_found(risk_id, treatment_id))?;

        tracing::info!(risk_id, treatment_id, index, approver = %extension.approver, "extension approved");
        self.emit(RegisterEvent::extension_approved(
            risk_id,
            treatment_id,
            index,
            &extension.approver,
        ));
        Ok(extension)
    }

    /// Decide a pending closure gate.
    pub fn decide_closure(
        &self,
        risk_id: &str,
        treatment_id: &str,
        decision: ClosureApproval,
        approver: &str,
    ) -> Result<Treatment, AgendaError> {
        if decision == ClosureApproval::Pending {
            return Err(AgendaError::invalid(
                "decision",
                "must be Approved or Rejected",
            ));
        }
        let (treatment, ()) = guarded(
            |m| self.store.modify_treatment(risk_id, treatment_id, m),
            |t: &mut Treatment| t.decide_closure(decision, approver),
        )?
        .ok_or_else(|| treatment_not_found(risk_id, treatment_id))?;

        tracing::info!(risk_id, treatment_id, decision = %decision, "closure decided");
        self.emit(RegisterEvent::closure_decided(
            risk_id,
            treatment_id,
            decision,
            approver.trim(),
        ));
        Ok(treatment)
    }

    /// Move a risk one phase forward.
    pub fn advance_risk_phase(&self, risk_id: &str, to: RiskPhase) -> Result<Risk, AgendaError> {
        let (risk, from) = guarded(
            |m| self.store.modify_risk(risk_id, m),
            |r: &mut Risk| r.advance_phase(to),
        )?
        .ok_or_else(|| AgendaError::not_found("risk", risk_id))?;

        tracing::info!(risk_id, from = %from, to = %to, "risk phase advanced");
        self.emit(RegisterEvent::risk_phase_advanced(risk_id, from, to));
        Ok(risk)
    }

    fn emit(&self, event: RegisterEvent) {
        if let Some(events) = &self.events {
            events.dispatch(&event);
        }
    }
}

fn treatment_not_found(risk_id: &str, treatment_id: &str) -> AgendaError {
    AgendaError::not_found("treatment", format!("{}/{}", risk_id, treatment_id))
}

/// Run a fallible record operation inside a store mutation.
///
/// `Ok(None)` means the document does not exist. A failed operation leaves
/// the document untouched and its error is returned.
fn guarded<T, R>(
    modify: impl FnOnce(Mutation<'_, T>) -> StoreResult<Option<T>>,
    mut op: impl FnMut(&mut T) -> Result<R, RegisterError>,
) -> Result<Option<(T, R)>, AgendaError> {
    let mut outcome = None;
    let written = modify(&mut |doc: &mut T| {
        let result = op(doc);
        let ok = result.is_ok();
        outcome = Some(result);
        ok
    })?;
    match (written, outcome) {
        (Some(doc), Some(result)) => Ok(Some((doc, result?))),
        _ => Ok(None),
    }
}
