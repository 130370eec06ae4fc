// eligibility.rs: AgendaEngine, decides whether a risk may join a workshop
// agenda, and performs the append.
//
// The checks run in a fixed order and the first failure wins:
//
//   1. workshop exists (natural id, then legacy _id)
//   2. workshop status is Planned, Scheduled, or Pending Agenda
//   3. workshop date is today or later
//   4. risk exists
//   5. risk phase fits the topic
//   6. risk is not already listed under the topic
//   7. extensions/closure: treatments listed, each exists and is Pending
//   8. build the item
//   9. one guarded write matched on the workshop id
//
// Nothing is written unless every check passes. Risks and treatments are
// only read.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use grc_register::dates;
use grc_register::{
    AgendaItem, AgendaTopic, EventDispatcher, FieldError, RegisterEvent, Risk, Workshop,
};
use grc_store::{AppendOutcome, EntityStore};
use serde::{Deserialize, Serialize};

use crate::error::AgendaError;

/// A request to put one risk on one topic of a workshop agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaRequest {
    pub risk_id: String,
    pub topic: AgendaTopic,
    /// Required and non-empty for extensions and closure.
    pub selected_treatments: Option<Vec<String>>,
}

impl AgendaRequest {
    pub fn new(risk_id: impl Into<String>, topic: AgendaTopic) -> Self {
        Self {
            risk_id: risk_id.into(),
            topic,
            selected_treatments: None,
        }
    }

    pub fn with_treatments<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_treatments = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Build a request from loosely-typed input, reporting every missing or
    /// malformed field at once.
    pub fn from_fields(
        risk_id: Option<&str>,
        topic: Option<&str>,
        selected_treatments: Option<Vec<String>>,
    ) -> Result<Self, AgendaError> {
        let mut errors = Vec::new();
        let risk_id = match risk_id.map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => {
                errors.push(FieldError::new("riskId", "is required"));
                None
            }
        };
        let topic = match topic.map(str::trim) {
            Some(t) if !t.is_empty() => match t.parse::<AgendaTopic>() {
                Ok(topic) => Some(topic),
                Err(e) => {
                    errors.push(FieldError::new("topic", e.to_string()));
                    None
                }
            },
            _ => {
                errors.push(FieldError::new("topic", "is required"));
                None
            }
        };
        match (risk_id, topic) {
            (Some(risk_id), Some(topic)) if errors.is_empty() => Ok(Self {
                risk_id,
                topic,
                selected_treatments,
            }),
            _ => Err(AgendaError::Validation(errors)),
        }
    }
}

/// What a successful add produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaAddition {
    pub workshop_id: String,
    pub risk_id: String,
    pub topic: AgendaTopic,
    pub added_at: DateTime<Utc>,
    #[serde(skip)]
    pub item: AgendaItem,
}

/// Discussion notes for an agenda item. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaNotes {
    pub actions_taken: Option<String>,
    pub to_do: Option<String>,
    pub outcome: Option<String>,
}

impl AgendaNotes {
    pub fn is_empty(&self) -> bool {
        self.actions_taken.is_none() && self.to_do.is_none() && self.outcome.is_none()
    }

    fn apply(&self, item: &mut AgendaItem) {
        if let Some(v) = &self.actions_taken {
            item.actions_taken = v.clone();
        }
        if let Some(v) = &self.to_do {
            item.to_do = v.clone();
        }
        if let Some(v) = &self.outcome {
            item.outcome = v.clone();
        }
    }
}

/// Cross-checks workshops, risks, and treatments before touching an agenda.
pub struct AgendaEngine {
    store: Arc<dyn EntityStore>,
    events: Option<Arc<EventDispatcher>>,
}

impl AgendaEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            events: None,
        }
    }

    /// Dispatch a [`RegisterEvent`] after every successful agenda change.
    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Add a risk to a workshop agenda, judged against today's local date.
    pub fn add_to_agenda(
        &self,
        workshop_ref: &str,
        request: &AgendaRequest,
    ) -> Result<AgendaAddition, AgendaError> {
        self.add_to_agenda_as_of(workshop_ref, request, dates::today())
    }

    /// Add a risk to a workshop agenda, treating `today` as the current date.
    pub fn add_to_agenda_as_of(
        &self,
        workshop_ref: &str,
        request: &AgendaRequest,
        today: NaiveDate,
    ) -> Result<AgendaAddition, AgendaError> {
        let addition = self
            .try_add(workshop_ref, request, today)
            .inspect_err(|e| {
                tracing::debug!(
                    workshop = workshop_ref,
                    risk_id = %request.risk_id,
                    topic = %request.topic,
                    kind = e.kind(),
                    "agenda add rejected: {}",
                    e
                )
            })?;

        tracing::info!(
            workshop_id = %addition.workshop_id,
            risk_id = %addition.risk_id,
            topic = %addition.topic,
            "added risk to workshop agenda"
        );
        self.emit(RegisterEvent::agenda_item_added(
            &addition.workshop_id,
            &addition.risk_id,
            addition.topic,
            &addition.item.selected_treatments,
            addition.added_at,
        ));
        Ok(addition)
    }

    fn try_add(
        &self,
        workshop_ref: &str,
        request: &AgendaRequest,
        today: NaiveDate,
    ) -> Result<AgendaAddition, AgendaError> {
        let topic = request.topic;

        // 1–3
        let workshop = self.open_workshop(workshop_ref, today)?;

        // 4
        let risk = self
            .store
            .get_risk(&request.risk_id)?
            .ok_or_else(|| AgendaError::not_found("risk", &request.risk_id))?;

        // 5
        if !topic.accepts_phase(risk.current_phase) {
            return Err(AgendaError::PhaseMismatch {
                risk_id: risk.risk_id,
                phase: risk.current_phase,
                topic,
            });
        }

        // 6
        if workshop.contains_risk(topic, &risk.risk_id) {
            return Err(duplicate(&workshop.id, &risk.risk_id, topic));
        }

        // 7
        let selected = request.selected_treatments.clone().unwrap_or_default();
        if topic.requires_treatments() {
            self.check_treatments(&risk, topic, &selected)?;
        }

        // 8–9
        let item = AgendaItem::new(risk.risk_id.clone(), selected);
        let added_at = Utc::now();
        match self
            .store
            .append_agenda_item(&workshop.id, topic, &item, added_at)?
        {
            AppendOutcome::Appended(_) => Ok(AgendaAddition {
                workshop_id: workshop.id,
                risk_id: risk.risk_id,
                topic,
                added_at,
                item,
            }),
            AppendOutcome::Duplicate => Err(duplicate(&workshop.id, &risk.risk_id, topic)),
            AppendOutcome::NotMatched => Err(AgendaError::Conflict {
                workshop_id: workshop.id,
            }),
        }
    }

    fn check_treatments(
        &self,
        risk: &Risk,
        topic: AgendaTopic,
        selected: &[String],
    ) -> Result<(), AgendaError> {
        if selected.is_empty() {
            return Err(AgendaError::invalid(
                "selectedTreatments",
                format!("at least one treatment is required for the {} topic", topic),
            ));
        }
        for treatment_id in selected {
            let treatment = self
                .store
                .get_treatment(&risk.risk_id, treatment_id)?
                .ok_or_else(|| {
                    AgendaError::not_found("treatment", format!("{}/{}", risk.risk_id, treatment_id))
                })?;
            if !treatment.is_selectable_for_workshop() {
                return Err(AgendaError::InvalidState(format!(
                    "treatment {} has closure approval {}; only Pending treatments can be put on the {} agenda",
                    treatment.treatment_id, treatment.closure_approval, topic
                )));
            }
        }
        Ok(())
    }

    /// Resolve a workshop and require its agenda to be open on `today`.
    fn open_workshop(&self, workshop_ref: &str, today: NaiveDate) -> Result<Workshop, AgendaError> {
        let workshop = self.find_workshop(workshop_ref)?;
        if !workshop.status.permits_agenda_changes() {
            return Err(AgendaError::InvalidState(format!(
                "workshop {} is {}; the agenda can only change while it is Planned, Scheduled, or Pending Agenda",
                workshop.id, workshop.status
            )));
        }
        if !workshop.is_on_or_after(today) {
            return Err(AgendaError::InvalidState(format!(
                "workshop {} was held on {}; the agenda can no longer change",
                workshop.id, workshop.date
            )));
        }
        Ok(workshop)
    }

    fn find_workshop(&self, workshop_ref: &str) -> Result<Workshop, AgendaError> {
        self.store
            .find_workshop(workshop_ref)?
            .ok_or_else(|| AgendaError::not_found("workshop", workshop_ref))
    }

    /// Take a risk off one topic. Subject to the same status and date gates
    /// as adding.
    pub fn remove_from_agenda(
        &self,
        workshop_ref: &str,
        topic: AgendaTopic,
        risk_id: &str,
    ) -> Result<AgendaItem, AgendaError> {
        self.remove_from_agenda_as_of(workshop_ref, topic, risk_id, dates::today())
    }

    pub fn remove_from_agenda_as_of(
        &self,
        workshop_ref: &str,
        topic: AgendaTopic,
        risk_id: &str,
        today: NaiveDate,
    ) -> Result<AgendaItem, AgendaError> {
        let workshop = self.open_workshop(workshop_ref, today)?;

        let mut removed = None;
        let written = self
            .store
            .modify_workshop(&workshop.id, &mut |ws: &mut Workshop| {
                removed = ws.remove_agenda_item(topic, risk_id);
                removed.is_some()
            })?;
        if written.is_none() {
            return Err(AgendaError::Conflict {
                workshop_id: workshop.id,
            });
        }
        let item = removed
            .ok_or_else(|| AgendaError::not_found("agenda item", format!("{}/{}", topic, risk_id)))?;

        tracing::info!(workshop_id = %workshop.id, risk_id, topic = %topic, "removed risk from workshop agenda");
        self.emit(RegisterEvent::agenda_item_removed(&workshop.id, risk_id, topic));
        Ok(item)
    }

    /// Record discussion notes on an existing agenda item. Allowed in every
    /// workshop status except Cancelled, and regardless of the date.
    pub fn record_notes(
        &self,
        workshop_ref: &str,
        topic: AgendaTopic,
        risk_id: &str,
        notes: &AgendaNotes,
    ) -> Result<AgendaItem, AgendaError> {
        if notes.is_empty() {
            return Err(AgendaError::invalid(
                "body",
                "provide at least one of actionsTaken, toDo, outcome",
            ));
        }
        let workshop = self.find_workshop(workshop_ref)?;
        if !workshop.status.permits_notes() {
            return Err(AgendaError::InvalidState(format!(
                "workshop {} is {}; notes can no longer be recorded",
                workshop.id, workshop.status
            )));
        }

        let mut updated = None;
        let written = self
            .store
            .modify_workshop(&workshop.id, &mut |ws: &mut Workshop| {
                let Some(item) = ws.agenda_item_mut(topic, risk_id) else {
                    return false;
                };
                notes.apply(item);
                updated = Some(item.clone());
                ws.updated_at = Utc::now();
                true
            })?;
        if written.is_none() {
            return Err(AgendaError::Conflict {
                workshop_id: workshop.id,
            });
        }
        let item = updated
            .ok_or_else(|| AgendaError::not_found("agenda item", format!("{}/{}", topic, risk_id)))?;

        tracing::info!(workshop_id = %workshop.id, risk_id, topic = %topic, "recorded agenda notes");
        Ok(item)
    }

    /// Risks that could be added under `topic`: the phase fits and the risk
    /// is not already listed. Workshop status and date are not considered.
    pub fn eligible_risks(
        &self,
        workshop_ref: &str,
        topic: AgendaTopic,
    ) -> Result<Vec<Risk>, AgendaError> {
        let workshop = self.find_workshop(workshop_ref)?;
        Ok(self
            .store
            .list_risks()?
            .into_iter()
            .filter(|r| topic.accepts_phase(r.current_phase))
            .filter(|r| !workshop.contains_risk(topic, &r.risk_id))
            .collect())
    }

    fn emit(&self, event: RegisterEvent) {
        if let Some(events) = &self.events {
            events.dispatch(&event);
        }
    }
}

fn duplicate(workshop_id: &str, risk_id: &str, topic: AgendaTopic) -> AgendaError {
    AgendaError::DuplicateEntry {
        workshop_id: workshop_id.to_string(),
        risk_id: risk_id.to_string(),
        topic,
    }
}
