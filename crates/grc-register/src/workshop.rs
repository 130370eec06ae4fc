// workshop.rs: Workshop, a scheduled risk review meeting and its agenda.
//
// A workshop's agenda is split into three topic lists:
//   extensions: treatments asking for more time
//   closure: treatments asking to be closed
//   newRisks: risks being discussed for the first time
//
// The agenda may only change while the workshop is Planned, Scheduled, or
// Pending Agenda, and only on or before the workshop date. A risk appears at
// most once per topic list.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::RegisterError;
use crate::phase::RiskPhase;

/// Lifecycle state of a workshop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WorkshopStatus {
    Planned,
    Scheduled,
    PendingAgenda,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkshopStatus {
    pub const ALL: [WorkshopStatus; 6] = [
        WorkshopStatus::Planned,
        WorkshopStatus::Scheduled,
        WorkshopStatus::PendingAgenda,
        WorkshopStatus::InProgress,
        WorkshopStatus::Completed,
        WorkshopStatus::Cancelled,
    ];

    /// Statuses in which agenda items may be added or removed.
    pub const AGENDA_OPEN: [WorkshopStatus; 3] = [
        WorkshopStatus::Planned,
        WorkshopStatus::Scheduled,
        WorkshopStatus::PendingAgenda,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkshopStatus::Planned => "Planned",
            WorkshopStatus::Scheduled => "Scheduled",
            WorkshopStatus::PendingAgenda => "Pending Agenda",
            WorkshopStatus::InProgress => "In Progress",
            WorkshopStatus::Completed => "Completed",
            WorkshopStatus::Cancelled => "Cancelled",
        }
    }

    pub fn permits_agenda_changes(&self) -> bool {
        Self::AGENDA_OPEN.contains(self)
    }

    /// Discussion notes can be recorded until the workshop is cancelled.
    pub fn permits_notes(&self) -> bool {
        *self != WorkshopStatus::Cancelled
    }
}

impl fmt::Display for WorkshopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkshopStatus {
    type Err = RegisterError;

    /// Accepts the display name in any casing; `_` and `-` count as spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| RegisterError::UnknownWorkshopStatus(s.to_string()))
    }
}

impl TryFrom<String> for WorkshopStatus {
    type Error = RegisterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WorkshopStatus> for String {
    fn from(st: WorkshopStatus) -> Self {
        st.as_str().to_string()
    }
}

/// One of the three agenda sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgendaTopic {
    Extensions,
    Closure,
    NewRisks,
}

impl AgendaTopic {
    pub const ALL: [AgendaTopic; 3] = [
        AgendaTopic::Extensions,
        AgendaTopic::Closure,
        AgendaTopic::NewRisks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgendaTopic::Extensions => "extensions",
            AgendaTopic::Closure => "closure",
            AgendaTopic::NewRisks => "newRisks",
        }
    }

    /// Extension and closure items must name the treatments under discussion.
    pub fn requires_treatments(&self) -> bool {
        matches!(self, AgendaTopic::Extensions | AgendaTopic::Closure)
    }

    /// Whether a risk in `phase` may be discussed under this topic.
    pub fn accepts_phase(&self, phase: RiskPhase) -> bool {
        if self.requires_treatments() {
            phase.is_extension_or_closure_eligible()
        } else {
            phase.is_new_risk_eligible()
        }
    }
}

impl fmt::Display for AgendaTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgendaTopic {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| RegisterError::UnknownTopic(s.to_string()))
    }
}

/// A risk (and the treatments in scope) on one topic of one workshop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub risk_id: String,
    #[serde(default)]
    pub selected_treatments: Vec<String>,
    #[serde(default)]
    pub actions_taken: String,
    #[serde(default)]
    pub to_do: String,
    #[serde(default)]
    pub outcome: String,
}

impl AgendaItem {
    /// A fresh item with empty discussion notes.
    pub fn new(risk_id: impl Into<String>, selected_treatments: Vec<String>) -> Self {
        Self {
            risk_id: risk_id.into(),
            selected_treatments,
            actions_taken: String::new(),
            to_do: String::new(),
            outcome: String::new(),
        }
    }
}

/// A scheduled workshop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    /// Natural key (e.g., `WS-2025-03`).
    pub id: String,

    /// Store-assigned id carried by legacy records; used as a fallback lookup.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub legacy_id: Option<String>,

    #[serde(default)]
    pub title: String,

    pub status: WorkshopStatus,

    /// Day the workshop takes place.
    #[serde(with = "dates::calendar_date")]
    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilitator: Option<String>,

    #[serde(default)]
    pub extensions: Vec<AgendaItem>,

    #[serde(default)]
    pub closure: Vec<AgendaItem>,

    #[serde(default)]
    pub new_risks: Vec<AgendaItem>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Workshop {
    /// Create a workshop with an empty agenda.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        status: WorkshopStatus,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            legacy_id: None,
            title: title.into(),
            status,
            date,
            facilitator: None,
            extensions: Vec::new(),
            closure: Vec::new(),
            new_risks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True if `reference` is this workshop's natural id or legacy `_id`.
    pub fn matches_ref(&self, reference: &str) -> bool {
        self.id == reference || self.legacy_id.as_deref() == Some(reference)
    }

    /// True if the workshop date is `today` or later.
    pub fn is_on_or_after(&self, today: NaiveDate) -> bool {
        self.date >= today
    }

    pub fn topic(&self, topic: AgendaTopic) -> &[AgendaItem] {
        match topic {
            AgendaTopic::Extensions => &self.extensions,
            AgendaTopic::Closure => &self.closure,
            AgendaTopic::NewRisks => &self.new_risks,
        }
    }

    pub fn topic_mut(&mut self, topic: AgendaTopic) -> &mut Vec<AgendaItem> {
        match topic {
            AgendaTopic::Extensions => &mut self.extensions,
            AgendaTopic::Closure => &mut self.closure,
            AgendaTopic::NewRisks => &mut self.new_risks,
        }
    }

    pub fn contains_risk(&self, topic: AgendaTopic, risk_id: &str) -> bool {
        self.topic(topic).iter().any(|item| item.risk_id == risk_id)
    }

    /// Append an item and touch `updated_at`. Callers check for duplicates.
    pub fn push_agenda_item(&mut self, topic: AgendaTopic, item: AgendaItem, at: DateTime<Utc>) {
        self.topic_mut(topic).push(item);
        self.updated_at = at;
    }

    /// Remove the item for `risk_id` from a topic, if present.
    pub fn remove_agenda_item(&mut self, topic: AgendaTopic, risk_id: &str) -> Option<AgendaItem> {
        let list = self.topic_mut(topic);
        let pos = list.iter().position(|item| item.risk_id == risk_id)?;
        let removed = list.remove(pos);
        self.updated_at = Utc::now();
        Some(removed)
    }

    pub fn agenda_item_mut(&mut self, topic: AgendaTopic, risk_id: &str) -> Option<&mut AgendaItem> {
        self.topic_mut(topic)
            .iter_mut()
            .find(|item| item.risk_id == risk_id)
    }

    /// Total number of agenda items across all topics.
    pub fn agenda_len(&self) -> usize {
        AgendaTopic::ALL.iter().map(|t| self.topic(*t).len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn only_three_statuses_open_the_agenda() {
        let open: Vec<_> = WorkshopStatus::ALL
            .into_iter()
            .filter(|s| s.permits_agenda_changes())
            .collect();
        assert_eq!(open, WorkshopStatus::AGENDA_OPEN.to_vec());
        assert!(!WorkshopStatus::Completed.permits_agenda_changes());
        assert!(!WorkshopStatus::InProgress.permits_agenda_changes());
    }

    #[test]
    fn status_parsing_is_lenient() {
        assert_eq!(
            "pending agenda".parse::<WorkshopStatus>().unwrap(),
            WorkshopStatus::PendingAgenda
        );
        assert_eq!(
            "in_progress".parse::<WorkshopStatus>().unwrap(),
            WorkshopStatus::InProgress
        );
        assert!("postponed".parse::<WorkshopStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&WorkshopStatus::PendingAgenda).unwrap(),
            "\"Pending Agenda\""
        );
    }

    #[test]
    fn topics_map_to_phase_predicates() {
        assert!(AgendaTopic::Closure.accepts_phase(RiskPhase::Treatment));
        assert!(AgendaTopic::Extensions.accepts_phase(RiskPhase::Monitoring));
        assert!(!AgendaTopic::NewRisks.accepts_phase(RiskPhase::Treatment));
        assert!(AgendaTopic::NewRisks.accepts_phase(RiskPhase::Closed));
        assert!(!AgendaTopic::Extensions.accepts_phase(RiskPhase::Analysis));
    }

    #[test]
    fn topic_names_are_exact() {
        assert_eq!("newRisks".parse::<AgendaTopic>().unwrap(), AgendaTopic::NewRisks);
        assert!("new_risks".parse::<AgendaTopic>().is_err());
        assert_eq!(
            serde_json::to_string(&AgendaTopic::NewRisks).unwrap(),
            "\"newRisks\""
        );
    }

    #[test]
    fn push_and_remove_agenda_items() {
        let mut ws = Workshop::new("WS-1", "Q1 review", WorkshopStatus::Planned, date(2025, 3, 1));
        ws.push_agenda_item(
            AgendaTopic::Closure,
            AgendaItem::new("RISK-001", vec!["TREAT-001-01".into()]),
            Utc::now(),
        );
        assert!(ws.contains_risk(AgendaTopic::Closure, "RISK-001"));
        assert!(!ws.contains_risk(AgendaTopic::Extensions, "RISK-001"));
        assert_eq!(ws.agenda_len(), 1);

        assert!(ws.remove_agenda_item(AgendaTopic::Closure, "RISK-001").is_some());
        assert!(ws.remove_agenda_item(AgendaTopic::Closure, "RISK-001").is_none());
        assert_eq!(ws.agenda_len(), 0);
    }

    #[test]
    fn legacy_id_is_a_lookup_alias() {
        let json = r#"{
            "id": "WS-2025-03",
            "_id": "65f0c0ffee",
            "status": "Scheduled",
            "date": "2025-03-14T09:30:00.000",
            "newRisks": [{"riskId": "RISK-002"}]
        }"#;
        let ws: Workshop = serde_json::from_str(json).unwrap();
        assert!(ws.matches_ref("WS-2025-03"));
        assert!(ws.matches_ref("65f0c0ffee"));
        assert!(!ws.matches_ref("WS-2025-04"));
        assert_eq!(ws.date, date(2025, 3, 14));
        assert_eq!(ws.new_risks[0].selected_treatments.len(), 0);

        let out = serde_json::to_value(&ws).unwrap();
        assert_eq!(out["_id"], "65f0c0ffee");
        assert_eq!(out["date"], "2025-03-14");
        assert!(out["newRisks"][0]["toDo"].is_string());
    }

    #[test]
    fn date_window_is_inclusive_of_today() {
        let ws = Workshop::new("WS-1", "", WorkshopStatus::Planned, date(2025, 3, 14));
        assert!(ws.is_on_or_after(date(2025, 3, 14)));
        assert!(ws.is_on_or_after(date(2025, 3, 13)));
        assert!(!ws.is_on_or_after(date(2025, 3, 15)));
    }
}
