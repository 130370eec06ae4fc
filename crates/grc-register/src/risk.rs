// risk.rs: Risk, one entry in the risk register.
//
// A risk is keyed by its natural id (`RISK-001`) and carries the phase the
// agenda rules look at. The descriptive fields are free text; the ratings
// are optional 1–5 scores.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RegisterError;
use crate::phase::RiskPhase;

static RISK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RISK-(\d{3,})$").expect("static regex"));

/// A tracked risk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    /// Natural key, `RISK-###`.
    pub risk_id: String,

    /// Where the risk is in its lifecycle.
    pub current_phase: RiskPhase,

    /// One-line description of the risk.
    #[serde(default)]
    pub statement: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability: Option<String>,

    /// Person accountable for the risk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Likelihood rating, 1–5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<u8>,

    /// Impact rating, 1–5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<u8>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Risk {
    /// Create a new risk in the Draft phase.
    pub fn new(risk_id: impl Into<String>, statement: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            risk_id: risk_id.into(),
            current_phase: RiskPhase::Draft,
            statement: statement.into(),
            threat: None,
            vulnerability: None,
            owner: None,
            likelihood: None,
            impact: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style phase override, mostly for seeding and tests.
    pub fn in_phase(mut self, phase: RiskPhase) -> Self {
        self.current_phase = phase;
        self
    }

    /// Inherent rating (likelihood × impact) when both are set.
    pub fn rating(&self) -> Option<u16> {
        Some(u16::from(self.likelihood?) * u16::from(self.impact?))
    }

    /// Move to the next phase. Returns an error if the move skips or reverses.
    pub fn advance_phase(&mut self, next: RiskPhase) -> Result<RiskPhase, RegisterError> {
        if !self.current_phase.can_advance_to(next) {
            return Err(RegisterError::InvalidTransition {
                entity: self.risk_id.clone(),
                from: self.current_phase.to_string(),
                to: next.to_string(),
            });
        }
        let previous = self.current_phase;
        self.current_phase = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }
}

/// Numeric part of a `RISK-###` id.
pub fn risk_number(risk_id: &str) -> Option<u32> {
    RISK_ID
        .captures(risk_id)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// True iff `risk_id` has the `RISK-###` shape.
pub fn is_valid_risk_id(risk_id: &str) -> bool {
    RISK_ID.is_match(risk_id)
}

/// Allocate the id after the highest existing `RISK-###`.
pub fn next_risk_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing.into_iter().filter_map(risk_number).max().unwrap_or(0);
    format!("RISK-{:03}", highest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_risk_starts_in_draft() {
        let risk = Risk::new("RISK-001", "Supplier outage");
        assert_eq!(risk.current_phase, RiskPhase::Draft);
        assert!(risk.rating().is_none());
    }

    #[test]
    fn advance_phase_walks_forward() {
        let mut risk = Risk::new("RISK-001", "x");
        let before = risk.updated_at;
        assert_eq!(
            risk.advance_phase(RiskPhase::Identification).unwrap(),
            RiskPhase::Draft
        );
        risk.advance_phase(RiskPhase::Analysis).unwrap();
        assert_eq!(risk.current_phase, RiskPhase::Analysis);
        assert!(risk.updated_at >= before);
    }

    #[test]
    fn advance_phase_rejects_skips() {
        let mut risk = Risk::new("RISK-001", "x");
        let result = risk.advance_phase(RiskPhase::Treatment);
        assert!(matches!(result, Err(RegisterError::InvalidTransition { .. })));
        assert_eq!(risk.current_phase, RiskPhase::Draft);
    }

    #[test]
    fn rating_multiplies_scores() {
        let mut risk = Risk::new("RISK-001", "x");
        risk.likelihood = Some(4);
        risk.impact = Some(3);
        assert_eq!(risk.rating(), Some(12));
    }

    #[test]
    fn next_risk_id_follows_highest() {
        assert_eq!(next_risk_id(Vec::<&str>::new()), "RISK-001");
        assert_eq!(
            next_risk_id(["RISK-002", "RISK-010", "junk", "RISK-007"]),
            "RISK-011"
        );
        assert_eq!(next_risk_id(["RISK-999"]), "RISK-1000");
    }

    #[test]
    fn risk_id_format() {
        assert!(is_valid_risk_id("RISK-010"));
        assert!(is_valid_risk_id("RISK-1234"));
        assert!(!is_valid_risk_id("RISK-10"));
        assert!(!is_valid_risk_id("risk-010"));
        assert_eq!(risk_number("RISK-042"), Some(42));
    }

    #[test]
    fn json_uses_camel_case_and_lenient_phase() {
        let json = r#"{"riskId":"RISK-003","currentPhase":"monitoring","statement":"s"}"#;
        let risk: Risk = serde_json::from_str(json).unwrap();
        assert_eq!(risk.current_phase, RiskPhase::Monitoring);
        let out = serde_json::to_string(&risk).unwrap();
        assert!(out.contains("\"riskId\":\"RISK-003\""));
        assert!(out.contains("\"currentPhase\":\"Monitoring\""));
        assert!(!out.contains("threat"));
    }
}
