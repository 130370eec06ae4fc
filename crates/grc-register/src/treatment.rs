// treatment.rs: Treatment, a remediation action attached to one risk.
//
// A treatment has two pieces of lifecycle state:
//
// - `closure_approval`: Pending → Approved | Rejected. Once decided it is
//   final. Only Pending treatments may be put on a workshop's extensions or
//   closure agenda.
// - `extensions`: an append-only history of due-date extension requests.
//   Each request starts with the "Pending Approval" approver sentinel and
//   no approval date; `number_of_extensions` always equals
//   `extensions.len()`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::RegisterError;
use crate::risk;

/// Approver recorded on an extension until someone signs it off.
pub const PENDING_APPROVER: &str = "Pending Approval";

static TREATMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TREAT-(\d{3,})-(\d{2,})$").expect("static regex"));

/// The closure gate on a treatment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClosureApproval {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ClosureApproval {
    pub const ALL: [ClosureApproval; 3] = [
        ClosureApproval::Pending,
        ClosureApproval::Approved,
        ClosureApproval::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureApproval::Pending => "Pending",
            ClosureApproval::Approved => "Approved",
            ClosureApproval::Rejected => "Rejected",
        }
    }

    /// Only a pending closure can be decided, and only once.
    pub fn can_transition_to(&self, next: ClosureApproval) -> bool {
        matches!(
            (self, next),
            (ClosureApproval::Pending, ClosureApproval::Approved)
                | (ClosureApproval::Pending, ClosureApproval::Rejected)
        )
    }
}

impl fmt::Display for ClosureApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClosureApproval {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RegisterError::UnknownClosureApproval(s.to_string()))
    }
}

impl TryFrom<String> for ClosureApproval {
    type Error = RegisterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClosureApproval> for String {
    fn from(a: ClosureApproval) -> Self {
        a.as_str().to_string()
    }
}

/// One due-date extension request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRecord {
    #[serde(with = "dates::calendar_date")]
    pub extended_due_date: NaiveDate,
    pub justification: String,
    /// Who signed the extension off, or [`PENDING_APPROVER`].
    pub approver: String,
    #[serde(default)]
    pub date_approved: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ExtensionRecord {
    pub fn is_approved(&self) -> bool {
        self.date_approved.is_some() && self.approver != PENDING_APPROVER
    }
}

/// A remediation action for one risk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    /// `TREAT-<risknum>-<seq>`, unique within `risk_id`.
    pub treatment_id: String,

    /// The risk this treatment remediates.
    pub risk_id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(
        default,
        with = "dates::optional_calendar_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,

    /// Due date from the most recent extension request.
    #[serde(
        default,
        with = "dates::optional_calendar_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub extended_due_date: Option<NaiveDate>,

    #[serde(default)]
    pub closure_approval: ClosureApproval,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_decided_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub extensions: Vec<ExtensionRecord>,

    #[serde(default)]
    pub number_of_extensions: usize,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Treatment {
    /// Create a pending treatment with no extensions.
    pub fn new(
        risk_id: impl Into<String>,
        treatment_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            treatment_id: treatment_id.into(),
            risk_id: risk_id.into(),
            description: description.into(),
            owner: None,
            due_date: None,
            extended_due_date: None,
            closure_approval: ClosureApproval::Pending,
            closure_approved_by: None,
            closure_decided_at: None,
            extensions: Vec::new(),
            number_of_extensions: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// A treatment can be discussed for extension or closure only while its
    /// closure is still pending.
    pub fn is_selectable_for_workshop(&self) -> bool {
        self.closure_approval == ClosureApproval::Pending
    }

    /// Append an extension request.
    ///
    /// `extended_due_date` must parse and be `today` or later; the
    /// justification must be non-blank. On any failure the treatment is left
    /// untouched.
    pub fn request_extension(
        &mut self,
        extended_due_date: &str,
        justification: &str,
        today: NaiveDate,
    ) -> Result<&ExtensionRecord, RegisterError> {
        let requested = dates::parse_calendar_date(extended_due_date)
            .ok_or_else(|| RegisterError::InvalidDate(extended_due_date.to_string()))?;
        if requested < today {
            return Err(RegisterError::DateInPast { requested, today });
        }
        let justification = justification.trim();
        if justification.is_empty() {
            return Err(RegisterError::MissingJustification);
        }

        let now = Utc::now();
        self.extensions.push(ExtensionRecord {
            extended_due_date: requested,
            justification: justification.to_string(),
            approver: PENDING_APPROVER.to_string(),
            date_approved: None,
            created_at: now,
        });
        self.number_of_extensions = self.extensions.len();
        self.extended_due_date = Some(requested);
        self.updated_at = now;

        Ok(&self.extensions[self.extensions.len() - 1])
    }

    /// Sign off the extension at `index`.
    pub fn approve_extension(
        &mut self,
        index: usize,
        approver: &str,
    ) -> Result<&ExtensionRecord, RegisterError> {
        let approver = approver.trim();
        if approver.is_empty() {
            return Err(RegisterError::MissingApprover);
        }
        let treatment_id = self.treatment_id.clone();
        let record = self
            .extensions
            .get_mut(index)
            .ok_or(RegisterError::ExtensionNotFound {
                treatment_id: treatment_id.clone(),
                index,
            })?;
        if record.is_approved() {
            return Err(RegisterError::ExtensionAlreadyApproved {
                treatment_id,
                index,
            });
        }
        let now = Utc::now();
        record.approver = approver.to_string();
        record.date_approved = Some(now);
        self.updated_at = now;
        Ok(&self.extensions[index])
    }

    /// Decide the closure gate. Only Pending → Approved | Rejected is legal.
    pub fn decide_closure(
        &mut self,
        decision: ClosureApproval,
        approver: &str,
    ) -> Result<(), RegisterError> {
        let approver = approver.trim();
        if approver.is_empty() {
            return Err(RegisterError::MissingApprover);
        }
        if !self.closure_approval.can_transition_to(decision) {
            return Err(RegisterError::InvalidTransition {
                entity: self.treatment_id.clone(),
                from: self.closure_approval.to_string(),
                to: decision.to_string(),
            });
        }
        let now = Utc::now();
        self.closure_approval = decision;
        self.closure_approved_by = Some(approver.to_string());
        self.closure_decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// True iff `treatment_id` has the `TREAT-<risknum>-<seq>` shape.
pub fn is_valid_treatment_id(treatment_id: &str) -> bool {
    TREATMENT_ID.is_match(treatment_id)
}

/// True iff `treatment_id` carries the number of `risk_id`.
pub fn belongs_to_risk(treatment_id: &str, risk_id: &str) -> bool {
    let Some(caps) = TREATMENT_ID.captures(treatment_id) else {
        return false;
    };
    let treat_num = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
    treat_num.is_some() && treat_num == risk::risk_number(risk_id)
}

/// Allocate the next `TREAT-<risknum>-<seq>` for a risk.
pub fn next_treatment_id<'a>(
    risk_id: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> Result<String, RegisterError> {
    let number = risk::risk_number(risk_id).ok_or_else(|| RegisterError::InvalidIdentifier {
        value: risk_id.to_string(),
        expected: "RISK-###".to_string(),
    })?;
    let highest = existing
        .into_iter()
        .filter(|id| belongs_to_risk(id, risk_id))
        .filter_map(|id| TREATMENT_ID.captures(id))
        .filter_map(|c| c.get(2).and_then(|m| m.as_str().parse::<u32>().ok()))
        .max()
        .unwrap_or(0);
    Ok(format!("TREAT-{:03}-{:02}", number, highest + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn treatment() -> Treatment {
        Treatment::new("RISK-010", "TREAT-010-01", "Add a second supplier")
    }

    #[test]
    fn new_treatment_is_pending_and_selectable() {
        let t = treatment();
        assert_eq!(t.closure_approval, ClosureApproval::Pending);
        assert!(t.is_selectable_for_workshop());
        assert_eq!(t.number_of_extensions, 0);
    }

    #[test]
    fn decided_treatments_are_not_selectable() {
        let mut approved = treatment();
        approved.decide_closure(ClosureApproval::Approved, "ciso").unwrap();
        assert!(!approved.is_selectable_for_workshop());

        let mut rejected = treatment();
        rejected.decide_closure(ClosureApproval::Rejected, "ciso").unwrap();
        assert!(!rejected.is_selectable_for_workshop());
    }

    #[test]
    fn request_extension_appends_and_counts() {
        let mut t = treatment();
        let record = t
            .request_extension("2025-04-01", "  vendor delay  ", today())
            .unwrap();
        assert_eq!(record.approver, PENDING_APPROVER);
        assert!(record.date_approved.is_none());
        assert_eq!(record.justification, "vendor delay");

        t.request_extension("2025-05-01", "second slip", today()).unwrap();
        assert_eq!(t.number_of_extensions, 2);
        assert_eq!(t.extensions.len(), t.number_of_extensions);
        assert_eq!(t.extended_due_date, NaiveDate::from_ymd_opt(2025, 5, 1));
    }

    #[test]
    fn request_extension_accepts_today() {
        let mut t = treatment();
        t.request_extension("2025-03-10", "same day", today()).unwrap();
        assert_eq!(t.number_of_extensions, 1);
    }

    #[test]
    fn request_extension_rejects_past_date_without_mutation() {
        let mut t = treatment();
        let yesterday = (today() - Duration::days(1)).format("%Y-%m-%d").to_string();
        let result = t.request_extension(&yesterday, "too late", today());
        assert!(matches!(result, Err(RegisterError::DateInPast { .. })));
        assert!(t.extensions.is_empty());
        assert_eq!(t.number_of_extensions, 0);
        assert!(t.extended_due_date.is_none());
    }

    #[test]
    fn request_extension_rejects_bad_input() {
        let mut t = treatment();
        assert!(matches!(
            t.request_extension("soon", "x", today()),
            Err(RegisterError::InvalidDate(_))
        ));
        assert!(matches!(
            t.request_extension("2025-04-01", "   ", today()),
            Err(RegisterError::MissingJustification)
        ));
        assert_eq!(t.number_of_extensions, 0);
    }

    #[test]
    fn approve_extension_stamps_once() {
        let mut t = treatment();
        t.request_extension("2025-04-01", "delay", today()).unwrap();
        let record = t.approve_extension(0, "risk committee").unwrap();
        assert_eq!(record.approver, "risk committee");
        assert!(record.is_approved());

        assert!(matches!(
            t.approve_extension(0, "someone else"),
            Err(RegisterError::ExtensionAlreadyApproved { index: 0, .. })
        ));
        assert!(matches!(
            t.approve_extension(3, "x"),
            Err(RegisterError::ExtensionNotFound { index: 3, .. })
        ));
    }

    #[test]
    fn closure_is_decided_only_once() {
        let mut t = treatment();
        t.decide_closure(ClosureApproval::Approved, "ciso").unwrap();
        assert_eq!(t.closure_approved_by.as_deref(), Some("ciso"));
        assert!(t.closure_decided_at.is_some());

        let again = t.decide_closure(ClosureApproval::Rejected, "ciso");
        assert!(matches!(again, Err(RegisterError::InvalidTransition { .. })));
        assert_eq!(t.closure_approval, ClosureApproval::Approved);
    }

    #[test]
    fn closure_cannot_return_to_pending() {
        let mut t = treatment();
        assert!(t.decide_closure(ClosureApproval::Pending, "ciso").is_err());
        assert!(t.decide_closure(ClosureApproval::Approved, "  ").is_err());
    }

    #[test]
    fn next_treatment_id_is_scoped_to_the_risk() {
        assert_eq!(
            next_treatment_id("RISK-010", Vec::<&str>::new()).unwrap(),
            "TREAT-010-01"
        );
        assert_eq!(
            next_treatment_id("RISK-010", ["TREAT-010-01", "TREAT-010-04", "TREAT-011-09"])
                .unwrap(),
            "TREAT-010-05"
        );
        assert!(next_treatment_id("bogus", Vec::<&str>::new()).is_err());
    }

    #[test]
    fn treatment_id_shape_and_ownership() {
        assert!(is_valid_treatment_id("TREAT-010-01"));
        assert!(!is_valid_treatment_id("TREAT-10-1"));
        assert!(belongs_to_risk("TREAT-010-01", "RISK-010"));
        assert!(!belongs_to_risk("TREAT-010-01", "RISK-011"));
    }

    #[test]
    fn legacy_document_without_counters_loads() {
        let json = r#"{
            "treatmentId": "TREAT-010-02",
            "riskId": "RISK-010",
            "closureApproval": "approved",
            "extendedDueDate": "2025-06-30T00:00:00.000"
        }"#;
        let t: Treatment = serde_json::from_str(json).unwrap();
        assert_eq!(t.closure_approval, ClosureApproval::Approved);
        assert_eq!(t.extended_due_date, NaiveDate::from_ymd_opt(2025, 6, 30));
        assert!(t.extensions.is_empty());
    }
}
