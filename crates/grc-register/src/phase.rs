// phase.rs: RiskPhase, the ordered lifecycle of a risk.
//
//   Draft → Identification → Analysis → Evaluation → Treatment
//     → Monitoring → Closed
//
// Phases are compared case-insensitively when read from documents, so
// "treatment", "Treatment", and "TREATMENT" are the same phase.
//
// The phase decides which workshop agenda topics a risk may join:
// Treatment and Monitoring risks are discussed for extensions and closure;
// every other phase (Closed included) only as a new risk.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegisterError;

/// The lifecycle phase a risk currently occupies.
///
/// Serialized as the capitalized display name (`"Treatment"`), parsed from
/// any casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RiskPhase {
    Draft,
    Identification,
    Analysis,
    Evaluation,
    Treatment,
    Monitoring,
    Closed,
}

impl RiskPhase {
    /// Every phase, in lifecycle order.
    pub const ALL: [RiskPhase; 7] = [
        RiskPhase::Draft,
        RiskPhase::Identification,
        RiskPhase::Analysis,
        RiskPhase::Evaluation,
        RiskPhase::Treatment,
        RiskPhase::Monitoring,
        RiskPhase::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskPhase::Draft => "Draft",
            RiskPhase::Identification => "Identification",
            RiskPhase::Analysis => "Analysis",
            RiskPhase::Evaluation => "Evaluation",
            RiskPhase::Treatment => "Treatment",
            RiskPhase::Monitoring => "Monitoring",
            RiskPhase::Closed => "Closed",
        }
    }

    /// Position in the lifecycle, starting at 0 for Draft.
    pub fn ordinal(&self) -> usize {
        Self::ALL
            .iter()
            .position(|p| p == self)
            .unwrap_or_default()
    }

    /// The phase that follows this one, or `None` for Closed.
    pub fn next(&self) -> Option<RiskPhase> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// New risks enter the register in Draft or Identification.
    pub fn is_entry_phase(&self) -> bool {
        matches!(self, RiskPhase::Draft | RiskPhase::Identification)
    }

    /// Phases only move forward, one step at a time.
    pub fn can_advance_to(&self, next: RiskPhase) -> bool {
        self.next() == Some(next)
    }

    /// True iff the risk may be put on a workshop's extensions or closure
    /// agenda (Treatment or Monitoring).
    pub fn is_extension_or_closure_eligible(&self) -> bool {
        matches!(self, RiskPhase::Treatment | RiskPhase::Monitoring)
    }

    /// True iff the risk may be put on a workshop's new-risk agenda.
    ///
    /// This is the strict complement of
    /// [`is_extension_or_closure_eligible`](Self::is_extension_or_closure_eligible),
    /// so Closed risks qualify too.
    pub fn is_new_risk_eligible(&self) -> bool {
        !self.is_extension_or_closure_eligible()
    }
}

impl fmt::Display for RiskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskPhase {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RegisterError::UnknownPhase(s.to_string()))
    }
}

impl TryFrom<String> for RiskPhase {
    type Error = RegisterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RiskPhase> for String {
    fn from(phase: RiskPhase) -> Self {
        phase.as_str().to_string()
    }
}
