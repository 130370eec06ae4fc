// validation.rs: Ingress checks for risk, treatment, and workshop documents.
//
// Documents arrive as loose JSON. Each `validate_*` function walks the
// fields it knows about, collects every problem as a FieldError, and only
// when the list is empty assembles the typed record. Nothing downstream
// ever sees an unchecked document.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::dates;
use crate::phase::RiskPhase;
use crate::risk::{is_valid_risk_id, Risk};
use crate::treatment::{belongs_to_risk, is_valid_treatment_id, ClosureApproval, Treatment};
use crate::workshop::{AgendaTopic, Workshop, WorkshopStatus};

/// One problem with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join errors into one human-readable line.
pub fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a risk document and build the record.
pub fn validate_risk(doc: &Value) -> Result<Risk, Vec<FieldError>> {
    let obj = as_object(doc)?;
    let mut errors = Vec::new();

    match required_str(obj, "riskId", &mut errors) {
        Some(id) if !is_valid_risk_id(id) => {
            errors.push(FieldError::new("riskId", "must match RISK-###"))
        }
        _ => {}
    }
    if let Some(phase) = required_str(obj, "currentPhase", &mut errors) {
        if phase.parse::<RiskPhase>().is_err() {
            errors.push(FieldError::new(
                "currentPhase",
                format!("must be one of {}", names(RiskPhase::ALL.map(|p| p.as_str()))),
            ));
        }
    }
    optional_str(obj, "statement", &mut errors);
    optional_str(obj, "threat", &mut errors);
    optional_str(obj, "vulnerability", &mut errors);
    optional_str(obj, "owner", &mut errors);
    optional_rating(obj, "likelihood", &mut errors);
    optional_rating(obj, "impact", &mut errors);

    assemble(doc, errors)
}

/// Check a treatment document and build the record.
pub fn validate_treatment(doc: &Value) -> Result<Treatment, Vec<FieldError>> {
    let obj = as_object(doc)?;
    let mut errors = Vec::new();

    let risk_id = required_str(obj, "riskId", &mut errors);
    if let Some(id) = risk_id {
        if !is_valid_risk_id(id) {
            errors.push(FieldError::new("riskId", "must match RISK-###"));
        }
    }
    if let Some(id) = required_str(obj, "treatmentId", &mut errors) {
        if !is_valid_treatment_id(id) {
            errors.push(FieldError::new("treatmentId", "must match TREAT-<risknum>-<seq>"));
        } else if risk_id.is_some_and(|r| is_valid_risk_id(r) && !belongs_to_risk(id, r)) {
            errors.push(FieldError::new(
                "treatmentId",
                "risk number does not match riskId",
            ));
        }
    }
    if let Some(approval) = optional_str(obj, "closureApproval", &mut errors) {
        if approval.parse::<ClosureApproval>().is_err() {
            errors.push(FieldError::new(
                "closureApproval",
                format!(
                    "must be one of {}",
                    names(ClosureApproval::ALL.map(|a| a.as_str()))
                ),
            ));
        }
    }
    optional_str(obj, "description", &mut errors);
    optional_str(obj, "owner", &mut errors);
    optional_date(obj, "dueDate", &mut errors);
    optional_date(obj, "extendedDueDate", &mut errors);

    let extension_count = match obj.get("extensions") {
        None | Some(Value::Null) => 0,
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_extension(item, i, &mut errors);
            }
            items.len()
        }
        Some(_) => {
            errors.push(FieldError::new("extensions", "must be an array"));
            0
        }
    };
    match obj.get("numberOfExtensions") {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) if n.as_u64() == Some(extension_count as u64) => {}
        Some(_) => errors.push(FieldError::new(
            "numberOfExtensions",
            format!("must equal the number of extensions ({})", extension_count),
        )),
    }

    let mut treatment: Treatment = assemble(doc, errors)?;
    treatment.number_of_extensions = treatment.extensions.len();
    Ok(treatment)
}

/// Check a workshop document and build the record.
pub fn validate_workshop(doc: &Value) -> Result<Workshop, Vec<FieldError>> {
    let obj = as_object(doc)?;
    let mut errors = Vec::new();

    required_str(obj, "id", &mut errors);
    optional_str(obj, "_id", &mut errors);
    optional_str(obj, "title", &mut errors);
    optional_str(obj, "facilitator", &mut errors);
    if let Some(status) = required_str(obj, "status", &mut errors) {
        if status.parse::<WorkshopStatus>().is_err() {
            errors.push(FieldError::new(
                "status",
                format!(
                    "must be one of {}",
                    names(WorkshopStatus::ALL.map(|s| s.as_str()))
                ),
            ));
        }
    }
    if let Some(date) = required_str(obj, "date", &mut errors) {
        if dates::parse_calendar_date(date).is_none() {
            errors.push(FieldError::new("date", "must be a valid date"));
        }
    }
    for topic in AgendaTopic::ALL {
        check_agenda(obj, topic, &mut errors);
    }

    assemble(doc, errors)
}

/// Shallow-merge `patch` into `base`, refusing to change the listed keys.
///
/// Used for PUT: the stored document is patched and the result goes back
/// through the matching `validate_*` function.
pub fn apply_patch(base: &mut Value, patch: &Value, immutable: &[&str]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let (Some(base), Some(patch)) = (base.as_object_mut(), patch.as_object()) else {
        errors.push(FieldError::new("body", "must be a JSON object"));
        return errors;
    };
    for (key, value) in patch {
        if immutable.contains(&key.as_str()) {
            if base.get(key) != Some(value) {
                errors.push(FieldError::new(key.clone(), "cannot be changed"));
            }
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
    errors
}

fn check_extension(item: &Value, index: usize, errors: &mut Vec<FieldError>) {
    let field = |name: &str| format!("extensions[{}].{}", index, name);
    let Some(obj) = item.as_object() else {
        errors.push(FieldError::new(format!("extensions[{}]", index), "must be an object"));
        return;
    };
    match obj.get("extendedDueDate").and_then(Value::as_str) {
        Some(d) if dates::parse_calendar_date(d).is_some() => {}
        _ => errors.push(FieldError::new(field("extendedDueDate"), "must be a valid date")),
    }
    match obj.get("justification").and_then(Value::as_str) {
        Some(j) if !j.trim().is_empty() => {}
        _ => errors.push(FieldError::new(field("justification"), "is required")),
    }
    if !obj.get("approver").is_some_and(Value::is_string) {
        errors.push(FieldError::new(field("approver"), "is required"));
    }
}

fn check_agenda(obj: &Map<String, Value>, topic: AgendaTopic, errors: &mut Vec<FieldError>) {
    let key = topic.as_str();
    let items = match obj.get(key) {
        None | Some(Value::Null) => return,
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(FieldError::new(key, "must be an array"));
            return;
        }
    };
    let mut seen = std::collections::HashSet::new();
    for (i, item) in items.iter().enumerate() {
        let at = format!("{}[{}]", key, i);
        let Some(item) = item.as_object() else {
            errors.push(FieldError::new(at, "must be an object"));
            continue;
        };
        match item.get("riskId").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => {
                if !seen.insert(id) {
                    errors.push(FieldError::new(
                        format!("{}.riskId", at),
                        format!("{} is listed more than once", id),
                    ));
                }
            }
            _ => errors.push(FieldError::new(format!("{}.riskId", at), "is required")),
        }
        match item.get("selectedTreatments") {
            None | Some(Value::Null) => {}
            Some(Value::Array(ids)) if ids.iter().all(Value::is_string) => {}
            Some(_) => errors.push(FieldError::new(
                format!("{}.selectedTreatments", at),
                "must be an array of strings",
            )),
        }
        for note in ["actionsTaken", "toDo", "outcome"] {
            if item.get(note).is_some_and(|v| !v.is_string() && !v.is_null()) {
                errors.push(FieldError::new(format!("{}.{}", at, note), "must be a string"));
            }
        }
    }
}

fn as_object(doc: &Value) -> Result<&Map<String, Value>, Vec<FieldError>> {
    doc.as_object()
        .ok_or_else(|| vec![FieldError::new("body", "must be a JSON object")])
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            errors.push(FieldError::new(key, "is required"));
            None
        }
        Some(_) => {
            errors.push(FieldError::new(key, "must be a string"));
            None
        }
    }
}

fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s.as_str()),
        None | Some(Value::Null) => None,
        Some(_) => {
            errors.push(FieldError::new(key, "must be a string"));
            None
        }
    }
}

fn optional_date(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) {
    if let Some(raw) = optional_str(obj, key, errors) {
        if !raw.trim().is_empty() && dates::parse_calendar_date(raw).is_none() {
            errors.push(FieldError::new(key, "must be a valid date"));
        }
    }
}

fn optional_rating(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) {
    match obj.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) if n.as_u64().is_some_and(|v| (1..=5).contains(&v)) => {}
        Some(_) => errors.push(FieldError::new(key, "must be an integer from 1 to 5")),
    }
}

fn names<const N: usize>(all: [&str; N]) -> String {
    all.join(", ")
}

fn assemble<T: serde::de::DeserializeOwned>(
    doc: &Value,
    errors: Vec<FieldError>,
) -> Result<T, Vec<FieldError>> {
    if !errors.is_empty() {
        return Err(errors);
    }
    serde_json::from_value(doc.clone())
        .map_err(|e| vec![FieldError::new("document", e.to_string())])
}
