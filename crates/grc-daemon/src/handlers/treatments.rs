//! Treatment handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use grc_agenda::AgendaError;
use grc_register::validation::validate_treatment;
use grc_register::{next_treatment_id, ClosureApproval, ExtensionRecord, FieldError, Treatment};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    is_unset, object_mut, ok, ok_with, patch_document, read_body, reject_managed_lists, ApiPath,
    Envelope,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Lifecycle-owned fields; they change only through the extension and
/// closure endpoints.
const IMMUTABLE: &[&str] = &[
    "riskId",
    "treatmentId",
    "closureApproval",
    "closureApprovedBy",
    "closureDecidedAt",
    "extensions",
    "numberOfExtensions",
    "createdAt",
];

fn require_risk(state: &AppState, risk_id: &str) -> ApiResult<()> {
    match state.store.get_risk(risk_id)? {
        Some(_) => Ok(()),
        None => Err(AgendaError::not_found("risk", risk_id).into()),
    }
}

/// List the treatments of one risk
pub async fn list_treatments(
    State(state): State<AppState>,
    ApiPath(risk_id): ApiPath<String>,
) -> ApiResult<Json<Envelope<Vec<Treatment>>>> {
    require_risk(&state, &risk_id)?;
    Ok(ok(state.store.list_treatments(&risk_id)?))
}

/// Get one treatment
pub async fn get_treatment(
    State(state): State<AppState>,
    ApiPath((risk_id, treatment_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<Envelope<Treatment>>> {
    let treatment = state
        .store
        .get_treatment(&risk_id, &treatment_id)?
        .ok_or_else(|| treatment_not_found(&risk_id, &treatment_id))?;
    Ok(ok(treatment))
}

/// Create a treatment under a risk. `treatmentId` is allocated when absent.
pub async fn create_treatment(
    State(state): State<AppState>,
    ApiPath(risk_id): ApiPath<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Treatment>>)> {
    require_risk(&state, &risk_id)?;

    let mut doc = read_body(payload)?;
    let obj = object_mut(&mut doc)?;
    match obj.get("riskId").and_then(Value::as_str) {
        Some(body_risk) if body_risk != risk_id => {
            return Err(ApiError::BadRequest(format!(
                "riskId in body ({}) does not match path ({})",
                body_risk, risk_id
            )));
        }
        _ => {
            obj.insert("riskId".into(), Value::String(risk_id.clone()));
        }
    }
    reject_managed_lists(obj, &["extensions"], "the extensions endpoint")?;
    if is_unset(obj, "treatmentId") {
        let existing = state.store.list_treatments(&risk_id)?;
        let id = next_treatment_id(&risk_id, existing.iter().map(|t| t.treatment_id.as_str()))
            .map_err(AgendaError::from)?;
        obj.insert("treatmentId".into(), Value::String(id));
    }

    let treatment = validate_treatment(&doc)?;
    state.store.insert_treatment(&treatment)?;

    tracing::info!(
        risk_id = %treatment.risk_id,
        treatment_id = %treatment.treatment_id,
        "Created treatment"
    );
    Ok((
        StatusCode::CREATED,
        ok_with(
            format!("Treatment {} created", treatment.treatment_id),
            treatment,
        ),
    ))
}

/// Patch a treatment's descriptive fields
pub async fn update_treatment(
    State(state): State<AppState>,
    ApiPath((risk_id, treatment_id)): ApiPath<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<Treatment>>> {
    let patch = read_body(payload)?;
    let treatment = patch_document(
        |m| state.store.modify_treatment(&risk_id, &treatment_id, m),
        &patch,
        IMMUTABLE,
        validate_treatment,
        |t: &mut Treatment| t.updated_at = Utc::now(),
    )?
    .ok_or_else(|| treatment_not_found(&risk_id, &treatment_id))?;

    tracing::info!(risk_id = %risk_id, treatment_id = %treatment_id, "Updated treatment");
    Ok(ok_with(
        format!("Treatment {} updated", treatment.treatment_id),
        treatment,
    ))
}

/// Delete a treatment
pub async fn delete_treatment(
    State(state): State<AppState>,
    ApiPath((risk_id, treatment_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<Envelope<Value>>> {
    if !state.store.delete_treatment(&risk_id, &treatment_id)? {
        return Err(treatment_not_found(&risk_id, &treatment_id).into());
    }
    tracing::info!(risk_id = %risk_id, treatment_id = %treatment_id, "Deleted treatment");
    Ok(ok_with(
        format!("Treatment {} deleted", treatment_id),
        serde_json::json!({ "riskId": risk_id, "treatmentId": treatment_id }),
    ))
}

/// Extension request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRequest {
    pub extended_due_date: Option<String>,
    pub justification: Option<String>,
}

/// Extension response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionResponse {
    pub success: bool,
    pub message: String,
    pub extension: ExtensionRecord,
    pub number_of_extensions: usize,
}

/// Request a due-date extension
pub async fn request_extension(
    State(state): State<AppState>,
    ApiPath((risk_id, treatment_id)): ApiPath<(String, String)>,
    payload: Result<Json<ExtensionRequest>, JsonRejection>,
) -> ApiResult<Json<ExtensionResponse>> {
    let request = read_body(payload)?;
    let (treatment, extension) = state.lifecycle.request_extension(
        &risk_id,
        &treatment_id,
        request.extended_due_date.as_deref().unwrap_or_default(),
        request.justification.as_deref().unwrap_or_default(),
    )?;

    Ok(Json(ExtensionResponse {
        success: true,
        message: format!(
            "Extension to {} requested for treatment {}",
            extension.extended_due_date, treatment.treatment_id
        ),
        extension,
        number_of_extensions: treatment.number_of_extensions,
    }))
}

/// Extension approval request
#[derive(Debug, Deserialize)]
pub struct ApproveExtensionRequest {
    pub approver: Option<String>,
}

/// Sign off one extension
pub async fn approve_extension(
    State(state): State<AppState>,
    ApiPath((risk_id, treatment_id, index)): ApiPath<(String, String, usize)>,
    payload: Result<Json<ApproveExtensionRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<ExtensionRecord>>> {
    let request = read_body(payload)?;
    let extension = state.lifecycle.approve_extension(
        &risk_id,
        &treatment_id,
        index,
        request.approver.as_deref().unwrap_or_default(),
    )?;
    Ok(ok_with(
        format!("Extension #{} on {} approved", index, treatment_id),
        extension,
    ))
}

/// Closure decision request
#[derive(Debug, Deserialize)]
pub struct ClosureRequest {
    pub decision: Option<String>,
    pub approver: Option<String>,
}

/// Decide a treatment's closure gate
pub async fn decide_closure(
    State(state): State<AppState>,
    ApiPath((risk_id, treatment_id)): ApiPath<(String, String)>,
    payload: Result<Json<ClosureRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Treatment>>> {
    let request = read_body(payload)?;
    let decision = match request.decision.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => d.parse::<ClosureApproval>().map_err(AgendaError::from)?,
        _ => return Err(vec![FieldError::new("decision", "is required")].into()),
    };
    let treatment = state.lifecycle.decide_closure(
        &risk_id,
        &treatment_id,
        decision,
        request.approver.as_deref().unwrap_or_default(),
    )?;
    Ok(ok_with(
        format!("Closure of {} {}", treatment.treatment_id, decision.as_str().to_lowercase()),
        treatment,
    ))
}

fn treatment_not_found(risk_id: &str, treatment_id: &str) -> AgendaError {
    AgendaError::not_found("treatment", format!("{}/{}", risk_id, treatment_id))
}
