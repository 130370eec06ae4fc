//! Risk handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use grc_agenda::AgendaError;
use grc_register::validation::validate_risk;
use grc_register::{next_risk_id, FieldError, Risk, RiskPhase};
use serde::Deserialize;
use serde_json::Value;

use super::{is_unset, object_mut, ok, ok_with, patch_document, read_body, ApiPath, Envelope};
use crate::error::ApiResult;
use crate::state::AppState;

/// Fields a PUT may not change. Phase moves go through `/risks/{id}/phase`.
const IMMUTABLE: &[&str] = &["riskId", "currentPhase", "createdAt"];

/// List all risks
pub async fn list_risks(State(state): State<AppState>) -> ApiResult<Json<Envelope<Vec<Risk>>>> {
    Ok(ok(state.store.list_risks()?))
}

/// Get one risk
pub async fn get_risk(
    State(state): State<AppState>,
    ApiPath(risk_id): ApiPath<String>,
) -> ApiResult<Json<Envelope<Risk>>> {
    let risk = state
        .store
        .get_risk(&risk_id)?
        .ok_or_else(|| AgendaError::not_found("risk", &risk_id))?;
    Ok(ok(risk))
}

/// Create a risk. `riskId` is allocated when absent. New risks start in
/// Draft unless Identification is given; later phases are reached through
/// `/risks/{id}/phase`.
pub async fn create_risk(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Risk>>)> {
    let mut doc = read_body(payload)?;
    let obj = object_mut(&mut doc)?;
    if is_unset(obj, "riskId") {
        let existing = state.store.list_risks()?;
        let id = next_risk_id(existing.iter().map(|r| r.risk_id.as_str()));
        obj.insert("riskId".into(), Value::String(id));
    }
    if is_unset(obj, "currentPhase") {
        obj.insert(
            "currentPhase".into(),
            Value::String(RiskPhase::Draft.as_str().into()),
        );
    }

    let risk = validate_risk(&doc)?;
    if !risk.current_phase.is_entry_phase() {
        return Err(vec![FieldError::new(
            "currentPhase",
            format!(
                "new risks start in Draft or Identification, not {}",
                risk.current_phase
            ),
        )]
        .into());
    }
    state.store.insert_risk(&risk)?;

    tracing::info!(risk_id = %risk.risk_id, phase = %risk.current_phase, "Created risk");
    Ok((
        StatusCode::CREATED,
        ok_with(format!("Risk {} created", risk.risk_id), risk),
    ))
}

/// Patch a risk's descriptive fields
pub async fn update_risk(
    State(state): State<AppState>,
    ApiPath(risk_id): ApiPath<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<Risk>>> {
    let patch = read_body(payload)?;
    let risk = patch_document(
        |m| state.store.modify_risk(&risk_id, m),
        &patch,
        IMMUTABLE,
        validate_risk,
        |r: &mut Risk| r.updated_at = Utc::now(),
    )?
    .ok_or_else(|| AgendaError::not_found("risk", &risk_id))?;

    tracing::info!(risk_id = %risk.risk_id, "Updated risk");
    Ok(ok_with(format!("Risk {} updated", risk.risk_id), risk))
}

/// Delete a risk
pub async fn delete_risk(
    State(state): State<AppState>,
    ApiPath(risk_id): ApiPath<String>,
) -> ApiResult<Json<Envelope<Value>>> {
    if !state.store.delete_risk(&risk_id)? {
        return Err(AgendaError::not_found("risk", &risk_id).into());
    }
    tracing::info!(risk_id = %risk_id, "Deleted risk");
    Ok(ok_with(
        format!("Risk {} deleted", risk_id),
        serde_json::json!({ "riskId": risk_id }),
    ))
}

/// Advance phase request
#[derive(Debug, Deserialize)]
pub struct AdvancePhaseRequest {
    pub phase: Option<String>,
}

/// Move a risk to its next phase
pub async fn advance_phase(
    State(state): State<AppState>,
    ApiPath(risk_id): ApiPath<String>,
    payload: Result<Json<AdvancePhaseRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Risk>>> {
    let request = read_body(payload)?;
    let phase = match request.phase.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p.parse::<RiskPhase>().map_err(AgendaError::from)?,
        _ => return Err(vec![FieldError::new("phase", "is required")].into()),
    };

    let risk = state.lifecycle.advance_risk_phase(&risk_id, phase)?;
    Ok(ok_with(
        format!("Risk {} moved to {}", risk.risk_id, risk.current_phase),
        risk,
    ))
}
