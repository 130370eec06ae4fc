//! Workshop handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use grc_agenda::AgendaError;
use grc_register::validation::validate_workshop;
use grc_register::{FieldError, Risk, Workshop};
use serde::Deserialize;
use serde_json::Value;

use super::{
    object_mut, ok, ok_with, parse_topic, patch_document, read_body, reject_managed_lists, ApiPath,
    ApiQuery, Envelope,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Agenda lists change only through the agenda endpoints.
const IMMUTABLE: &[&str] = &["id", "_id", "extensions", "closure", "newRisks", "createdAt"];

const AGENDA_LISTS: &[&str] = &["extensions", "closure", "newRisks"];

fn resolve(state: &AppState, workshop_ref: &str) -> ApiResult<Workshop> {
    state
        .store
        .find_workshop(workshop_ref)?
        .ok_or_else(|| AgendaError::not_found("workshop", workshop_ref).into())
}

/// List all workshops, by date
pub async fn list_workshops(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Vec<Workshop>>>> {
    Ok(ok(state.store.list_workshops()?))
}

/// Get one workshop by id or legacy `_id`
pub async fn get_workshop(
    State(state): State<AppState>,
    ApiPath(workshop_id): ApiPath<String>,
) -> ApiResult<Json<Envelope<Workshop>>> {
    Ok(ok(resolve(&state, &workshop_id)?))
}

/// Create a workshop with an empty agenda
pub async fn create_workshop(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Workshop>>)> {
    let mut doc = read_body(payload)?;
    let obj = object_mut(&mut doc)?;
    reject_managed_lists(obj, AGENDA_LISTS, "the agenda endpoint")?;

    let workshop = validate_workshop(&doc)?;
    state.store.insert_workshop(&workshop)?;

    tracing::info!(
        workshop_id = %workshop.id,
        status = %workshop.status,
        date = %workshop.date,
        "Created workshop"
    );
    Ok((
        StatusCode::CREATED,
        ok_with(format!("Workshop {} created", workshop.id), workshop),
    ))
}

/// Patch a workshop's title, status, date, or facilitator
pub async fn update_workshop(
    State(state): State<AppState>,
    ApiPath(workshop_id): ApiPath<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<Workshop>>> {
    let patch = read_body(payload)?;
    let id = resolve(&state, &workshop_id)?.id;
    let workshop = patch_document(
        |m| state.store.modify_workshop(&id, m),
        &patch,
        IMMUTABLE,
        validate_workshop,
        |w: &mut Workshop| w.updated_at = Utc::now(),
    )?
    .ok_or_else(|| AgendaError::not_found("workshop", &workshop_id))?;

    tracing::info!(workshop_id = %workshop.id, status = %workshop.status, "Updated workshop");
    Ok(ok_with(format!("Workshop {} updated", workshop.id), workshop))
}

/// Delete a workshop
pub async fn delete_workshop(
    State(state): State<AppState>,
    ApiPath(workshop_id): ApiPath<String>,
) -> ApiResult<Json<Envelope<Value>>> {
    let id = resolve(&state, &workshop_id)?.id;
    if !state.store.delete_workshop(&id)? {
        return Err(AgendaError::not_found("workshop", &workshop_id).into());
    }
    tracing::info!(workshop_id = %id, "Deleted workshop");
    Ok(ok_with(
        format!("Workshop {} deleted", id),
        serde_json::json!({ "id": id }),
    ))
}

/// Eligible-risk query
#[derive(Debug, Deserialize)]
pub struct EligibleQuery {
    pub topic: Option<String>,
}

/// Risks whose phase fits the topic and that are not yet on it
pub async fn eligible_risks(
    State(state): State<AppState>,
    ApiPath(workshop_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<EligibleQuery>,
) -> ApiResult<Json<Envelope<Vec<Risk>>>> {
    let topic = match query.topic.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_topic(raw)?,
        _ => return Err(vec![FieldError::new("topic", "is required")].into()),
    };
    Ok(ok(state.engine.eligible_risks(&workshop_id, topic)?))
}
