//! Workshop agenda handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use grc_agenda::{AgendaAddition, AgendaNotes, AgendaRequest};
use grc_register::AgendaItem;
use serde::Deserialize;

use super::{ok_with, parse_topic, read_body, ApiPath, Envelope};
use crate::error::ApiResult;
use crate::state::AppState;

/// Add-to-agenda request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToAgendaRequest {
    pub risk_id: Option<String>,
    pub topic: Option<String>,
    pub selected_treatments: Option<Vec<String>>,
}

/// Put a risk on one topic of a workshop agenda
pub async fn add_to_agenda(
    State(state): State<AppState>,
    ApiPath(workshop_id): ApiPath<String>,
    payload: Result<Json<AddToAgendaRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<AgendaAddition>>> {
    let body = read_body(payload)?;
    let request = AgendaRequest::from_fields(
        body.risk_id.as_deref(),
        body.topic.as_deref(),
        body.selected_treatments,
    )?;

    let addition = state.engine.add_to_agenda(&workshop_id, &request)?;
    Ok(ok_with(
        format!(
            "Risk {} added to the {} agenda of workshop {}",
            addition.risk_id, addition.topic, addition.workshop_id
        ),
        addition,
    ))
}

/// Take a risk off one topic of a workshop agenda
pub async fn remove_from_agenda(
    State(state): State<AppState>,
    ApiPath((workshop_id, topic, risk_id)): ApiPath<(String, String, String)>,
) -> ApiResult<Json<Envelope<AgendaItem>>> {
    let topic = parse_topic(&topic)?;
    let item = state
        .engine
        .remove_from_agenda(&workshop_id, topic, &risk_id)?;
    Ok(ok_with(
        format!("Risk {} removed from the {} agenda", risk_id, topic),
        item,
    ))
}

/// Record discussion notes on an agenda item
pub async fn record_notes(
    State(state): State<AppState>,
    ApiPath((workshop_id, topic, risk_id)): ApiPath<(String, String, String)>,
    payload: Result<Json<AgendaNotes>, JsonRejection>,
) -> ApiResult<Json<Envelope<AgendaItem>>> {
    let topic = parse_topic(&topic)?;
    let notes = read_body(payload)?;
    let item = state
        .engine
        .record_notes(&workshop_id, topic, &risk_id, &notes)?;
    Ok(ok_with(
        format!("Notes recorded for risk {} on the {} agenda", risk_id, topic),
        item,
    ))
}
