//! API Router configuration

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Risks
        .route("/risks", get(handlers::list_risks).post(handlers::create_risk))
        .route(
            "/risks/{risk_id}",
            get(handlers::get_risk)
                .put(handlers::update_risk)
                .delete(handlers::delete_risk),
        )
        .route("/risks/{risk_id}/phase", post(handlers::advance_phase))
        // Treatments
        .route(
            "/treatments/{risk_id}",
            get(handlers::list_treatments).post(handlers::create_treatment),
        )
        .route(
            "/treatments/{risk_id}/{treatment_id}",
            get(handlers::get_treatment)
                .put(handlers::update_treatment)
                .delete(handlers::delete_treatment),
        )
        .route(
            "/treatments/{risk_id}/{treatment_id}/extensions",
            post(handlers::request_extension),
        )
        .route(
            "/treatments/{risk_id}/{treatment_id}/extensions/{index}/approve",
            post(handlers::approve_extension),
        )
        .route(
            "/treatments/{risk_id}/{treatment_id}/closure",
            post(handlers::decide_closure),
        )
        // Workshops
        .route(
            "/workshops",
            get(handlers::list_workshops).post(handlers::create_workshop),
        )
        .route(
            "/workshops/{workshop_id}",
            get(handlers::get_workshop)
                .put(handlers::update_workshop)
                .delete(handlers::delete_workshop),
        )
        .route(
            "/workshops/{workshop_id}/eligible",
            get(handlers::eligible_risks),
        )
        // Agenda
        .route(
            "/workshops/{workshop_id}/agenda",
            post(handlers::add_to_agenda),
        )
        .route(
            "/workshops/{workshop_id}/agenda/{topic}/{risk_id}",
            put(handlers::record_notes).delete(handlers::remove_from_agenda),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
