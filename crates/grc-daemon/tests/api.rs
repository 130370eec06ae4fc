// HTTP surface tests driven through the router with tower's oneshot.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Days;
use grc_daemon::{create_router, AppState};
use grc_register::dates;
use grc_register::{EventDispatcher, Risk, RiskPhase, Treatment, Workshop, WorkshopStatus};
use grc_store::{EntityStore, MemoryStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn seeded() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_risk(&Risk::new("RISK-010", "Single supplier").in_phase(RiskPhase::Treatment))
        .unwrap();
    store
        .insert_treatment(&Treatment::new("RISK-010", "TREAT-010-01", "Second supplier"))
        .unwrap();
    store
        .insert_workshop(&Workshop::new(
            "WS-2025-03",
            "Quarterly review",
            WorkshopStatus::Scheduled,
            dates::today() + Days::new(1),
        ))
        .unwrap();

    let shared: Arc<dyn EntityStore> = store.clone();
    let app = create_router(AppState::new(shared, EventDispatcher::new()));
    (app, store)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _) = seeded();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn closure_agenda_add_succeeds() {
    let (app, store) = seeded();
    let (status, body) = call(
        &app,
        Method::POST,
        "/workshops/WS-2025-03/agenda",
        Some(json!({
            "riskId": "RISK-010",
            "topic": "closure",
            "selectedTreatments": ["TREAT-010-01"]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["workshopId"], "WS-2025-03");
    assert_eq!(body["data"]["riskId"], "RISK-010");
    assert_eq!(body["data"]["topic"], "closure");
    assert!(body["data"]["addedAt"].is_string());
    assert!(body["message"].is_string());

    let ws = store.get_workshop("WS-2025-03").unwrap().unwrap();
    assert_eq!(ws.closure.len(), 1);
    assert_eq!(ws.closure[0].selected_treatments, vec!["TREAT-010-01"]);
}

#[tokio::test]
async fn new_risk_topic_rejects_treatment_phase() {
    let (app, _) = seeded();
    let (status, body) = call(
        &app,
        Method::POST,
        "/workshops/WS-2025-03/agenda",
        Some(json!({ "riskId": "RISK-010", "topic": "newRisks" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Treatment") && error.contains("newRisks"), "{}", error);
}

#[tokio::test]
async fn agenda_input_errors() {
    let (app, _) = seeded();

    let (status, body) = call(
        &app,
        Method::POST,
        "/workshops/WS-2025-03/agenda",
        Some(json!({ "topic": "later" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);

    let (status, _) = call(
        &app,
        Method::POST,
        "/workshops/WS-1999-01/agenda",
        Some(json!({ "riskId": "RISK-010", "topic": "newRisks" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        "/workshops/WS-2025-03/agenda",
        Some(json!({ "riskId": "RISK-010", "topic": "extensions", "selectedTreatments": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "selectedTreatments");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/workshops/WS-2025-03/agenda")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn duplicate_add_is_rejected() {
    let (app, _) = seeded();
    let payload = json!({
        "riskId": "RISK-010",
        "topic": "extensions",
        "selectedTreatments": ["TREAT-010-01"]
    });
    let uri = "/workshops/WS-2025-03/agenda";
    let (first, _) = call(&app, Method::POST, uri, Some(payload.clone())).await;
    assert_eq!(first, StatusCode::OK);
    let (second, body) = call(&app, Method::POST, uri, Some(payload)).await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already"));
}

#[tokio::test]
async fn extension_request_flow() {
    let (app, store) = seeded();
    let uri = "/treatments/RISK-010/TREAT-010-01/extensions";

    let yesterday = (dates::today() - Days::new(1)).to_string();
    let (status, _) = call(
        &app,
        Method::POST,
        uri,
        Some(json!({ "extendedDueDate": yesterday, "justification": "Parts delayed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        uri,
        Some(json!({ "extendedDueDate": "not-a-date", "justification": "Parts delayed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        store
            .get_treatment("RISK-010", "TREAT-010-01")
            .unwrap()
            .unwrap()
            .number_of_extensions,
        0
    );

    let due = (dates::today() + Days::new(30)).to_string();
    let (status, body) = call(
        &app,
        Method::POST,
        uri,
        Some(json!({ "extendedDueDate": due, "justification": "Parts delayed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["extension"]["approver"], "Pending Approval");
    assert_eq!(body["extension"]["extendedDueDate"], due);
    assert_eq!(body["numberOfExtensions"], 1);

    let (status, body) = call(
        &app,
        Method::POST,
        "/treatments/RISK-010/TREAT-010-01/extensions/0/approve",
        Some(json!({ "approver": "ciso" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["approver"], "ciso");

    let (status, _) = call(
        &app,
        Method::POST,
        "/treatments/RISK-010/TREAT-010-99/extensions",
        Some(json!({ "extendedDueDate": due, "justification": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn decided_closure_blocks_agenda() {
    let (app, _) = seeded();
    let (status, body) = call(
        &app,
        Method::POST,
        "/treatments/RISK-010/TREAT-010-01/closure",
        Some(json!({ "decision": "approved", "approver": "ciso" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["closureApproval"], "Approved");

    let (status, body) = call(
        &app,
        Method::POST,
        "/workshops/WS-2025-03/agenda",
        Some(json!({
            "riskId": "RISK-010",
            "topic": "closure",
            "selectedTreatments": ["TREAT-010-01"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("TREAT-010-01"));
}

#[tokio::test]
async fn risk_crud_and_phase() {
    let (app, _) = seeded();

    let (status, body) = call(
        &app,
        Method::POST,
        "/risks",
        Some(json!({ "statement": "Laptop theft", "likelihood": 3, "impact": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["riskId"], "RISK-011");
    assert_eq!(body["data"]["currentPhase"], "Draft");

    let (status, body) = call(
        &app,
        Method::PUT,
        "/risks/RISK-011",
        Some(json!({ "owner": "IT" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["owner"], "IT");

    let (status, body) = call(
        &app,
        Method::PUT,
        "/risks/RISK-011",
        Some(json!({ "currentPhase": "Closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "currentPhase");

    let (status, body) = call(
        &app,
        Method::POST,
        "/risks/RISK-011/phase",
        Some(json!({ "phase": "identification" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["currentPhase"], "Identification");

    let (status, _) = call(
        &app,
        Method::POST,
        "/risks/RISK-011/phase",
        Some(json!({ "phase": "Closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::GET, "/workshops/WS-2025-03/eligible?topic=newRisks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["riskId"], "RISK-011");

    let (status, _) = call(&app, Method::DELETE, "/risks/RISK-011", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/risks/RISK-011", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn risk_create_rejects_later_phases() {
    let (app, store) = seeded();

    let (status, body) = call(
        &app,
        Method::POST,
        "/risks",
        Some(json!({ "statement": "Shadow IT", "currentPhase": "Monitoring" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["success"], false);
    assert_eq!(body["details"][0]["field"], "currentPhase");
    assert_eq!(store.list_risks().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::POST,
        "/risks",
        Some(json!({ "statement": "Shadow IT", "currentPhase": "Identification" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["currentPhase"], "Identification");
}

#[tokio::test]
async fn malformed_path_and_query_use_error_envelope() {
    let (app, _) = seeded();

    let (status, body) = call(
        &app,
        Method::POST,
        "/treatments/RISK-010/TREAT-010-01/extensions/abc/approve",
        Some(json!({ "approver": "ciso" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, body) = call(
        &app,
        Method::GET,
        "/workshops/WS-2025-03/eligible?topic=closure&topic=extensions",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn treatment_and_workshop_crud() {
    let (app, _) = seeded();

    let (status, body) = call(
        &app,
        Method::POST,
        "/treatments/RISK-010",
        Some(json!({ "description": "Contract escrow" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["treatmentId"], "TREAT-010-02");
    assert_eq!(body["data"]["closureApproval"], "Pending");

    let (status, _) = call(
        &app,
        Method::POST,
        "/treatments/RISK-404",
        Some(json!({ "description": "Orphan" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::GET, "/treatments/RISK-010", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        Method::POST,
        "/workshops",
        Some(json!({
            "id": "WS-2025-04",
            "status": "Planned",
            "date": "2099-04-15",
            "closure": [{ "riskId": "RISK-010" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "closure");

    let (status, _) = call(
        &app,
        Method::POST,
        "/workshops",
        Some(json!({ "id": "WS-2025-04", "status": "Planned", "date": "2099-04-15" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/workshops/WS-2025-04",
        Some(json!({ "status": "Cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "Cancelled");

    let (status, body) = call(&app, Method::GET, "/workshops", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn agenda_notes_and_removal() {
    let (app, _) = seeded();
    let (status, _) = call(
        &app,
        Method::POST,
        "/workshops/WS-2025-03/agenda",
        Some(json!({
            "riskId": "RISK-010",
            "topic": "extensions",
            "selectedTreatments": ["TREAT-010-01"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/workshops/WS-2025-03/agenda/extensions/RISK-010",
        Some(json!({ "toDo": "Collect supplier letter" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["toDo"], "Collect supplier letter");

    let (status, _) = call(
        &app,
        Method::DELETE,
        "/workshops/WS-2025-03/agenda/bogus/RISK-010",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::DELETE,
        "/workshops/WS-2025-03/agenda/extensions/RISK-010",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        Method::DELETE,
        "/workshops/WS-2025-03/agenda/extensions/RISK-010",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
