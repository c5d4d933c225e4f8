//! Integration tests for the HTTP API.
//!
//! Drives the router with `oneshot` requests against the in-memory store.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use dance_live::CompetitionManager;
use dance_live::competition::{Event, ModalityConfig, Participant, StaffMember, StaffPermissions};
use dance_live::db::InMemoryStore;
use dl_server::api::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const EVENT: &str = "gala";

fn participant(i: usize) -> Participant {
    Participant {
        id: format!("p{}", i),
        competitors: vec![format!("u{}", i)],
        category: "Adult".to_string(),
        modality: "Salsa".to_string(),
        event_id: EVENT.to_string(),
        phase: None,
        status: "confirmed".to_string(),
    }
}

fn gala() -> Event {
    Event::new(EVENT, "Winter Gala", "org")
        .with_modality(
            "Salsa",
            ModalityConfig {
                blocks_per_heat: 1,
                tracks_per_block: 2,
                single_phase: false,
            },
        )
        .with_staff(StaffMember {
            user_id: "j1".to_string(),
            name: "Judge One".to_string(),
            permissions: StaffPermissions {
                judge: true,
                starts_judging: true,
                manage: false,
            },
        })
}

/// Helper to create test server with `participants` registered women
fn create_test_server(participants: usize) -> Router {
    let mut store = InMemoryStore::new().with_event(gala());
    for i in 0..participants {
        store = store
            .with_participant(participant(i))
            .with_gender(&format!("u{}", i), "F");
    }
    let manager = CompetitionManager::in_memory(Arc::new(store));
    create_router(AppState::new(manager))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn bracket_uri(suffix: &str) -> String {
    format!("/api/v1/events/{}/brackets/Salsa_Adult_Women{}", EVENT, suffix)
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server(0);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], true);
}

// ============================================================================
// Identity and Permission Tests
// ============================================================================

#[tokio::test]
async fn test_mutation_without_identity_is_unauthorized() {
    let app = create_test_server(3);

    let uri = format!("/api/v1/events/{}/start", EVENT);
    let (status, _) = send(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", &uri, Some("   "), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_judge_cannot_start_event() {
    let app = create_test_server(3);

    let uri = format!("/api/v1/events/{}/start", EVENT);
    let (status, body) = send(&app, "POST", &uri, Some("j1"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("j1"));
}

#[tokio::test]
async fn test_reads_are_public() {
    let app = create_test_server(3);

    let uri = format!("/api/v1/events/{}/progress", EVENT);
    let (status, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_brackets"], 0);
    assert_eq!(body["is_event_completed"], false);
}

// ============================================================================
// Error Mapping Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let app = create_test_server(3);

    let (status, body) = send(&app, "POST", "/api/v1/events/nope/start", Some("org"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = send(&app, "GET", "/api/v1/events/nope/brackets", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_without_participants_is_unprocessable() {
    let app = create_test_server(0);

    let uri = format!("/api/v1/events/{}/start", EVENT);
    let (status, _) = send(&app, "POST", &uri, Some("org"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_start_twice_conflicts() {
    let app = create_test_server(3);

    let uri = format!("/api/v1/events/{}/start", EVENT);
    let (status, _) = send(&app, "POST", &uri, Some("org"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", &uri, Some("org"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_heat_is_not_found() {
    let app = create_test_server(3);

    let start = format!("/api/v1/events/{}/start", EVENT);
    send(&app, "POST", &start, Some("org"), None).await;

    let (status, _) = send(&app, "GET", &bracket_uri("/heats/0"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", &bracket_uri("/heats/9/finalize"), Some("org"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_confirm_rejects_plan_for_other_bracket() {
    let app = create_test_server(3);

    let start = format!("/api/v1/events/{}/start", EVENT);
    send(&app, "POST", &start, Some("org"), None).await;

    let (status, mut plan) = send(&app, "POST", &bracket_uri("/heats/plan"), Some("org"), None).await;
    assert_eq!(status, StatusCode::OK);
    plan["bracket_id"] = json!("Salsa_Adult_Men");

    let (status, _) = send(
        &app,
        "POST",
        &bracket_uri("/heats/confirm"),
        Some("org"),
        Some(plan),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Full Flow Tests
// ============================================================================

#[tokio::test]
async fn test_full_event_flow() {
    let app = create_test_server(3);

    // Start
    let uri = format!("/api/v1/events/{}/start", EVENT);
    let (status, body) = send(&app, "POST", &uri, Some("org"), None).await;
    assert_eq!(status, StatusCode::OK);
    let brackets = body["brackets"].as_array().unwrap();
    assert_eq!(brackets.len(), 1);
    assert_eq!(brackets[0]["id"], "Salsa_Adult_Women");
    assert_eq!(brackets[0]["status"], "active");
    assert_eq!(brackets[0]["total_heats"], 2);

    // Plan, then confirm
    let (status, plan) = send(&app, "POST", &bracket_uri("/heats/plan"), Some("org"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["heats"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        "POST",
        &bracket_uri("/heats/confirm"),
        Some("org"),
        Some(plan.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["heats"], 2);

    // Second confirmation is refused
    let (status, _) = send(
        &app,
        "POST",
        &bracket_uri("/heats/confirm"),
        Some("org"),
        Some(plan),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, heats) = send(&app, "GET", &bracket_uri("/heats"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(heats.as_array().unwrap().len(), 2);

    let (status, heat) = send(&app, "GET", &bracket_uri("/heats/0"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(heat["status"], "pending");
    assert_eq!(heat["blocks"][0]["judges"], json!(["j1"]));

    // Judges close the heats, the retry is harmless
    let (status, bracket) =
        send(&app, "POST", &bracket_uri("/heats/0/finalize"), Some("j1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bracket["completed_heats"], 1);

    let (status, bracket) =
        send(&app, "POST", &bracket_uri("/heats/0/finalize"), Some("j1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bracket["completed_heats"], 1);

    let (status, bracket) =
        send(&app, "POST", &bracket_uri("/heats/1/finalize"), Some("j1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bracket["status"], "completed");

    let uri = format!("/api/v1/events/{}/progress", EVENT);
    let (status, progress) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["total_brackets"], 1);
    assert_eq!(progress["completed_brackets_count"], 1);
    assert_eq!(progress["is_event_completed"], true);
    assert!(progress["current_bracket"].is_null());
}

#[tokio::test]
async fn test_stranger_cannot_finalize() {
    let app = create_test_server(3);

    let start = format!("/api/v1/events/{}/start", EVENT);
    send(&app, "POST", &start, Some("org"), None).await;

    let (status, _) = send(
        &app,
        "POST",
        &bracket_uri("/heats/0/finalize"),
        Some("visitor"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
