//! HTTP API for the competition engine.
//!
//! # Modules
//!
//! - [`events`]: Event start, heat generation, heat completion and progress reads
//! - [`middleware`]: Caller identity and request accounting
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                                       - Store health (public)
//! GET  /api/v1/events/{event_id}/progress                            - Progress summary (public)
//! GET  /api/v1/events/{event_id}/brackets                            - Brackets in order (public)
//! GET  /api/v1/events/{event_id}/brackets/{bracket_id}/heats         - Stored heats (public)
//! GET  /api/v1/events/{event_id}/brackets/{bracket_id}/heats/{index} - One heat (public)
//! POST /api/v1/events/{event_id}/start                               - Start event (identity)
//! POST /api/v1/events/{event_id}/brackets/{bracket_id}/heats/plan    - Preview heats (identity)
//! POST /api/v1/events/{event_id}/brackets/{bracket_id}/heats/confirm - Store heats (identity)
//! POST /api/v1/events/{event_id}/brackets/{bracket_id}/heats/{index}/finalize
//!                                                                    - Close heat (identity)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use dance_live::CompetitionManager;
//! use dance_live::db::InMemoryStore;
//! use dl_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = CompetitionManager::in_memory(Arc::new(InMemoryStore::new()));
//! let app = create_router(AppState::new(manager));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod events;
pub mod middleware;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use dance_live::CompetitionManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CompetitionManager>,
}

impl AppState {
    pub fn new(manager: CompetitionManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(middleware::track_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/events/{event_id}/progress", get(events::event_progress))
        .route("/events/{event_id}/brackets", get(events::list_brackets))
        .route(
            "/events/{event_id}/brackets/{bracket_id}/heats",
            get(events::list_heats),
        )
        .route(
            "/events/{event_id}/brackets/{bracket_id}/heats/{index}",
            get(events::get_heat),
        );

    let protected_routes = Router::new()
        .route("/events/{event_id}/start", post(events::start_event))
        .route(
            "/events/{event_id}/brackets/{bracket_id}/heats/plan",
            post(events::plan_heats),
        )
        .route(
            "/events/{event_id}/brackets/{bracket_id}/heats/confirm",
            post(events::confirm_heats),
        )
        .route(
            "/events/{event_id}/brackets/{bracket_id}/heats/{index}/finalize",
            post(events::finalize_heat),
        )
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = state.manager.store().ping().await.is_ok();

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
