//! Request middleware: caller identity and request accounting.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user ID in the `X-User-Id` header. [`identity_middleware`] turns it into an
//! [`Actor`] in the request extensions, where handlers pick it up:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use dance_live::Actor;
//!
//! async fn protected_handler(Extension(actor): Extension<Actor>) -> String {
//!     format!("Acting as {}", actor.user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use dance_live::Actor;
use std::time::Instant;

use crate::{logging, metrics};

/// Header carrying the authenticated user ID
pub const USER_ID_HEADER: &str = "x-user-id";

fn user_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Inject the caller as `Extension<Actor>`.
///
/// # Behavior
///
/// - **Header present**: Injects `Actor` → Calls next handler
/// - **Missing or blank header**: Returns `401 Unauthorized`
pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    match user_id(&request) {
        Some(user_id) => {
            request.extensions_mut().insert(Actor::new(user_id));
            Ok(next.run(request).await)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Count and log every request against its matched route
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let caller = user_id(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::http_requests_total(&method, &path, status);
    metrics::http_request_duration_ms(&method, &path, elapsed.as_secs_f64() * 1000.0);
    logging::log_api_request(&method, &path, status, elapsed, caller.as_deref());

    response
}
