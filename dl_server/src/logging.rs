//! Structured logging configuration.
//!
//! The engine crate logs through the `log` facade; the subscriber installed
//! here forwards those records into `tracing` alongside the server's own spans.

use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Slow-request threshold for [`log_api_request`]
const SLOW_REQUEST: Duration = Duration::from_millis(1000);

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to `info,sqlx=warn`.
///
/// # Example
///
/// ```no_run
/// use dl_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed API request
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Matched route
/// * `status_code` - Response status code
/// * `elapsed` - Time spent in the handler
/// * `user_id` - Caller, when identified
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    elapsed: Duration,
    user_id: Option<&str>,
) {
    let duration_ms = elapsed.as_millis() as u64;
    if elapsed > SLOW_REQUEST {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            user_id = user_id,
            "Slow API request"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            user_id = user_id,
            "API request completed"
        );
    }
}

/// Log a request rejected for lack of permission
pub fn log_forbidden(user_id: &str, action: &str) {
    tracing::warn!(user_id = user_id, action = action, "Forbidden competition call");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_api_request() {
        // Just ensure it doesn't panic
        log_api_request("GET", "/api/v1/events/e1/progress", 200, Duration::from_millis(4), Some("org"));
        log_api_request("POST", "/api/v1/events/e1/start", 409, Duration::from_secs(2), None);
    }

    #[test]
    fn test_log_forbidden() {
        log_forbidden("visitor", "close heats");
    }
}
