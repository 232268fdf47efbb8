//! Request logging for the admin router.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Logs method, path, status and latency of every admin request.
///
/// `/health` is polled by probes and only logged at DEBUG.
pub async fn request_logging_simple(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if path == "/health" {
        debug!(method = %method, path = %path, status, latency_ms, "health probe");
    } else if status >= 500 {
        warn!(method = %method, path = %path, status, latency_ms, "admin request failed");
    } else if status >= 400 {
        info!(method = %method, path = %path, status, latency_ms, "admin request rejected");
    } else {
        info!(method = %method, path = %path, status, latency_ms, "admin request completed");
    }

    response
}
