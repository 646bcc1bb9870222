//! Request correlation and access logging.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Tag the request with an id, run it, and log the outcome.
pub async fn tag_and_log(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status >= 500 {
        tracing::warn!(%request_id, %method, %path, status, elapsed_ms, "Request failed");
    } else {
        tracing::info!(%request_id, %method, %path, status, elapsed_ms, "Request handled");
    }

    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
