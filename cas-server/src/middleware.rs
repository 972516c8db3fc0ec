use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Request timing middleware
///
/// Only the path is logged; query strings carry tickets and service URLs.
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        duration_ms = start.elapsed().as_millis(),
        status = response.status().as_u16(),
        "Request processed"
    );

    response
}
