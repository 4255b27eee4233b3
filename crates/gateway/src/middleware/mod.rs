//! Gateway middleware

pub mod rate_limit;

use axum::{extract::MatchedPath, extract::Request, middleware::Next, response::Response};
use pitchforge_common::metrics::RequestMetrics;

/// Per-request metrics: counter and latency histogram keyed by route
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let recorder = RequestMetrics::start(&method, &endpoint);
    let response = next.run(request).await;
    recorder.finish(response.status().as_u16());

    response
}
