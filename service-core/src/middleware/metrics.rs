use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use std::time::Instant;

/// Label used for requests no route or handler classified.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Route template a fallback handler attaches to its response so the
/// `path` label stays bounded when axum has no `MatchedPath`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTemplate(pub &'static str);

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let matched = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string());

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16().to_string();
    let path = route_label(matched, &response);

    let labels = [("method", method), ("path", path), ("status", status)];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    response
}

/// Never the raw URI: ids in paths would create a series per record.
fn route_label(matched: Option<String>, response: &Response) -> String {
    matched
        .or_else(|| {
            response
                .extensions()
                .get::<RouteTemplate>()
                .map(|t| t.0.to_string())
        })
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}
