//! Prometheus metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `gatehouse_http_requests_total` | Counter | method, endpoint, status |
//! | `gatehouse_http_request_duration_seconds` | Histogram | method, endpoint |
//! | `gatehouse_auth_events_total` | Counter | event |

use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Instant;

lazy_static! {
    static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gatehouse_http_requests_total",
        "HTTP requests by method, endpoint and status",
        &["method", "endpoint", "status"]
    )
    .expect("Failed to register http_requests_total metric");

    static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "gatehouse_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register http_request_duration metric");

    static ref AUTH_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gatehouse_auth_events_total",
        "Authentication and authorization events by kind",
        &["event"]
    )
    .expect("Failed to register auth_events_total metric");
}

/// Count one audit event
pub fn record_auth_event(event: &str) {
    AUTH_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Records request count and latency per normalized endpoint
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, &status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &endpoint])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Render every registered metric in the Prometheus text format
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Replace id segments with `:id` so label cardinality stays bounded
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if uuid::Uuid::parse_str(seg).is_ok() || is_numeric(seg) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
