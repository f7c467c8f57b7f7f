//! Prometheus metrics for feed-service.
//!
//! Collectors register with the default registry; `/metrics` renders it.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Duration;

lazy_static! {
    /// Feed pages served, by source (cache, store).
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_request_total",
        "Total feed requests segmented by data source",
        &["source"]
    )
    .expect("failed to register feed_request_total");

    /// Fan-out events handled, by kind and outcome (applied, skipped, failed, timeout, panicked).
    pub static ref FEED_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_events_total",
        "Feed fan-out events segmented by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("failed to register feed_events_total");

    /// Events dropped before reaching a worker (queue_full, closed).
    pub static ref FEED_EVENTS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_events_dropped_total",
        "Feed events dropped at publish time",
        &["kind", "reason"]
    )
    .expect("failed to register feed_events_dropped_total");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency by method, route and status",
        &["method", "path", "status"]
    )
    .expect("failed to register http_request_duration_seconds");
}

pub fn record_feed_request(source: &str) {
    FEED_REQUEST_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_event(kind: &str, outcome: &str) {
    FEED_EVENTS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_dropped_event(kind: &str, reason: &str) {
    FEED_EVENTS_DROPPED_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status.to_string()])
        .observe(elapsed.as_secs_f64());
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
