/// Metrics and telemetry for vidhub
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Asset store uploads and retirements
/// - Like and subscription toggles
/// - Background job execution

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vidhub_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("register vidhub_http_requests_total");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "vidhub_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("register vidhub_http_request_duration_seconds");

    // ========== Asset Store Metrics ==========

    /// Asset uploads by kind and outcome
    pub static ref ASSET_UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vidhub_asset_uploads_total",
        "Total number of asset store uploads",
        &["kind", "outcome"]
    )
    .expect("register vidhub_asset_uploads_total");

    /// Asset retirements by kind and outcome
    pub static ref ASSET_RETIREMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vidhub_asset_retirements_total",
        "Total number of asset store retirements",
        &["kind", "outcome"]
    )
    .expect("register vidhub_asset_retirements_total");

    /// Retirements waiting in the retry queue
    pub static ref PENDING_RETIREMENTS: IntGauge = register_int_gauge!(
        "vidhub_pending_retirements",
        "Remote assets whose retirement is queued for retry"
    )
    .expect("register vidhub_pending_retirements");

    // ========== Relation Metrics ==========

    /// Toggle outcomes by relation
    pub static ref TOGGLES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vidhub_toggles_total",
        "Total number of relation toggles",
        &["relation", "outcome"]
    )
    .expect("register vidhub_toggles_total");

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vidhub_background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .expect("register vidhub_background_jobs_total");

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "vidhub_background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]
    )
    .expect("register vidhub_background_job_duration_seconds");

    // ========== Error Metrics ==========

    /// Error responses by error code
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vidhub_errors_total",
        "Total number of error responses",
        &["error_type"]
    )
    .expect("register vidhub_errors_total");
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match render_metrics() {
        Ok(body) => (
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Middleware recording request counts and latencies
///
/// The matched route template is used as the path label so ids do not
/// explode label cardinality.
pub async fn track_http(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record an asset upload attempt
pub fn record_asset_upload(kind: &str, success: bool) {
    ASSET_UPLOADS_TOTAL
        .with_label_values(&[kind, if success { "success" } else { "failure" }])
        .inc();
}

/// Record an asset retirement attempt
pub fn record_asset_retirement(kind: &str, success: bool) {
    ASSET_RETIREMENTS_TOTAL
        .with_label_values(&[kind, if success { "success" } else { "failure" }])
        .inc();
}

/// Record a toggle outcome
pub fn record_toggle(relation: &str, outcome: &str) {
    TOGGLES_TOTAL.with_label_values(&[relation, outcome]).inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record an error response
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
