/// Metrics and telemetry for hashvault
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Uploads by outcome and canonical bytes written
/// - Fetches by outcome
/// - Request errors by kind

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_int_counter, register_int_counter_vec, Encoder, Gauge, IntCounter,
    IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== Blob Metrics ==========

    /// Uploads by output format and outcome ("stored" or "deduplicated")
    pub static ref BLOB_UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blob_uploads_total",
        "Total number of accepted blob uploads",
        &["format", "outcome"]
    )
    .unwrap();

    /// Canonical bytes newly written to storage
    pub static ref BLOB_BYTES_STORED_TOTAL: IntCounter = register_int_counter!(
        "blob_bytes_stored_total",
        "Total canonical bytes written to storage"
    )
    .unwrap();

    /// Fetches by outcome ("hit", "miss" or "invalid")
    pub static ref BLOB_FETCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blob_fetches_total",
        "Total number of blob fetch attempts",
        &["outcome"]
    )
    .unwrap();

    // ========== Error Metrics ==========

    /// Error responses by error code
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total number of error responses",
        &["code"]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an accepted upload
pub fn record_blob_upload(format: &str, created: bool, size: usize) {
    let outcome = if created { "stored" } else { "deduplicated" };
    BLOB_UPLOADS_TOTAL.with_label_values(&[format, outcome]).inc();
    if created {
        BLOB_BYTES_STORED_TOTAL.inc_by(size as u64);
    }
}

/// Record a fetch attempt
pub fn record_blob_fetch(outcome: &str) {
    BLOB_FETCHES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an error response
pub fn record_error(code: &str) {
    ERRORS_TOTAL.with_label_values(&[code]).inc();
}

/// Update the uptime gauge
pub fn set_uptime(seconds: f64) {
    UPTIME_SECONDS.set(seconds);
}
