//! Metrics definitions for the click service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `click_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: bounded by outcome enums (~5 values)
//! - `backend`: 2 values (memory, redis)
//! - `operation`: bounded by backend operations (~5 values)
//! - `stream`: 2 values (counter, winner)
//! - `endpoint`: static route table, everything else is "/other"

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("click_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("click_store_latency".to_string()),
            &[
                0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set store latency buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("click_increment_attempts".to_string()),
            &[1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0, 64.0],
        )
        .map_err(|e| format!("Failed to set increment attempt buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Counter Metrics
// ============================================================================

/// Record the outcome of an increment.
///
/// Metric: `click_increments_total`
/// Labels: `outcome` (committed, at_goal, winner_declared, error)
pub fn record_increment(outcome: &'static str) {
    counter!("click_increments_total", "outcome" => outcome).increment(1);
}

/// Record a lost compare-and-swap race.
///
/// Metric: `click_increment_conflicts_total`
pub fn record_increment_conflict() {
    counter!("click_increment_conflicts_total").increment(1);
}

/// Record how many attempts an increment needed before it resolved.
///
/// Metric: `click_increment_attempts`
pub fn record_increment_attempts(attempts: u32) {
    histogram!("click_increment_attempts").record(f64::from(attempts));
}

/// Record the single goal-reached transition.
///
/// Metric: `click_goal_reached_total`
pub fn record_goal_reached() {
    counter!("click_goal_reached_total").increment(1);
}

// ============================================================================
// Winner Metrics
// ============================================================================

/// Record the outcome of a winner claim.
///
/// Metric: `click_claims_total`
/// Labels: `outcome` (accepted, already_claimed, goal_not_reached, invalid, error)
pub fn record_claim(outcome: &'static str) {
    counter!("click_claims_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// Store & Invariant Metrics
// ============================================================================

/// Record storage backend operation latency.
///
/// Metric: `click_store_latency_seconds`
/// Labels: `backend`, `operation`
pub fn record_store_latency(backend: &'static str, operation: &'static str, duration: Duration) {
    histogram!(
        "click_store_latency_seconds",
        "backend" => backend,
        "operation" => operation
    )
    .record(duration.as_secs_f64());
}

/// Record a detected invariant violation.
///
/// Metric: `click_invariant_violations_total`
/// Labels: `kind` (count_exceeds_goal, count_regressed, corrupt_record)
pub fn record_invariant_violation(kind: &'static str) {
    counter!("click_invariant_violations_total", "kind" => kind).increment(1);
}

// ============================================================================
// Observer Metrics (Gauges)
// ============================================================================

/// Set the number of live subscriptions on a stream.
///
/// Metric: `click_observers_active`
/// Labels: `stream` (counter, winner)
pub fn set_observers_active(stream: &'static str, count: usize) {
    // usize to f64 conversion is safe for realistic observer counts
    #[allow(clippy::cast_precision_loss)]
    gauge!("click_observers_active", "stream" => stream).set(count as f64);
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metrics: `click_http_request_duration_seconds`, `click_http_requests_total`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("click_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("click_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the static route table.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/counter" => "/api/v1/counter",
        "/api/v1/counter/increment" => "/api/v1/counter/increment",
        "/api/v1/counter/events" => "/api/v1/counter/events",
        "/api/v1/winner" => "/api/v1/winner",
        "/api/v1/winner/events" => "/api/v1/winner/events",
        _ => "/other",
    }
}
