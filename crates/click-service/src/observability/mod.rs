//! Observability for the click service.
//!
//! # Privacy by Default
//!
//! Instrumented functions use `#[instrument(skip_all)]`. Claimant identities
//! are only ever logged in redacted form (`***@domain`).
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `click_increments_total` | Counter | `outcome` | Increment outcomes |
//! | `click_increment_conflicts_total` | Counter | none | Lost CAS races |
//! | `click_increment_attempts` | Histogram | none | Attempts per increment |
//! | `click_goal_reached_total` | Counter | none | Goal transitions observed |
//! | `click_claims_total` | Counter | `outcome` | Winner claim outcomes |
//! | `click_store_latency_seconds` | Histogram | `backend`, `operation` | Store round-trips |
//! | `click_invariant_violations_total` | Counter | `kind` | Corrupt or out-of-bound state |
//! | `click_observers_active` | Gauge | `stream` | Live subscriptions |
//! | `click_http_requests_total` | Counter | `method`, `endpoint`, `status_code` | HTTP traffic |
//! | `click_http_request_duration_seconds` | Histogram | `method`, `endpoint`, `status` | HTTP latency |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;
