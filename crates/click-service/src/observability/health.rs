//! Health endpoints for the click service.
//!
//! - `GET /health` - Liveness probe (is the process running?)
//! - `GET /ready` - Readiness probe (is state hydrated and the store reachable?)
//!
//! The `/metrics` endpoint is served separately via `metrics-exporter-prometheus`.
//!
//! # Health State
//!
//! - `live`: always true after startup; draining only drops readiness
//! - `hydrated`: true once the coordinator has loaded authoritative state
//! - `store_reachable`: maintained by the state sync task

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness and readiness for the click service.
#[derive(Debug)]
pub struct HealthState {
    live: AtomicBool,
    hydrated: AtomicBool,
    store_reachable: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (live, not hydrated, store assumed reachable).
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            hydrated: AtomicBool::new(false),
            store_reachable: AtomicBool::new(true),
        }
    }

    /// Mark authoritative state as loaded.
    pub fn set_hydrated(&self) {
        self.hydrated.store(true, Ordering::SeqCst);
    }

    /// Record whether the last store round-trip succeeded.
    pub fn set_store_reachable(&self, reachable: bool) {
        self.store_reachable.store(reachable, Ordering::SeqCst);
    }

    /// Stop advertising readiness (shutdown drain).
    pub fn set_not_ready(&self) {
        self.hydrated.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.hydrated.load(Ordering::SeqCst) && self.store_reachable.load(Ordering::SeqCst)
    }
}

/// Create the health router with liveness and readiness endpoints.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

async fn liveness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
