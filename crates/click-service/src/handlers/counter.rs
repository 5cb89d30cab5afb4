//! Counter handlers.
//!
//! - `GET /api/v1/counter` - authoritative snapshot
//! - `POST /api/v1/counter/increment` - add one click
//! - `GET /api/v1/counter/events` - SSE stream of snapshots

use crate::errors::ClickError;
use crate::models::{CounterResponse, IncrementResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/counter
#[instrument(skip_all, name = "click.counter.read")]
pub async fn read_counter(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CounterResponse>, ClickError> {
    let snapshot = state.coordinator.read_counter().await?;
    Ok(Json(snapshot.into()))
}

/// Handler for POST /api/v1/counter/increment
///
/// The increment runs on its own task: once committed it completes and
/// publishes even if the client disconnects.
///
/// # Response
///
/// - 200 OK with `{"count", "goal", "outcome"}`
/// - 503 Service Unavailable: not confirmed, state unchanged, safe to retry
#[instrument(skip_all, name = "click.counter.increment")]
pub async fn increment(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IncrementResponse>, ClickError> {
    let coordinator = Arc::clone(&state.coordinator);
    let goal = coordinator.goal();

    let outcome = tokio::spawn(async move { coordinator.increment().await })
        .await
        .map_err(|e| ClickError::Internal(format!("Increment task failed: {e}")))??;

    Ok(Json(IncrementResponse::new(outcome, goal)))
}

/// Handler for GET /api/v1/counter/events
///
/// Emits `counter` events, starting with the current snapshot.
#[instrument(skip_all, name = "click.counter.events")]
pub async fn counter_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = state
        .coordinator
        .subscribe_counter()
        .into_stream()
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(|snapshot| {
            Event::default()
                .event("counter")
                .json_data(CounterResponse::from(snapshot))
        });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.sse_keepalive))
}
