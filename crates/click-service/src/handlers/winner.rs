//! Winner handlers.
//!
//! - `GET /api/v1/winner` - current winner or `null`
//! - `POST /api/v1/winner` - claim
//! - `GET /api/v1/winner/events` - SSE, one `winner` event then end of stream

use crate::errors::ClickError;
use crate::models::{ClaimRequest, ClaimResponse};
use crate::routes::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use common::types::WinnerRecord;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/winner
#[instrument(skip_all, name = "click.winner.read")]
pub async fn read_winner(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<WinnerRecord>>, ClickError> {
    Ok(Json(state.coordinator.read_winner().await?))
}

/// Handler for POST /api/v1/winner
///
/// Losing a claim is a 200 with `accepted: false`, not an error.
///
/// # Response
///
/// - 200 OK with `{"accepted", "reason"?, "winner"?}`
/// - 400 Bad Request: missing or invalid identity
/// - 503 Service Unavailable: not confirmed, safe to retry
#[instrument(skip_all, name = "click.winner.claim")]
pub async fn claim_winner(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<ClaimResponse>, ClickError> {
    // Parsed by hand so malformed bodies are 400, not axum's 422
    let request: ClaimRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "click.http", error = %e, "Invalid claim body");
        ClickError::InvalidIdentity("Request body must be {\"identity\": \"...\"}".to_string())
    })?;

    let coordinator = Arc::clone(&state.coordinator);
    let outcome = tokio::spawn(async move { coordinator.claim_winner(&request.identity).await })
        .await
        .map_err(|e| ClickError::Internal(format!("Claim task failed: {e}")))??;

    Ok(Json(outcome.into()))
}

/// Handler for GET /api/v1/winner/events
///
/// Sends the winner as soon as it exists (immediately for late subscribers),
/// then ends the stream.
#[instrument(skip_all, name = "click.winner.events")]
pub async fn winner_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = state
        .coordinator
        .subscribe_winner()
        .into_stream()
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(|record| Event::default().event("winner").json_data(record));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.sse_keepalive))
}
