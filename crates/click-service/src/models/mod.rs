//! HTTP request and response bodies.

use crate::counter::IncrementOutcome;
use crate::winner::{ClaimOutcome, ClaimRejection};
use common::types::{CounterState, WinnerRecord};
use serde::{Deserialize, Serialize};

/// Counter snapshot, returned by reads and pushed on the counter stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterResponse {
    pub count: u64,
    pub goal: u64,
}

impl From<CounterState> for CounterResponse {
    fn from(state: CounterState) -> Self {
        Self {
            count: state.count,
            goal: state.goal,
        }
    }
}

/// Result of `POST /api/v1/counter/increment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementResponse {
    pub count: u64,
    pub goal: u64,
    /// `committed`, `at_goal` or `winner_declared`.
    pub outcome: String,
}

impl IncrementResponse {
    #[must_use]
    pub fn new(outcome: IncrementOutcome, goal: u64) -> Self {
        Self {
            count: outcome.count(),
            goal,
            outcome: outcome.as_str().to_string(),
        }
    }
}

/// Body of `POST /api/v1/winner`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub identity: String,
}

/// Result of `POST /api/v1/winner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ClaimRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<WinnerRecord>,
}

impl From<ClaimOutcome> for ClaimResponse {
    fn from(outcome: ClaimOutcome) -> Self {
        match outcome {
            ClaimOutcome::Accepted(record) => Self {
                accepted: true,
                reason: None,
                winner: Some(record),
            },
            ClaimOutcome::Rejected { reason, winner } => Self {
                accepted: false,
                reason: Some(reason),
                winner,
            },
        }
    }
}
