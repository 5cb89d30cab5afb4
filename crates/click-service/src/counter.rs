//! Bounded counter store.
//!
//! Increments run an optimistic read-compute-swap loop against the backend.
//! The count is its own version: it only grows, so a successful swap proves
//! nobody else committed in between. The loop never writes past the goal.

use crate::bus::{NotificationBus, Subscription};
use crate::errors::ClickError;
use crate::observability::metrics::{
    record_goal_reached, record_increment, record_increment_attempts, record_increment_conflict,
    record_invariant_violation,
};
use crate::store::StateBackend;
use common::types::CounterState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Result of a single increment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The count advanced to `count`.
    Committed {
        count: u64,
        /// This commit landed exactly on the goal.
        goal_reached: bool,
    },
    /// The counter was already at the goal; nothing was written.
    AtGoal { count: u64 },
    /// A winner is already declared; nothing was attempted.
    WinnerDeclared { count: u64 },
}

impl IncrementOutcome {
    /// Count observed or produced by the increment.
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            IncrementOutcome::Committed { count, .. }
            | IncrementOutcome::AtGoal { count }
            | IncrementOutcome::WinnerDeclared { count } => *count,
        }
    }

    /// Stable label used in responses and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IncrementOutcome::Committed { .. } => "committed",
            IncrementOutcome::AtGoal { .. } => "at_goal",
            IncrementOutcome::WinnerDeclared { .. } => "winner_declared",
        }
    }
}

/// First pause after a lost race.
const INITIAL_BACKOFF_MICROS: u64 = 50;

/// Longest pause between attempts.
const MAX_BACKOFF_MICROS: u64 = 5_000;

/// Lost races tolerated before backing off; until then the task only yields.
const YIELD_ONLY_CONFLICTS: u32 = 4;

/// Shared bounded counter.
pub struct CounterStore {
    backend: Arc<dyn StateBackend>,
    bus: Arc<NotificationBus>,
    goal: u64,
}

impl CounterStore {
    #[must_use]
    pub fn new(backend: Arc<dyn StateBackend>, bus: Arc<NotificationBus>, goal: u64) -> Self {
        Self { backend, bus, goal }
    }

    #[must_use]
    pub fn goal(&self) -> u64 {
        self.goal
    }

    /// Add one click, clamped at the goal.
    ///
    /// Lost races are retried until the swap commits or the goal is reached;
    /// callers never see a conflict. At the goal this is a no-op and emits no
    /// notification.
    ///
    /// # Errors
    ///
    /// - `ClickError::Store` when the backend fails
    /// - `ClickError::InvariantViolation` when the stored count exceeds the goal
    #[instrument(skip_all)]
    pub async fn increment(&self) -> Result<IncrementOutcome, ClickError> {
        let result = self.run_increment().await;
        match &result {
            Ok(outcome) => record_increment(outcome.as_str()),
            Err(_) => record_increment("error"),
        }
        result
    }

    async fn run_increment(&self) -> Result<IncrementOutcome, ClickError> {
        let mut attempt: u32 = 0;
        let mut backoff_micros = INITIAL_BACKOFF_MICROS;

        loop {
            attempt = attempt.saturating_add(1);
            let current = self.read().await?;

            let Some(next) = current.next_count() else {
                record_increment_attempts(attempt);
                // Converges observers if another instance reached the goal
                self.bus.publish_counter(current);
                return Ok(IncrementOutcome::AtGoal {
                    count: current.count,
                });
            };

            if self
                .backend
                .compare_and_swap_count(current.count, next)
                .await?
            {
                record_increment_attempts(attempt);
                let state = CounterState::new(next, self.goal);
                self.bus.publish_counter(state);

                let goal_reached = state.is_goal_reached();
                if goal_reached {
                    record_goal_reached();
                    info!(
                        target: "click.counter",
                        goal = self.goal,
                        attempts = attempt,
                        "Goal reached"
                    );
                } else {
                    debug!(target: "click.counter", count = next, attempts = attempt, "Increment committed");
                }

                return Ok(IncrementOutcome::Committed {
                    count: next,
                    goal_reached,
                });
            }

            // Lost the race to another writer
            record_increment_conflict();
            if attempt <= YIELD_ONLY_CONFLICTS {
                tokio::task::yield_now().await;
            } else {
                if attempt % 64 == 0 {
                    debug!(target: "click.counter", attempts = attempt, "Increment still contended");
                }
                tokio::time::sleep(Duration::from_micros(backoff_micros)).await;
                backoff_micros = (backoff_micros * 2).min(MAX_BACKOFF_MICROS);
            }
        }
    }

    /// Authoritative snapshot from the backend.
    ///
    /// # Errors
    ///
    /// `ClickError::InvariantViolation` when the stored count exceeds the goal;
    /// the value is never clamped.
    pub async fn read(&self) -> Result<CounterState, ClickError> {
        let count = self.backend.load_count().await?;
        if count > self.goal {
            record_invariant_violation("count_exceeds_goal");
            error!(
                target: "click.counter",
                count = count,
                goal = self.goal,
                "Stored count exceeds goal"
            );
            return Err(ClickError::InvariantViolation(format!(
                "Stored count {count} exceeds goal {}",
                self.goal
            )));
        }
        Ok(CounterState::new(count, self.goal))
    }

    /// Latest snapshot known to this process, without a store round trip.
    #[must_use]
    pub fn snapshot(&self) -> CounterState {
        self.bus.counter()
    }

    /// Observe the counter: current snapshot first, then each newer one.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe_counter()
    }
}
