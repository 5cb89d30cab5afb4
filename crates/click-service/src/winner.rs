//! Winner registry.
//!
//! Arbitrates winner claims so exactly one ever succeeds. The decision is a
//! single create-if-absent on the backend; everything before it is a cheap
//! pre-check and everything after it is convergence.

use crate::bus::{NotificationBus, WinnerSubscription};
use crate::counter::CounterStore;
use crate::errors::ClickError;
use crate::observability::metrics::{record_claim, record_invariant_violation};
use crate::store::StateBackend;
use common::types::{Identity, WinnerRecord};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Why a claim was turned down. Rejections are outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRejection {
    /// A winner already exists.
    AlreadyClaimed,
    /// The counter has not reached its goal yet.
    GoalNotReached,
}

impl ClaimRejection {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimRejection::AlreadyClaimed => "already_claimed",
            ClaimRejection::GoalNotReached => "goal_not_reached",
        }
    }
}

/// Definitive result of a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This claim created the winner record.
    Accepted(WinnerRecord),
    /// Another claim won, or the claim came too early.
    Rejected {
        reason: ClaimRejection,
        /// The existing winner, when known.
        winner: Option<WinnerRecord>,
    },
}

impl ClaimOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, ClaimOutcome::Accepted(_))
    }

    /// The winner this outcome knows about, accepted or not.
    #[must_use]
    pub fn winner(&self) -> Option<&WinnerRecord> {
        match self {
            ClaimOutcome::Accepted(record) => Some(record),
            ClaimOutcome::Rejected { winner, .. } => winner.as_ref(),
        }
    }
}

/// Exactly-once winner arbitration.
pub struct WinnerRegistry {
    backend: Arc<dyn StateBackend>,
    bus: Arc<NotificationBus>,
    counter: Arc<CounterStore>,
    claim_requires_goal: bool,
}

impl WinnerRegistry {
    #[must_use]
    pub fn new(
        backend: Arc<dyn StateBackend>,
        bus: Arc<NotificationBus>,
        counter: Arc<CounterStore>,
        claim_requires_goal: bool,
    ) -> Self {
        Self {
            backend,
            bus,
            counter,
            claim_requires_goal,
        }
    }

    /// Try to become the winner.
    ///
    /// Any number of concurrent callers get exactly one `Accepted`. A retry
    /// after a winner exists is rejected, even for the same identity.
    ///
    /// # Errors
    ///
    /// `ClickError::Store` when the backend fails; the claim is then
    /// unconfirmed and may be retried.
    #[instrument(skip_all, fields(identity = %identity.redacted()))]
    pub async fn claim(&self, identity: Identity) -> Result<ClaimOutcome, ClickError> {
        let result = self.run_claim(identity).await;
        match &result {
            Ok(ClaimOutcome::Accepted(_)) => record_claim("accepted"),
            Ok(ClaimOutcome::Rejected { reason, .. }) => record_claim(reason.as_str()),
            Err(_) => record_claim("error"),
        }
        result
    }

    async fn run_claim(&self, identity: Identity) -> Result<ClaimOutcome, ClickError> {
        // The record is immutable once set, so a known winner settles it
        if let Some(existing) = self.bus.winner() {
            debug!(target: "click.winner", "Claim rejected, winner already known");
            return Ok(ClaimOutcome::Rejected {
                reason: ClaimRejection::AlreadyClaimed,
                winner: Some(existing),
            });
        }

        if self.claim_requires_goal {
            let state = self.counter.read().await?;
            if !state.is_goal_reached() {
                debug!(
                    target: "click.winner",
                    remaining = state.remaining(),
                    "Claim rejected, goal not reached"
                );
                return Ok(ClaimOutcome::Rejected {
                    reason: ClaimRejection::GoalNotReached,
                    winner: None,
                });
            }
        }

        let record = WinnerRecord::claim_now(identity);
        if self.backend.insert_winner_if_absent(&record).await? {
            self.bus.publish_winner(record.clone());
            info!(
                target: "click.winner",
                winner = %record.redacted_identity(),
                claimed_at = %record.claimed_at,
                "Winner declared"
            );
            return Ok(ClaimOutcome::Accepted(record));
        }

        // Lost the race, possibly to another instance
        let Some(existing) = self.backend.load_winner().await? else {
            record_invariant_violation("winner_vanished");
            error!(target: "click.winner", "Create-if-absent refused but no winner is stored");
            return Err(ClickError::InvariantViolation(
                "Winner slot occupied but empty".to_string(),
            ));
        };
        self.bus.publish_winner(existing.clone());
        debug!(target: "click.winner", "Claim lost the race");

        Ok(ClaimOutcome::Rejected {
            reason: ClaimRejection::AlreadyClaimed,
            winner: Some(existing),
        })
    }

    /// Authoritative winner from the backend, published on the way through.
    pub async fn read(&self) -> Result<Option<WinnerRecord>, ClickError> {
        let winner = self.backend.load_winner().await?;
        if let Some(record) = &winner {
            self.bus.publish_winner(record.clone());
        }
        Ok(winner)
    }

    /// Winner known to this process, without a store round trip.
    #[must_use]
    pub fn snapshot(&self) -> Option<WinnerRecord> {
        self.bus.winner()
    }

    /// Observe the winner: yields at most once, immediately if already set.
    #[must_use]
    pub fn subscribe(&self) -> WinnerSubscription {
        self.bus.subscribe_winner()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use common::types::CounterState;

    fn registry(count: u64, goal: u64, requires_goal: bool) -> WinnerRegistry {
        let backend: Arc<dyn StateBackend> = Arc::new(MemoryBackend::with_count(count));
        let bus = Arc::new(NotificationBus::new(CounterState::new(count, goal), None));
        let counter = Arc::new(CounterStore::new(
            Arc::clone(&backend),
            Arc::clone(&bus),
            goal,
        ));
        WinnerRegistry::new(backend, bus, counter, requires_goal)
    }

    fn identity(raw: &str) -> Identity {
        Identity::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_first_claim_at_goal_is_accepted() {
        let registry = registry(10, 10, true);
        let mut sub = registry.subscribe();

        let outcome = registry.claim(identity("a@x.com")).await.unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(outcome.winner().unwrap().identity, "a@x.com");

        assert_eq!(sub.next().await.unwrap().identity, "a@x.com");
        assert_eq!(registry.read().await.unwrap().unwrap().identity, "a@x.com");
    }

    #[tokio::test]
    async fn test_claim_before_goal_rejected_when_enforced() {
        let registry = registry(3, 10, true);
        let outcome = registry.claim(identity("a@x.com")).await.unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::Rejected {
                reason: ClaimRejection::GoalNotReached,
                winner: None
            }
        );
        assert!(registry.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_before_goal_allowed_when_relaxed() {
        let registry = registry(3, 10, false);
        let outcome = registry.claim(identity("early@x.com")).await.unwrap();
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_retry_with_same_identity_is_rejected() {
        let registry = registry(10, 10, true);
        assert!(registry.claim(identity("a@x.com")).await.unwrap().is_accepted());

        let retry = registry.claim(identity("a@x.com")).await.unwrap();
        match retry {
            ClaimOutcome::Rejected { reason, winner } => {
                assert_eq!(reason, ClaimRejection::AlreadyClaimed);
                assert_eq!(winner.unwrap().identity, "a@x.com");
            }
            ClaimOutcome::Accepted(_) => unreachable!("second accept"),
        }
    }

    #[tokio::test]
    async fn test_lost_race_converges_bus_to_stored_winner() {
        // Another instance wrote the winner directly to the shared store
        let backend: Arc<dyn StateBackend> = Arc::new(MemoryBackend::with_count(10));
        let other = WinnerRecord::claim_now(identity("other@x.com"));
        assert!(backend.insert_winner_if_absent(&other).await.unwrap());

        let bus = Arc::new(NotificationBus::new(CounterState::new(10, 10), None));
        let counter = Arc::new(CounterStore::new(
            Arc::clone(&backend),
            Arc::clone(&bus),
            10,
        ));
        let registry = WinnerRegistry::new(backend, Arc::clone(&bus), counter, true);

        let outcome = registry.claim(identity("me@x.com")).await.unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(bus.winner(), Some(other));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_have_one_winner() {
        let registry = Arc::new(registry(10, 10, true));

        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .claim(identity(&format!("user{i}@example.com")))
                    .await
                    .unwrap()
            }));
        }

        let mut accepted = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            if let ClaimOutcome::Accepted(record) = outcome {
                accepted.push(record);
            }
        }

        assert_eq!(accepted.len(), 1);
        assert_eq!(registry.read().await.unwrap().as_ref(), accepted.first());
    }

    #[test]
    fn test_rejection_labels() {
        assert_eq!(ClaimRejection::AlreadyClaimed.as_str(), "already_claimed");
        assert_eq!(ClaimRejection::GoalNotReached.as_str(), "goal_not_reached");
        assert_eq!(
            serde_json::to_value(ClaimRejection::GoalNotReached).unwrap(),
            "goal_not_reached"
        );
    }
}
