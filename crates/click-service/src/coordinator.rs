//! Click coordinator.
//!
//! Owns the backend, the notification bus, the counter store and the winner
//! registry, and is the single entry point handlers and sessions talk to.

use crate::bus::{NotificationBus, Subscription, WinnerSubscription};
use crate::config::Config;
use crate::counter::{CounterStore, IncrementOutcome};
use crate::errors::ClickError;
use crate::observability::metrics::{record_claim, record_increment, record_invariant_violation};
use crate::store::StateBackend;
use crate::winner::{ClaimOutcome, WinnerRegistry};
use common::types::{CounterState, Identity, WinnerRecord};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Rules the coordinator enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub goal: u64,
    pub claim_requires_goal: bool,
}

impl CoordinatorSettings {
    /// Settings with the given goal and default rules.
    #[must_use]
    pub fn with_goal(goal: u64) -> Self {
        Self {
            goal,
            claim_requires_goal: true,
        }
    }
}

impl From<&Config> for CoordinatorSettings {
    fn from(config: &Config) -> Self {
        Self {
            goal: config.goal,
            claim_requires_goal: config.claim_requires_goal,
        }
    }
}

/// Wires storage, notification and arbitration together.
pub struct ClickCoordinator {
    backend: Arc<dyn StateBackend>,
    bus: Arc<NotificationBus>,
    counter: Arc<CounterStore>,
    winners: WinnerRegistry,
}

impl ClickCoordinator {
    /// Build a coordinator. Call [`Self::hydrate`] before serving traffic.
    #[must_use]
    pub fn new(backend: Arc<dyn StateBackend>, settings: CoordinatorSettings) -> Self {
        let bus = Arc::new(NotificationBus::new(
            CounterState::initial(settings.goal),
            None,
        ));
        let counter = Arc::new(CounterStore::new(
            Arc::clone(&backend),
            Arc::clone(&bus),
            settings.goal,
        ));
        let winners = WinnerRegistry::new(
            Arc::clone(&backend),
            Arc::clone(&bus),
            Arc::clone(&counter),
            settings.claim_requires_goal,
        );

        Self {
            backend,
            bus,
            counter,
            winners,
        }
    }

    /// Load the authoritative state into the bus.
    ///
    /// # Errors
    ///
    /// Fails when the backend is unreachable or holds invalid state.
    pub async fn hydrate(&self) -> Result<CounterState, ClickError> {
        let (state, winner) = self.sync_from_store().await?;
        info!(
            target: "click.sync",
            backend = self.backend.kind(),
            count = state.count,
            goal = state.goal,
            winner_declared = winner.is_some(),
            "State hydrated"
        );
        Ok(state)
    }

    /// Reload both records from the backend and publish them.
    ///
    /// Picks up commits made by other instances sharing the backend.
    #[instrument(skip_all)]
    pub async fn sync_from_store(
        &self,
    ) -> Result<(CounterState, Option<WinnerRecord>), ClickError> {
        let state = self.counter.read().await?;

        let known = self.bus.counter();
        if state.count < known.count {
            record_invariant_violation("count_regressed");
            warn!(
                target: "click.sync",
                stored = state.count,
                known = known.count,
                "Stored count is behind a published count"
            );
        } else if self.bus.publish_counter(state) {
            debug!(target: "click.sync", count = state.count, "Counter advanced from store");
        }

        let winner = self.winners.read().await?;
        Ok((state, winner))
    }

    /// Add one click.
    ///
    /// A no-op once a winner is known.
    ///
    /// # Errors
    ///
    /// See [`CounterStore::increment`].
    pub async fn increment(&self) -> Result<IncrementOutcome, ClickError> {
        if self.bus.winner().is_some() {
            record_increment("winner_declared");
            return Ok(IncrementOutcome::WinnerDeclared {
                count: self.bus.counter().count,
            });
        }
        self.counter.increment().await
    }

    /// Validate `raw_identity` and submit a winner claim.
    ///
    /// # Errors
    ///
    /// `ClickError::InvalidIdentity` for unusable input, otherwise see
    /// [`WinnerRegistry::claim`].
    pub async fn claim_winner(&self, raw_identity: &str) -> Result<ClaimOutcome, ClickError> {
        let identity = Identity::parse(raw_identity).map_err(|e| {
            record_claim("invalid");
            debug!(target: "click.winner", reason = %e, "Claim identity rejected");
            ClickError::from(e)
        })?;
        self.winners.claim(identity).await
    }

    /// Authoritative counter snapshot.
    pub async fn read_counter(&self) -> Result<CounterState, ClickError> {
        self.counter.read().await
    }

    /// Authoritative winner.
    pub async fn read_winner(&self) -> Result<Option<WinnerRecord>, ClickError> {
        self.winners.read().await
    }

    /// Latest counter snapshot known to this process.
    #[must_use]
    pub fn counter_snapshot(&self) -> CounterState {
        self.counter.snapshot()
    }

    /// Latest winner known to this process.
    #[must_use]
    pub fn winner_snapshot(&self) -> Option<WinnerRecord> {
        self.winners.snapshot()
    }

    #[must_use]
    pub fn subscribe_counter(&self) -> Subscription {
        self.counter.subscribe()
    }

    #[must_use]
    pub fn subscribe_winner(&self) -> WinnerSubscription {
        self.winners.subscribe()
    }

    #[must_use]
    pub fn goal(&self) -> u64 {
        self.counter.goal()
    }

    /// Backend round trip for readiness.
    pub async fn ping_store(&self) -> Result<(), ClickError> {
        self.backend.ping().await.map_err(ClickError::from)
    }

    /// The bus, for observer gauges.
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }
}
