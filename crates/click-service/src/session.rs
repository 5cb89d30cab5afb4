//! Per-actor session.
//!
//! Mirrors what a front end keeps for one participant: the latest counter and
//! winner it has seen, and whether it already submitted a claim. These flags
//! only shape the [`SessionView`]; the coordinator makes every real decision.

use crate::bus::{Subscription, WinnerSubscription};
use crate::coordinator::ClickCoordinator;
use crate::counter::IncrementOutcome;
use crate::errors::ClickError;
use crate::winner::ClaimOutcome;
use common::types::{CounterState, WinnerRecord};
use serde::Serialize;
use std::sync::Arc;

/// What one participant should be shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub count: u64,
    pub goal: u64,
    pub remaining: u64,
    pub progress_percent: f64,
    pub goal_reached: bool,
    pub winner_declared: bool,
    pub can_click: bool,
    pub show_claim_prompt: bool,
    pub claim_submitted: bool,
}

/// One participant's live connection to the game.
pub struct ActorSession {
    coordinator: Arc<ClickCoordinator>,
    counter_sub: Subscription,
    winner_sub: WinnerSubscription,
    counter: CounterState,
    winner: Option<WinnerRecord>,
    claim_submitted: bool,
}

impl ActorSession {
    /// Open a session with fresh subscriptions.
    #[must_use]
    pub fn new(coordinator: Arc<ClickCoordinator>) -> Self {
        let counter_sub = coordinator.subscribe_counter();
        let winner_sub = coordinator.subscribe_winner();
        let counter = counter_sub.latest();
        let winner = winner_sub.latest();

        Self {
            coordinator,
            counter_sub,
            winner_sub,
            counter,
            winner,
            claim_submitted: false,
        }
    }

    /// Click, unless the local view says there is nothing left to click for.
    ///
    /// Returns `None` when the click was skipped locally.
    ///
    /// # Errors
    ///
    /// See [`ClickCoordinator::increment`].
    pub async fn click(&mut self) -> Result<Option<IncrementOutcome>, ClickError> {
        if !self.view().can_click {
            return Ok(None);
        }

        let outcome = self.coordinator.increment().await?;
        if outcome.count() > self.counter.count {
            self.counter = CounterState::new(outcome.count(), self.counter.goal);
        }
        Ok(Some(outcome))
    }

    /// Submit a winner claim for this participant.
    ///
    /// # Errors
    ///
    /// See [`ClickCoordinator::claim_winner`].
    pub async fn submit_claim(&mut self, identity: &str) -> Result<ClaimOutcome, ClickError> {
        let outcome = self.coordinator.claim_winner(identity).await?;
        self.claim_submitted = true;
        if let Some(winner) = outcome.winner() {
            self.winner.get_or_insert_with(|| winner.clone());
        }
        Ok(outcome)
    }

    /// Wait for the next change on either stream.
    ///
    /// The first call returns immediately with the state current at
    /// subscription. Returns `None` once the coordinator is gone.
    pub async fn next_view(&mut self) -> Option<SessionView> {
        let winner_pending = !self.winner_sub.is_terminated();

        tokio::select! {
            state = self.counter_sub.next() => {
                self.counter = state?;
            }
            Some(winner) = self.winner_sub.next(), if winner_pending => {
                self.winner = Some(winner);
            }
        }

        Some(self.view())
    }

    /// Current view from local state.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let goal_reached = self.counter.is_goal_reached();
        let winner_declared = self.winner.is_some();

        SessionView {
            count: self.counter.count,
            goal: self.counter.goal,
            remaining: self.counter.remaining(),
            progress_percent: self.counter.progress_percent(),
            goal_reached,
            winner_declared,
            can_click: !goal_reached && !winner_declared,
            show_claim_prompt: goal_reached && !winner_declared && !self.claim_submitted,
            claim_submitted: self.claim_submitted,
        }
    }

    /// The winner this session has seen.
    #[must_use]
    pub fn winner(&self) -> Option<&WinnerRecord> {
        self.winner.as_ref()
    }

    /// Close the session, releasing both subscriptions.
    pub fn close(self) {
        self.counter_sub.unsubscribe();
        self.winner_sub.unsubscribe();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorSettings;
    use crate::store::MemoryBackend;

    async fn coordinator(count: u64, goal: u64) -> Arc<ClickCoordinator> {
        let coordinator = Arc::new(ClickCoordinator::new(
            Arc::new(MemoryBackend::with_count(count)),
            CoordinatorSettings::with_goal(goal),
        ));
        coordinator.hydrate().await.unwrap();
        coordinator
    }

    #[tokio::test]
    async fn test_initial_view() {
        let session = ActorSession::new(coordinator(5, 10).await);
        let view = session.view();

        assert_eq!(view.count, 5);
        assert_eq!(view.remaining, 5);
        assert!(view.can_click);
        assert!(!view.show_claim_prompt);
        assert!((view.progress_percent - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_reaching_goal_prompts_for_claim() {
        let mut session = ActorSession::new(coordinator(9, 10).await);

        let outcome = session.click().await.unwrap().unwrap();
        assert!(matches!(
            outcome,
            IncrementOutcome::Committed {
                goal_reached: true,
                ..
            }
        ));

        let view = session.view();
        assert!(view.goal_reached);
        assert!(!view.can_click);
        assert!(view.show_claim_prompt);

        // Local hint skips further clicks
        assert!(session.click().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_hides_prompt() {
        let mut session = ActorSession::new(coordinator(10, 10).await);
        assert!(session.view().show_claim_prompt);

        let outcome = session.submit_claim("me@example.com").await.unwrap();
        assert!(outcome.is_accepted());

        let view = session.view();
        assert!(view.claim_submitted);
        assert!(view.winner_declared);
        assert!(!view.show_claim_prompt);
    }

    #[tokio::test]
    async fn test_next_view_follows_other_sessions() {
        let coordinator = coordinator(8, 10).await;
        let mut watcher = ActorSession::new(Arc::clone(&coordinator));
        let mut clicker = ActorSession::new(Arc::clone(&coordinator));

        // First view is the state at subscription time
        assert_eq!(watcher.next_view().await.unwrap().count, 8);

        clicker.click().await.unwrap();
        clicker.click().await.unwrap();

        let mut view = watcher.next_view().await.unwrap();
        while view.count < 10 {
            view = watcher.next_view().await.unwrap();
        }
        assert!(view.show_claim_prompt);

        clicker.submit_claim("fast@example.com").await.unwrap();
        let mut view = watcher.next_view().await.unwrap();
        while !view.winner_declared {
            view = watcher.next_view().await.unwrap();
        }
        assert!(!view.show_claim_prompt);
        assert_eq!(watcher.winner().unwrap().identity, "fast@example.com");

        watcher.close();
    }
}
