//! Change notification bus.
//!
//! Fans counter and winner transitions out to every subscriber. Each source
//! is a latest-value `watch` channel: subscribers see snapshots in order per
//! source, may miss intermediate values when updates outpace delivery, and
//! always converge on the latest one. Nothing is buffered per subscriber.
//!
//! Publication is monotonic. A counter snapshot is only published when its
//! count is higher than the last one, and a winner only into an empty slot,
//! so late or duplicate publishers never move observers backwards.

use crate::observability::metrics::set_observers_active;
use common::types::{CounterState, WinnerRecord};
use futures::stream::{self, Stream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Fan-out point for counter and winner transitions.
#[derive(Debug)]
pub struct NotificationBus {
    counter_tx: watch::Sender<CounterState>,
    winner_tx: watch::Sender<Option<WinnerRecord>>,
    counter_active: Arc<AtomicUsize>,
    winner_active: Arc<AtomicUsize>,
}

impl NotificationBus {
    /// Create a bus seeded with the given snapshots.
    #[must_use]
    pub fn new(counter: CounterState, winner: Option<WinnerRecord>) -> Self {
        let (counter_tx, _) = watch::channel(counter);
        let (winner_tx, _) = watch::channel(winner);
        Self {
            counter_tx,
            winner_tx,
            counter_active: Arc::new(AtomicUsize::new(0)),
            winner_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish a counter snapshot if it advances the count.
    ///
    /// Returns `true` when the snapshot replaced the previous one and
    /// subscribers were notified.
    pub fn publish_counter(&self, state: CounterState) -> bool {
        let advanced = self.counter_tx.send_if_modified(|current| {
            if state.count > current.count {
                *current = state;
                true
            } else {
                false
            }
        });

        if advanced {
            debug!(
                target: "click.bus",
                count = state.count,
                observers = self.counter_tx.receiver_count(),
                "Published counter"
            );
        }
        advanced
    }

    /// Publish the winner if none has been published yet.
    pub fn publish_winner(&self, record: WinnerRecord) -> bool {
        let published = self.winner_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(record);
                true
            } else {
                false
            }
        });

        if published {
            debug!(
                target: "click.bus",
                observers = self.winner_tx.receiver_count(),
                "Published winner"
            );
        }
        published
    }

    /// Latest published counter snapshot.
    #[must_use]
    pub fn counter(&self) -> CounterState {
        *self.counter_tx.borrow()
    }

    /// Latest published winner.
    #[must_use]
    pub fn winner(&self) -> Option<WinnerRecord> {
        self.winner_tx.borrow().clone()
    }

    /// Register a counter observer.
    #[must_use]
    pub fn subscribe_counter(&self) -> Subscription {
        Subscription {
            rx: self.counter_tx.subscribe(),
            primed: false,
            _observer: ObserverGuard::register("counter", &self.counter_active),
        }
    }

    /// Register a winner observer.
    #[must_use]
    pub fn subscribe_winner(&self) -> WinnerSubscription {
        WinnerSubscription {
            rx: self.winner_tx.subscribe(),
            delivered: false,
            _observer: ObserverGuard::register("winner", &self.winner_active),
        }
    }

    /// Live counter subscriptions.
    #[must_use]
    pub fn counter_observers(&self) -> usize {
        self.counter_tx.receiver_count()
    }

    /// Live winner subscriptions.
    #[must_use]
    pub fn winner_observers(&self) -> usize {
        self.winner_tx.receiver_count()
    }
}

/// Keeps `click_observers_active` current as subscriptions come and go.
#[derive(Debug)]
struct ObserverGuard {
    stream: &'static str,
    active: Arc<AtomicUsize>,
}

impl ObserverGuard {
    fn register(stream: &'static str, active: &Arc<AtomicUsize>) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        set_observers_active(stream, now);
        Self {
            stream,
            active: Arc::clone(active),
        }
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let now = self.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        set_observers_active(self.stream, now);
    }
}

/// Counter observer handle.
///
/// Yields the snapshot current at subscription time first, then each newer
/// one. Dropping the handle (or calling [`Subscription::unsubscribe`]) stops
/// delivery.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<CounterState>,
    primed: bool,
    _observer: ObserverGuard,
}

impl Subscription {
    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<CounterState> {
        if !self.primed {
            self.primed = true;
            return Some(*self.rx.borrow_and_update());
        }

        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Peek at the latest snapshot without consuming it.
    #[must_use]
    pub fn latest(&self) -> CounterState {
        *self.rx.borrow()
    }

    /// Stop receiving snapshots.
    pub fn unsubscribe(self) {}

    /// Convert into a stream of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = CounterState> + Send + 'static {
        stream::unfold(self, |mut subscription| async move {
            let state = subscription.next().await?;
            Some((state, subscription))
        })
    }
}

/// Winner observer handle.
///
/// Yields the winner exactly once, immediately if it already exists, then
/// terminates.
#[derive(Debug)]
pub struct WinnerSubscription {
    rx: watch::Receiver<Option<WinnerRecord>>,
    delivered: bool,
    _observer: ObserverGuard,
}

impl WinnerSubscription {
    /// Wait for the winner.
    ///
    /// Returns `None` after the winner was delivered, or once the bus is gone.
    pub async fn next(&mut self) -> Option<WinnerRecord> {
        if self.delivered {
            return None;
        }

        let record = self.rx.wait_for(Option::is_some).await.ok()?.clone();
        self.delivered = true;
        record
    }

    /// Peek at the current winner.
    #[must_use]
    pub fn latest(&self) -> Option<WinnerRecord> {
        self.rx.borrow().clone()
    }

    /// Whether the winner has already been yielded by [`Self::next`].
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.delivered
    }

    /// Stop waiting for the winner.
    pub fn unsubscribe(self) {}

    /// Convert into a stream of at most one record.
    pub fn into_stream(self) -> impl Stream<Item = WinnerRecord> + Send + 'static {
        stream::unfold(self, |mut subscription| async move {
            let record = subscription.next().await?;
            Some((record, subscription))
        })
    }
}
