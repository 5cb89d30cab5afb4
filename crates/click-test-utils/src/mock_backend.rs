//! Fault-injecting storage backends.
//!
//! Each wraps a [`MemoryBackend`] and delegates to it unless told otherwise.

use async_trait::async_trait;
use click_service::store::{MemoryBackend, StateBackend, StoreError};
use common::types::WinnerRecord;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Backend where a rival writer beats the caller to the next N swaps.
///
/// Before each of the first `rival_commits` compare-and-swap calls, the rival
/// commits `expected + 1` itself, so the caller's swap loses and must re-read.
/// Rival commits count towards the total; the rival ignores the goal, so keep
/// `rival_commits` below the remaining headroom.
pub struct RivalWriterBackend {
    inner: MemoryBackend,
    remaining: AtomicU32,
    rival_wins: AtomicU32,
}

impl RivalWriterBackend {
    pub fn new(inner: MemoryBackend, rival_commits: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(rival_commits),
            rival_wins: AtomicU32::new(0),
        }
    }

    /// Swaps the rival has won so far.
    pub fn rival_wins(&self) -> u32 {
        self.rival_wins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateBackend for RivalWriterBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load_count(&self) -> Result<u64, StoreError> {
        self.inner.load_count().await
    }

    async fn compare_and_swap_count(&self, expected: u64, new: u64) -> Result<bool, StoreError> {
        let rival_turn = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if rival_turn
            && self
                .inner
                .compare_and_swap_count(expected, expected + 1)
                .await?
        {
            self.rival_wins.fetch_add(1, Ordering::SeqCst);
        }

        self.inner.compare_and_swap_count(expected, new).await
    }

    async fn load_winner(&self) -> Result<Option<WinnerRecord>, StoreError> {
        self.inner.load_winner().await
    }

    async fn insert_winner_if_absent(&self, record: &WinnerRecord) -> Result<bool, StoreError> {
        self.inner.insert_winner_if_absent(record).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

/// Backend that can be taken down and brought back.
///
/// While down, every operation fails with `StoreError::Unavailable` and
/// nothing reaches the inner store.
pub struct UnavailableBackend {
    inner: MemoryBackend,
    down: AtomicBool,
}

impl UnavailableBackend {
    /// Backend that starts down.
    pub fn down(inner: MemoryBackend) -> Self {
        Self {
            inner,
            down: AtomicBool::new(true),
        }
    }

    /// Backend that starts up.
    pub fn up(inner: MemoryBackend) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StateBackend for UnavailableBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load_count(&self) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.load_count().await
    }

    async fn compare_and_swap_count(&self, expected: u64, new: u64) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.compare_and_swap_count(expected, new).await
    }

    async fn load_winner(&self) -> Result<Option<WinnerRecord>, StoreError> {
        self.check()?;
        self.inner.load_winner().await
    }

    async fn insert_winner_if_absent(&self, record: &WinnerRecord) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.insert_winner_if_absent(record).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()?;
        self.inner.ping().await
    }
}

/// Backend where every operation pays a fixed round trip.
///
/// Widens the window between a read and its swap the way a network store
/// does, so concurrent writers actually collide.
pub struct LatencyBackend {
    inner: MemoryBackend,
    latency: Duration,
}

impl LatencyBackend {
    pub fn new(inner: MemoryBackend, latency: Duration) -> Self {
        Self { inner, latency }
    }

    async fn round_trip(&self) {
        tokio::time::sleep(self.latency).await;
    }
}

#[async_trait]
impl StateBackend for LatencyBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load_count(&self) -> Result<u64, StoreError> {
        self.round_trip().await;
        self.inner.load_count().await
    }

    async fn compare_and_swap_count(&self, expected: u64, new: u64) -> Result<bool, StoreError> {
        self.round_trip().await;
        self.inner.compare_and_swap_count(expected, new).await
    }

    async fn load_winner(&self) -> Result<Option<WinnerRecord>, StoreError> {
        self.round_trip().await;
        self.inner.load_winner().await
    }

    async fn insert_winner_if_absent(&self, record: &WinnerRecord) -> Result<bool, StoreError> {
        self.round_trip().await;
        self.inner.insert_winner_if_absent(record).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.round_trip().await;
        self.inner.ping().await
    }
}
