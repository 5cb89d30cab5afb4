//! In-process state backend.
//!
//! Used for single-instance deployments and tests. State is lost on restart.

use super::{StateBackend, StoreError};
use crate::observability::metrics::record_store_latency;
use async_trait::async_trait;
use common::types::WinnerRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::debug;

/// Atomic in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    count: AtomicU64,
    winner: OnceLock<WinnerRecord>,
}

impl MemoryBackend {
    /// Empty backend (count 0, no winner).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend seeded with an existing count.
    #[must_use]
    pub fn with_count(count: u64) -> Self {
        Self {
            count: AtomicU64::new(count),
            winner: OnceLock::new(),
        }
    }

    /// Backend seeded with a count and a winner.
    #[must_use]
    pub fn with_winner(count: u64, winner: WinnerRecord) -> Self {
        let backend = Self::with_count(count);
        // Freshly created cell, the set cannot fail
        let _ = backend.winner.set(winner);
        backend
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load_count(&self) -> Result<u64, StoreError> {
        Ok(self.count.load(Ordering::Acquire))
    }

    async fn compare_and_swap_count(&self, expected: u64, new: u64) -> Result<bool, StoreError> {
        let start = Instant::now();
        let swapped = self
            .count
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        record_store_latency("memory", "cas_count", start.elapsed());

        if !swapped {
            debug!(
                target: "click.store.memory",
                expected = expected,
                "Count changed underneath compare-and-swap"
            );
        }
        Ok(swapped)
    }

    async fn load_winner(&self) -> Result<Option<WinnerRecord>, StoreError> {
        Ok(self.winner.get().cloned())
    }

    async fn insert_winner_if_absent(&self, record: &WinnerRecord) -> Result<bool, StoreError> {
        let start = Instant::now();
        let stored = self.winner.set(record.clone()).is_ok();
        record_store_latency("memory", "insert_winner", start.elapsed());
        Ok(stored)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::Identity;
    use std::sync::Arc;

    fn winner(identity: &str) -> WinnerRecord {
        WinnerRecord::claim_now(Identity::parse(identity).unwrap())
    }

    #[tokio::test]
    async fn test_new_backend_is_empty() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load_count().await.unwrap(), 0);
        assert!(backend.load_winner().await.unwrap().is_none());
        assert_eq!(backend.kind(), "memory");
    }

    #[tokio::test]
    async fn test_cas_succeeds_only_on_expected_value() {
        let backend = MemoryBackend::with_count(5);

        assert!(!backend.compare_and_swap_count(4, 5).await.unwrap());
        assert_eq!(backend.load_count().await.unwrap(), 5);

        assert!(backend.compare_and_swap_count(5, 6).await.unwrap());
        assert_eq!(backend.load_count().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_concurrent_cas_has_single_winner_per_value() {
        let backend = Arc::new(MemoryBackend::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                backend.compare_and_swap_count(0, 1).await.unwrap()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(backend.load_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_winner_is_set_once() {
        let backend = MemoryBackend::new();
        let first = winner("first@example.com");
        let second = winner("second@example.com");

        assert!(backend.insert_winner_if_absent(&first).await.unwrap());
        assert!(!backend.insert_winner_if_absent(&second).await.unwrap());
        assert_eq!(backend.load_winner().await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_seeded_winner_blocks_claims() {
        let existing = winner("early@example.com");
        let backend = MemoryBackend::with_winner(10, existing.clone());

        assert_eq!(backend.load_count().await.unwrap(), 10);
        assert!(!backend
            .insert_winner_if_absent(&winner("late@example.com"))
            .await
            .unwrap());
        assert_eq!(backend.load_winner().await.unwrap(), Some(existing));
    }
}
