//! Authoritative state storage.
//!
//! The counter and the winner live behind [`StateBackend`]. Every mutation is
//! conditional on the state the caller last observed:
//!
//! - the counter is written with compare-and-swap, using the count itself as
//!   the version (it only ever grows, so there is no ABA)
//! - the winner is written with a set-if-absent
//!
//! Backends never decide *whether* to write; that is the job of
//! [`crate::counter::CounterStore`] and [`crate::winner::WinnerRegistry`].

pub mod lua_scripts;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use common::types::WinnerRecord;
use thiserror::Error;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

/// Storage failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable, timed out, or refused the command.
    /// The write may be retried; nothing was confirmed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Storage backend for the counter and the winner record.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Backend label for logs and metrics ("memory", "redis").
    fn kind(&self) -> &'static str;

    /// Read the committed count. An absent record reads as 0.
    async fn load_count(&self) -> Result<u64, StoreError>;

    /// Replace the count with `new` only if it currently equals `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn compare_and_swap_count(&self, expected: u64, new: u64) -> Result<bool, StoreError>;

    /// Read the winner record, if one was ever claimed.
    async fn load_winner(&self) -> Result<Option<WinnerRecord>, StoreError>;

    /// Store `record` only if no winner exists yet.
    ///
    /// Returns `false` when a winner was already present.
    async fn insert_winner_if_absent(&self, record: &WinnerRecord) -> Result<bool, StoreError>;

    /// Round-trip check used by readiness.
    async fn ping(&self) -> Result<(), StoreError>;
}
