//! Redis state backend.
//!
//! # Key Patterns
//!
//! - `clicks` - counter record, JSON `{"count": <n>}`
//! - `winner` - winner record, JSON `{"identity": ..., "claimedAt": ...}`
//!
//! The counter is swapped by a Lua script ([`lua_scripts::COMPARE_AND_SWAP_COUNT`]);
//! the winner is written with `SET NX`.
//!
//! # Connection Pattern
//!
//! `MultiplexedConnection` is cheap to clone and safe for concurrent use, so
//! every operation clones it instead of locking.

use super::{lua_scripts, StateBackend, StoreError};
use crate::observability::metrics::{record_invariant_violation, record_store_latency};
use async_trait::async_trait;
use common::types::{CounterRecord, WinnerRecord, COUNTER_KEY, WINNER_KEY};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

/// Redis-backed shared state for multi-instance deployments.
#[derive(Clone)]
pub struct RedisBackend {
    connection: MultiplexedConnection,
    cas_script: Script,
}

impl RedisBackend {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the client cannot be opened or the
    /// connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Never log redis_url: it may carry credentials
            error!(target: "click.store.redis", error = %e, "Failed to open Redis client");
            StoreError::Unavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "click.store.redis", error = %e, "Failed to connect to Redis");
                StoreError::Unavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            cas_script: Script::new(lua_scripts::COMPARE_AND_SWAP_COUNT),
        })
    }
}

#[async_trait]
impl StateBackend for RedisBackend {
    fn kind(&self) -> &'static str {
        "redis"
    }

    #[instrument(skip_all)]
    async fn load_count(&self) -> Result<u64, StoreError> {
        let mut conn = self.connection.clone();
        let start = Instant::now();

        let raw: Option<String> = conn.get(COUNTER_KEY).await.map_err(|e| {
            warn!(target: "click.store.redis", error = %e, "Failed to read counter");
            StoreError::Unavailable(format!("Failed to read counter: {e}"))
        })?;
        record_store_latency("redis", "load_count", start.elapsed());

        match raw {
            None => Ok(0),
            Some(raw) => decode_counter(&raw),
        }
    }

    #[instrument(skip_all, fields(expected = expected, new = new))]
    async fn compare_and_swap_count(&self, expected: u64, new: u64) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let start = Instant::now();

        let result: i64 = self
            .cas_script
            .key(COUNTER_KEY)
            .arg(expected)
            .arg(new)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "click.store.redis", error = %e, "Counter compare-and-swap failed");
                StoreError::Unavailable(format!("Counter compare-and-swap failed: {e}"))
            })?;
        record_store_latency("redis", "cas_count", start.elapsed());

        match result {
            1 => Ok(true),
            0 => {
                debug!(target: "click.store.redis", "Count changed underneath compare-and-swap");
                Ok(false)
            }
            _ => {
                record_invariant_violation("corrupt_record");
                error!(target: "click.store.redis", result = result, "Counter record rejected by script");
                Err(StoreError::Corrupt(
                    "Counter record is not a valid count".to_string(),
                ))
            }
        }
    }

    #[instrument(skip_all)]
    async fn load_winner(&self) -> Result<Option<WinnerRecord>, StoreError> {
        let mut conn = self.connection.clone();
        let start = Instant::now();

        let raw: Option<String> = conn.get(WINNER_KEY).await.map_err(|e| {
            warn!(target: "click.store.redis", error = %e, "Failed to read winner");
            StoreError::Unavailable(format!("Failed to read winner: {e}"))
        })?;
        record_store_latency("redis", "load_winner", start.elapsed());

        raw.map(|raw| {
            serde_json::from_str::<WinnerRecord>(&raw).map_err(|e| {
                record_invariant_violation("corrupt_record");
                error!(target: "click.store.redis", error = %e, "Winner record is corrupt");
                StoreError::Corrupt(format!("Winner record is corrupt: {e}"))
            })
        })
        .transpose()
    }

    #[instrument(skip_all)]
    async fn insert_winner_if_absent(&self, record: &WinnerRecord) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(record)
            .map_err(|e| StoreError::Corrupt(format!("Failed to encode winner: {e}")))?;
        let start = Instant::now();

        // SET NX replies OK when written and nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(WINNER_KEY)
            .arg(payload)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "click.store.redis", error = %e, "Failed to write winner");
                StoreError::Unavailable(format!("Failed to write winner: {e}"))
            })?;
        record_store_latency("redis", "insert_winner", start.elapsed());

        Ok(reply.is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let start = Instant::now();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Redis ping failed: {e}")))?;
        record_store_latency("redis", "ping", start.elapsed());
        Ok(())
    }
}

/// Decode the persisted counter record.
fn decode_counter(raw: &str) -> Result<u64, StoreError> {
    serde_json::from_str::<CounterRecord>(raw)
        .map(|record| record.count)
        .map_err(|e| {
            record_invariant_violation("corrupt_record");
            error!(target: "click.store.redis", error = %e, "Counter record is corrupt");
            StoreError::Corrupt(format!("Counter record is corrupt: {e}"))
        })
}
