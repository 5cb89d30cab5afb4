//! Shared data model for the bounded counter and the winner record.
//!
//! # Persisted Layout
//!
//! Both storage backends use the same two independently addressable records:
//!
//! - `clicks` - JSON `{"count": <u64>}` ([`CounterRecord`])
//! - `winner` - JSON `{"identity": <string>, "claimedAt": <RFC 3339>}`
//!   ([`WinnerRecord`]), absent until claimed

use crate::error::{IdentityError, MAX_IDENTITY_LENGTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key of the counter record.
pub const COUNTER_KEY: &str = "clicks";

/// Storage key of the winner record.
pub const WINNER_KEY: &str = "winner";

/// Snapshot of the bounded counter.
///
/// Invariant: `count <= goal`. The goal is fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// Current number of committed clicks.
    pub count: u64,
    /// Upper bound the counter never exceeds.
    pub goal: u64,
}

impl CounterState {
    /// Create a snapshot.
    #[must_use]
    pub const fn new(count: u64, goal: u64) -> Self {
        Self { count, goal }
    }

    /// Snapshot at system initialization (`count = 0`).
    #[must_use]
    pub const fn initial(goal: u64) -> Self {
        Self { count: 0, goal }
    }

    /// Whether the counter has reached its goal.
    #[must_use]
    pub const fn is_goal_reached(&self) -> bool {
        self.count >= self.goal
    }

    /// Clicks left until the goal.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.goal.saturating_sub(self.count)
    }

    /// Target of a bounded increment, or `None` when already at the goal.
    #[must_use]
    pub const fn next_count(&self) -> Option<u64> {
        if self.count >= self.goal {
            None
        } else {
            Some(self.count + 1)
        }
    }

    /// Progress towards the goal in percent, capped at 100.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.goal == 0 {
            return 100.0;
        }
        // u64 to f64 is exact below 2^53, far above any realistic goal
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.count as f64 / self.goal as f64;
        (ratio * 100.0).min(100.0)
    }
}

/// Persisted form of the counter under [`COUNTER_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub count: u64,
}

/// Validated contact identity of a claimant.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Parse and validate a raw identity.
    ///
    /// Surrounding whitespace is trimmed. The result must be non-empty, at most
    /// [`MAX_IDENTITY_LENGTH`] characters, and contain exactly one `@` with a
    /// non-empty local part and a dotted domain.
    ///
    /// # Errors
    ///
    /// Returns the matching [`IdentityError`] when any rule fails.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }

        let length = trimmed.chars().count();
        if length > MAX_IDENTITY_LENGTH {
            return Err(IdentityError::TooLong(length));
        }

        let (local, domain) = trimmed.split_once('@').ok_or(IdentityError::Malformed)?;
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(IdentityError::Malformed);
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The validated identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Log-safe form: the local part is masked, the domain kept.
    #[must_use]
    pub fn redacted(&self) -> String {
        redact_identity(&self.0)
    }
}

/// Identities are contact details; Debug never prints them in full.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&self.redacted()).finish()
    }
}

/// The single winner of a goal period. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    /// Contact identity submitted by the winning claimant.
    pub identity: String,
    /// When the claim was accepted.
    pub claimed_at: DateTime<Utc>,
}

impl WinnerRecord {
    /// Build a record for a claim made now.
    #[must_use]
    pub fn claim_now(identity: Identity) -> Self {
        Self {
            identity: identity.into_inner(),
            claimed_at: Utc::now(),
        }
    }

    /// Log-safe form of the stored identity.
    #[must_use]
    pub fn redacted_identity(&self) -> String {
        redact_identity(&self.identity)
    }
}

fn redact_identity(identity: &str) -> String {
    match identity.split_once('@') {
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}
