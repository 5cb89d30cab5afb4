//! Common error types for Final Click components.

use thiserror::Error;

/// Maximum accepted identity length (RFC 5321 path limit).
pub const MAX_IDENTITY_LENGTH: usize = 254;

/// Reasons an identity submitted with a winner claim is rejected.
///
/// Validation happens before the claim reaches the registry, so these are
/// client errors, never claim outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Identity was empty after trimming whitespace
    #[error("Identity must not be empty")]
    Empty,

    /// Identity exceeds the maximum length
    #[error("Identity must be at most {MAX_IDENTITY_LENGTH} characters, got {0}")]
    TooLong(usize),

    /// Identity is not shaped like a contact address
    #[error("Identity must be a contact address like name@example.com")]
    Malformed,
}

/// Result type alias using `IdentityError`
pub type Result<T> = std::result::Result<T, IdentityError>;
