//! Common types shared across Final Click components.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for the shared counter and winner data model
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
