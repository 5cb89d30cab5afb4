//! HTTP request handlers for the click service.

pub mod counter;
pub mod metrics;
pub mod winner;

pub use counter::{counter_events, increment, read_counter};
pub use metrics::metrics_handler;
pub use winner::{claim_winner, read_winner, winner_events};
