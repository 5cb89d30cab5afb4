//! Final Click service library.
//!
//! A shared counter that many participants click towards a fixed goal. The
//! first participant to claim once the goal is reached becomes the single
//! winner. Every participant watches both the count and the winner live.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> coordinator.rs -> counter.rs / winner.rs -> store/*.rs
//!                                                  \-> bus.rs -> subscriptions (SSE, sessions)
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `store` - `StateBackend` trait with memory and Redis backends
//! - `counter` - Bounded compare-and-swap counter
//! - `winner` - Exactly-once winner registry
//! - `bus` - Latest-value notification fan-out
//! - `coordinator` - Wires the above together
//! - `session` - Per-participant view over the coordinator
//! - `handlers`, `models`, `routes`, `middleware` - HTTP surface
//! - `observability` - Metrics and health probes
//! - `tasks` - Background state sync

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod counter;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod session;
pub mod store;
pub mod tasks;
pub mod winner;
