//! Background tasks for the click service.

pub mod state_sync;

pub use state_sync::run_state_sync;
