//! # Click Test Utilities
//!
//! Shared test utilities for the click service.
//!
//! This crate provides:
//! - Server test harness (`TestClickServer` for E2E tests)
//! - Fault-injecting storage backends (`RivalWriterBackend`, `UnavailableBackend`,
//!   `LatencyBackend`)
//! - A minimal SSE reader for event stream assertions (`SseReader`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use click_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestClickServer::spawn_with_count(9, 10).await?;
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/api/v1/counter/increment", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod mock_backend;
pub mod server_harness;
pub mod sse;

pub use mock_backend::*;
pub use server_harness::*;
pub use sse::*;
