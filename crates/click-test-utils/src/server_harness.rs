//! Test server harness for E2E testing
//!
//! Provides `TestClickServer` for spawning real click service instances in tests.

use click_service::config::Config;
use click_service::coordinator::{ClickCoordinator, CoordinatorSettings};
use click_service::observability::HealthState;
use click_service::routes::{self, AppState};
use click_service::store::{MemoryBackend, StateBackend};
use click_service::tasks::run_state_sync;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning the click service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let server = TestClickServer::spawn_with_count(0, 10).await?;
/// let response = reqwest::get(format!("{}/api/v1/counter", server.url())).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestClickServer {
    addr: SocketAddr,
    config: Config,
    coordinator: Arc<ClickCoordinator>,
    health: Arc<HealthState>,
    shutdown: CancellationToken,
    _handle: JoinHandle<()>,
    _sync_handle: JoinHandle<()>,
}

impl TestClickServer {
    /// Spawn a server over an in-memory backend seeded with `count`.
    pub async fn spawn_with_count(count: u64, goal: u64) -> Result<Self, anyhow::Error> {
        Self::spawn(
            Arc::new(MemoryBackend::with_count(count)),
            &[("CLICK_GOAL", &goal.to_string())],
        )
        .await
    }

    /// Spawn a server over `backend` with extra `CLICK_*` settings.
    ///
    /// The server will:
    /// - Hydrate from the backend (failing the spawn if that fails)
    /// - Run the state sync task
    /// - Bind to a random available port (127.0.0.1:0)
    pub async fn spawn(
        backend: Arc<dyn StateBackend>,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("CLICK_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("CLICK_INSTANCE_ID".to_string(), "click-test".to_string()),
            ("CLICK_SYNC_INTERVAL_MS".to_string(), "50".to_string()),
            ("CLICK_SSE_KEEPALIVE_SECONDS".to_string(), "1".to_string()),
            ("CLICK_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let coordinator = Arc::new(ClickCoordinator::new(
            backend,
            CoordinatorSettings::from(&config),
        ));
        coordinator
            .hydrate()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to hydrate state: {}", e))?;

        let health = Arc::new(HealthState::new());
        health.set_hydrated();

        let shutdown = CancellationToken::new();
        let sync_handle = tokio::spawn(run_state_sync(
            Arc::clone(&coordinator),
            Arc::clone(&health),
            config.sync_interval,
            shutdown.child_token(),
        ));

        let state = Arc::new(AppState {
            coordinator: Arc::clone(&coordinator),
            config: config.clone(),
            health: Arc::clone(&health),
            shutdown: shutdown.clone(),
        });

        // Recorder is built but not installed, so tests never fight over the global
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            coordinator,
            health,
            shutdown,
            _handle: handle,
            _sync_handle: sync_handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The coordinator behind the server, for direct assertions.
    pub fn coordinator(&self) -> &Arc<ClickCoordinator> {
        &self.coordinator
    }

    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    /// End open event streams and stop the sync task.
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for TestClickServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self._handle.abort();
    }
}
