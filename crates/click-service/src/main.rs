//! Final Click
//!
//! Entry point for the click service: a bounded shared counter with a single
//! winner claim, served over HTTP with live event streams.

use click_service::config::{BackendConfig, Config, LogFormat};
use click_service::coordinator::{ClickCoordinator, CoordinatorSettings};
use click_service::observability::{init_metrics_recorder, HealthState};
use click_service::routes::{self, AppState};
use click_service::store::{MemoryBackend, RedisBackend, StateBackend};
use click_service::tasks::run_state_sync;
use common::secret::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().map_err(|e| {
        // Tracing is not up yet; the format depends on config
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    init_tracing(config.log_format);

    info!(
        target: "click.service",
        instance_id = %config.instance_id,
        bind_address = %config.bind_address,
        backend = config.backend.kind(),
        goal = config.goal,
        claim_requires_goal = config.claim_requires_goal,
        "Configuration loaded"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(target: "click.service", error = %e, "Failed to initialize metrics recorder");
        e
    })?;

    let backend: Arc<dyn StateBackend> = match &config.backend {
        BackendConfig::Memory => {
            warn!(target: "click.service", "Using in-memory backend, state is lost on restart");
            Arc::new(MemoryBackend::new())
        }
        BackendConfig::Redis { url } => {
            info!(target: "click.service", "Connecting to Redis...");
            let backend = RedisBackend::connect(url.expose_secret()).await.map_err(|e| {
                error!(target: "click.service", error = %e, "Failed to connect to Redis");
                e
            })?;
            info!(target: "click.service", "Redis connection established");
            Arc::new(backend)
        }
    };

    let coordinator = Arc::new(ClickCoordinator::new(
        backend,
        CoordinatorSettings::from(&config),
    ));
    coordinator.hydrate().await.map_err(|e| {
        error!(target: "click.service", error = %e, "Failed to load state");
        e
    })?;

    let health = Arc::new(HealthState::new());
    health.set_hydrated();

    let shutdown = CancellationToken::new();

    let sync_handle = tokio::spawn(run_state_sync(
        Arc::clone(&coordinator),
        Arc::clone(&health),
        config.sync_interval,
        shutdown.child_token(),
    ));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(target: "click.service", error = %e, "Invalid bind address");
        e
    })?;
    let drain_period = config.drain_period;

    let state = Arc::new(AppState {
        coordinator,
        config,
        health: Arc::clone(&health),
        shutdown: shutdown.clone(),
    });
    let app = routes::build_routes(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "click.service", %addr, "Click service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(health, shutdown, drain_period))
        .await?;

    if let Err(e) = sync_handle.await {
        warn!(target: "click.service", error = %e, "State sync task ended abnormally");
    }

    info!(target: "click.service", "Click service shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "click=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Waits for SIGINT or SIGTERM, stops advertising readiness, drains, then
/// cancels background tasks and open event streams.
async fn shutdown_signal(
    health: Arc<HealthState>,
    shutdown: CancellationToken,
    drain_period: Duration,
) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!(target: "click.service", "Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!(target: "click.service", error = %e, "Failed to listen for SIGINT"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!(target: "click.service", "Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!(target: "click.service", error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    health.set_not_ready();

    if drain_period.is_zero() {
        info!(target: "click.service", "Skipping drain period (CLICK_DRAIN_SECONDS=0)");
    } else {
        warn!(
            target: "click.service",
            drain_seconds = drain_period.as_secs(),
            "Draining connections..."
        );
        tokio::time::sleep(drain_period).await;
        info!(target: "click.service", "Drain period complete");
    }

    shutdown.cancel();
}
