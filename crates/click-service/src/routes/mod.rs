//! HTTP routes for the click service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::coordinator::ClickCoordinator;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::observability::{health_router, HealthState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Counter, winner and notification bus.
    pub coordinator: Arc<ClickCoordinator>,

    /// Service configuration.
    pub config: Config,

    /// Liveness and readiness flags.
    pub health: Arc<HealthState>,

    /// Cancelled at shutdown; ends open event streams.
    pub shutdown: CancellationToken,
}

/// Build the application routes.
///
/// - `/health`, `/ready` - probes, unversioned
/// - `/metrics` - Prometheus scrape endpoint
/// - `/api/v1/counter`, `/api/v1/counter/increment`, `/api/v1/counter/events`
/// - `/api/v1/winner`, `/api/v1/winner/events`
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/api/v1/counter", get(handlers::read_counter))
        .route("/api/v1/counter/increment", post(handlers::increment))
        .route("/api/v1/counter/events", get(handlers::counter_events))
        .route(
            "/api/v1/winner",
            get(handlers::read_winner).post(handlers::claim_winner),
        )
        .route("/api/v1/winner/events", get(handlers::winner_events))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - bounds time to response headers, SSE bodies stream on
    // 2. TraceLayer - request logging
    // 3. http_metrics_middleware - records all responses (outermost)
    api_routes
        .merge(health_router(Arc::clone(&state.health)))
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorSettings;
    use crate::store::MemoryBackend;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    async fn app(count: u64, goal: u64) -> Router {
        let config = Config::from_vars(&HashMap::from([(
            "CLICK_GOAL".to_string(),
            goal.to_string(),
        )]))
        .unwrap();
        let coordinator = Arc::new(ClickCoordinator::new(
            Arc::new(MemoryBackend::with_count(count)),
            CoordinatorSettings::from(&config),
        ));
        coordinator.hydrate().await.unwrap();

        let health = Arc::new(HealthState::new());
        health.set_hydrated();

        let state = Arc::new(AppState {
            coordinator,
            config,
            health,
            shutdown: CancellationToken::new(),
        });
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_read_counter() {
        let response = app(3, 10)
            .await
            .oneshot(Request::get("/api/v1/counter").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["goal"], 10);
    }

    #[tokio::test]
    async fn test_increment_reports_outcome() {
        let app = app(9, 10).await;

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/counter/increment")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 10);
        assert_eq!(body["outcome"], "committed");

        let response = app
            .oneshot(
                Request::post("/api/v1/counter/increment")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 10);
        assert_eq!(body["outcome"], "at_goal");
    }

    #[tokio::test]
    async fn test_claim_rejects_malformed_body_with_400() {
        let response = app(10, 10)
            .await
            .oneshot(
                Request::post("/api/v1/winner")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"name\": 1}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_IDENTITY");
    }

    #[tokio::test]
    async fn test_claim_then_read_winner() {
        let app = app(10, 10).await;

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/v1/winner")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await, serde_json::Value::Null);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/winner")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"identity":"a@x.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["accepted"], true);

        let response = app
            .oneshot(
                Request::get("/api/v1/winner")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["identity"], "a@x.com");
    }

    #[tokio::test]
    async fn test_probes_are_mounted() {
        let app = app(0, 10).await;

        for path in ["/health", "/ready", "/metrics"] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }
}
