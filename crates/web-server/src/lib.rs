//! # EtsyNova HTTP API
//!
//! Read-only dashboard endpoints over an Etsy shop. Each request goes
//! data source → aggregator → JSON; the data source is either the live Etsy
//! client or the fixture client, picked once at startup.

use api_client::ShopDataSource;
use axum::{Router, http::HeaderValue, routing::get};
use cache::Cache;
use configuration::Config;
use core_types::DataMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod service;

pub use error::AppError;
pub use service::MetricsService;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub metrics: MetricsService,
}

impl AppState {
    pub fn new(source: Arc<dyn ShopDataSource>) -> Self {
        Self {
            metrics: MetricsService::new(source),
        }
    }

    pub fn mode(&self) -> DataMode {
        self.metrics.mode()
    }
}

/// Builds the router with CORS restricted to `cors_origins`.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin.");
                None
            }
        })
        .collect();

    // Credentials rule out wildcard methods/headers, so mirror the preflight instead.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/health/", get(handlers::health_probe))
        .route("/metrics/shop", get(handlers::get_shop_metrics))
        .route("/metrics/listings", get(handlers::get_listings_metrics))
        .route("/metrics/trends", get(handlers::get_trends))
        .route("/metrics/funnel", get(handlers::get_funnel_metrics))
        .with_state(Arc::new(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Builds the cache and the mode-appropriate data source from `config`.
///
/// `cancel` aborts in-flight upstream backoff when the process shuts down.
pub async fn build_metrics_service(
    config: &Config,
    cancel: CancellationToken,
) -> Result<(MetricsService, Arc<dyn Cache>), AppError> {
    let cache = cache::build_cache(&config.cache).await;
    let source = api_client::build_data_source(&config.etsy, cache.clone(), config.cache.ttl(), cancel)?;
    Ok((MetricsService::new(source), cache))
}

/// Periodically drops expired cache entries until `cancel` fires.
pub fn spawn_cache_sweeper(
    cache: Arc<dyn Cache>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match cache.clear_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "Swept expired cache entries."),
                    Err(e) => tracing::warn!(error = %e, "Cache sweep failed."),
                },
            }
        }
        tracing::debug!("Cache sweeper stopped.");
    })
}

/// Runs the server until Ctrl-C.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let cancel = CancellationToken::new();

    let (metrics, cache) = build_metrics_service(&config, cancel.clone()).await?;
    let state = AppState { metrics };
    tracing::info!(
        mock_mode = state.mode().is_mock(),
        cache = cache.backend_name(),
        "Metrics service ready."
    );

    let sweeper = spawn_cache_sweeper(cache, config.cache.sweep_interval(), cancel.clone());
    let app = build_router(state, &config.server.cors_origins);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!("Web server listening on http://{}", listener.local_addr()?);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received."),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C."),
        }
        shutdown.cancel();
    });

    let graceful = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { graceful.cancelled().await })
        .await?;

    cancel.cancel();
    sweeper.await?;
    tracing::info!("Web server stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::FixtureClient;
    use api_client::error::ApiError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use cache::MemoryCache;
    use core_types::DateRange;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn origins() -> Vec<String> {
        vec!["http://localhost:3000".to_string()]
    }

    fn mock_app() -> Router {
        build_router(AppState::new(Arc::new(FixtureClient::builtin())), &origins())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Fails every call with the error produced by `make`.
    struct FailingSource {
        make: fn() -> ApiError,
    }

    #[async_trait]
    impl ShopDataSource for FailingSource {
        async fn fetch_shop_stats(&self, _: &str, _: &DateRange) -> Result<Value, ApiError> {
            Err((self.make)())
        }
        async fn fetch_listings_stats(&self, _: &str, _: &DateRange, _: u32) -> Result<Value, ApiError> {
            Err((self.make)())
        }
        async fn fetch_trends(&self, _: &str, _: &DateRange, _: &[String]) -> Result<Value, ApiError> {
            Err((self.make)())
        }
        async fn fetch_funnel_stats(&self, _: &str, _: &DateRange) -> Result<Value, ApiError> {
            Err((self.make)())
        }
        fn mode(&self) -> DataMode {
            DataMode::Live
        }
    }

    fn failing_app(make: fn() -> ApiError) -> Router {
        build_router(AppState::new(Arc::new(FailingSource { make })), &origins())
    }

    #[tokio::test]
    async fn root_reports_mock_mode() {
        let (status, body) = get_json(mock_app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to EtsyNova API");
        assert_eq!(body["mock_mode"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn health_endpoints() {
        let (status, body) = get_json(mock_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "service": "etsynova-api"}));

        let (status, body) = get_json(mock_app(), "/health/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn shop_metrics_from_fixtures() {
        let (status, body) = get_json(mock_app(), "/metrics/shop?shop_id=demo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orders"], 142);
        assert_eq!(body["gmv"], 3456.78);
        assert_eq!(body["conversion_rate"], 4.2);
        assert_eq!(body["deltas"]["orders"], Value::Null);
    }

    #[tokio::test]
    async fn compare_against_identical_fixture_gives_zero_deltas() {
        let (status, body) = get_json(
            mock_app(),
            "/metrics/shop?shop_id=demo&from_date=2024-01-01&to_date=2024-01-31&compare=true",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deltas"]["orders"], 0.0);
        assert_eq!(body["deltas"]["refunds"], 0.0);
    }

    #[tokio::test]
    async fn listings_trends_and_funnel_from_fixtures() {
        let (status, body) = get_json(mock_app(), "/metrics/listings?shop_id=demo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["listing_id"], 123);
        assert_eq!(body["top"]["by_orders"].as_array().unwrap().len(), 1);

        let (status, body) = get_json(mock_app(), "/metrics/trends?shop_id=demo&series=revenue").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revenue"], json!([{"date": "2024-01-01", "value": 100.0}]));
        assert_eq!(body["orders"], json!([]));

        let (status, body) = get_json(mock_app(), "/metrics/trends?shop_id=demo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["views"].as_array().unwrap().len(), 1);

        let (status, body) = get_json(mock_app(), "/metrics/funnel?shop_id=demo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["favorite_rate"], 5.2);
        assert_eq!(body["add_to_cart_rate"], 8.7);
    }

    #[tokio::test]
    async fn bad_queries_are_rejected() {
        let (status, body) = get_json(mock_app(), "/metrics/shop").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "shop_id is required");

        let (status, _) =
            get_json(mock_app(), "/metrics/funnel?shop_id=demo&from_date=2024-02-01&to_date=2024-01-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(mock_app(), "/metrics/trends?shop_id=demo&from_date=01/02/2024").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("from_date"));

        let (status, _) = get_json(mock_app(), "/metrics/listings?shop_id=demo&limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn undeserialisable_queries_get_json_errors() {
        let (status, body) = get_json(mock_app(), "/metrics/listings?shop_id=demo&limit=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = get_json(mock_app(), "/metrics/shop?shop_id=demo&compare=yes").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn upstream_errors_map_to_statuses() {
        let (status, _) =
            get_json(failing_app(|| ApiError::RateLimited { attempts: 4 }), "/metrics/shop?shop_id=s").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) =
            get_json(failing_app(|| ApiError::NotConfigured("no client id".into())), "/metrics/funnel?shop_id=s").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "A server configuration error occurred");

        let (status, _) =
            get_json(failing_app(|| ApiError::Unauthorized("expired".into())), "/metrics/trends?shop_id=s").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get_json(
            failing_app(|| ApiError::ServerError { status: 500, attempts: 4 }),
            "/metrics/listings?shop_id=s",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let request = |origin: &str| {
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, origin)
                .body(Body::empty())
                .unwrap()
        };

        let allowed = mock_app().oneshot(request("http://localhost:3000")).await.unwrap();
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );

        let denied = mock_app().oneshot(request("http://evil.example")).await.unwrap();
        assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_clears_expired_entries_until_cancelled() {
        let memory = Arc::new(MemoryCache::new());
        memory.set("k", json!(1), Duration::from_secs(5)).await.unwrap();
        let cancel = CancellationToken::new();
        let handle = spawn_cache_sweeper(memory.clone(), Duration::from_secs(10), cancel.clone());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(memory.is_empty().await);

        cancel.cancel();
        handle.await.unwrap();
    }
}
