use crate::error::ApiError;
use async_trait::async_trait;
use cache::Cache;
use configuration::EtsyConfig;
use core_types::{DataMode, DateRange};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod auth;
pub mod error;
pub mod fixtures;
pub mod live;
pub mod responses;
pub mod retry;
// --- Public API ---
pub use auth::TokenStore;
pub use fixtures::FixtureClient;
pub use live::EtsyClient;
pub use responses::TokenResponse;
pub use retry::RetryPolicy;

/// The source of raw shop data, live or canned.
///
/// Route handlers only see this trait, so the same code serves both the real
/// Etsy API and the fixture-backed mock mode. Payloads are returned as raw JSON
/// for the aggregator to normalise.
#[async_trait]
pub trait ShopDataSource: Send + Sync {
    /// Shop-level totals (orders, GMV, visits, ...).
    async fn fetch_shop_stats(&self, shop_id: &str, range: &DateRange) -> Result<Value, ApiError>;

    /// Per-listing statistics, at most `limit` listings.
    async fn fetch_listings_stats(
        &self,
        shop_id: &str,
        range: &DateRange,
        limit: u32,
    ) -> Result<Value, ApiError>;

    /// Daily series for the named metrics.
    async fn fetch_trends(
        &self,
        shop_id: &str,
        range: &DateRange,
        series: &[String],
    ) -> Result<Value, ApiError>;

    /// Favorite / cart / order conversion rates.
    async fn fetch_funnel_stats(&self, shop_id: &str, range: &DateRange) -> Result<Value, ApiError>;

    fn mode(&self) -> DataMode;
}

/// Picks the data source for the configured mode.
///
/// Mock mode never fails. Live mode fails with `NotConfigured` when credentials
/// are missing, so a misconfigured deployment is caught at startup.
pub fn build_data_source(
    config: &EtsyConfig,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
    cancel: CancellationToken,
) -> Result<Arc<dyn ShopDataSource>, ApiError> {
    match config.mode {
        DataMode::Mock => {
            tracing::info!("Serving Etsy data from fixtures (mock mode).");
            Ok(Arc::new(FixtureClient::new(config.fixture_dirs.clone())))
        }
        DataMode::Live => {
            let client = EtsyClient::new(config)?
                .with_cache(cache, cache_ttl)
                .with_cancellation(cancel);
            tracing::info!(base_url = %config.base_url, "Serving Etsy data from the live API.");
            Ok(Arc::new(client))
        }
    }
}
