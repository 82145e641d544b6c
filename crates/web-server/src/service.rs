use crate::error::AppError;
use analytics::MetricsAggregator;
use api_client::ShopDataSource;
use core_types::{
    DataMode, DateRange, FunnelMetrics, ListingsResponse, ShopMetrics, TrendSeries, TrendsResponse,
};
use std::sync::Arc;

/// Largest page of listings Etsy will return in one call.
pub const MAX_LISTINGS_LIMIT: u32 = 100;

/// Fetch-then-aggregate for each dashboard view.
///
/// One instance is shared by all requests; it holds no per-request state.
#[derive(Clone)]
pub struct MetricsService {
    source: Arc<dyn ShopDataSource>,
    aggregator: MetricsAggregator,
}

impl MetricsService {
    pub fn new(source: Arc<dyn ShopDataSource>) -> Self {
        Self {
            source,
            aggregator: MetricsAggregator::new(),
        }
    }

    pub fn mode(&self) -> DataMode {
        self.source.mode()
    }

    /// Shop totals. With `compare` and a fully bounded range, deltas are
    /// computed against the equally long period just before it.
    pub async fn shop_metrics(
        &self,
        shop_id: &str,
        range: &DateRange,
        compare: bool,
    ) -> Result<ShopMetrics, AppError> {
        match range.previous_period().filter(|_| compare) {
            Some(previous_range) => {
                let (current, previous) = tokio::try_join!(
                    self.source.fetch_shop_stats(shop_id, range),
                    self.source.fetch_shop_stats(shop_id, &previous_range),
                )?;
                Ok(self
                    .aggregator
                    .aggregate_shop_metrics_with_baseline(&current, &previous)?)
            }
            None => {
                let raw = self.source.fetch_shop_stats(shop_id, range).await?;
                Ok(self.aggregator.aggregate_shop_metrics(&raw)?)
            }
        }
    }

    pub async fn listings(
        &self,
        shop_id: &str,
        range: &DateRange,
        limit: u32,
    ) -> Result<ListingsResponse, AppError> {
        if limit == 0 || limit > MAX_LISTINGS_LIMIT {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {}",
                MAX_LISTINGS_LIMIT
            )));
        }
        let raw = self.source.fetch_listings_stats(shop_id, range, limit).await?;
        Ok(self.aggregator.aggregate_listings_metrics(&raw)?)
    }

    /// Requested series names are passed upstream as given; unknown names come
    /// back empty rather than as an error.
    pub async fn trends(
        &self,
        shop_id: &str,
        range: &DateRange,
        series: &[String],
    ) -> Result<TrendsResponse, AppError> {
        let raw = self.source.fetch_trends(shop_id, range, series).await?;
        Ok(self.aggregator.aggregate_trends(&raw, series)?)
    }

    pub async fn funnel(&self, shop_id: &str, range: &DateRange) -> Result<FunnelMetrics, AppError> {
        let raw = self.source.fetch_funnel_stats(shop_id, range).await?;
        Ok(self.aggregator.aggregate_funnel_metrics(&raw)?)
    }
}

/// Splits a comma-separated `series` parameter. An empty list means all series.
pub fn parse_series(raw: Option<&str>) -> Vec<String> {
    let requested: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if requested.is_empty() {
        TrendSeries::ALL.iter().map(|s| s.as_str().to_string()).collect()
    } else {
        requested
    }
}
