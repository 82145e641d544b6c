use crate::error::AnalyticsError;
use crate::fields::{self, Object};
use core_types::{
    FunnelMetrics, KpiDeltas, ListingItem, ListingsResponse, ShopMetrics, TopListings, TrendPoint,
    TrendSeries, TrendsResponse,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Length of each top-listings ranking.
pub const TOP_N: usize = 5;

/// A stateless transformer from raw upstream payloads to typed metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsAggregator {}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds shop totals from a raw stats payload. Deltas are left unset.
    pub fn aggregate_shop_metrics(&self, raw: &Value) -> Result<ShopMetrics, AnalyticsError> {
        let obj = fields::object(raw, "shop_stats")?;
        Ok(ShopMetrics {
            orders: fields::count(obj, "orders")?,
            gmv: fields::decimal(obj, "gmv")?,
            visits: fields::count(obj, "visits")?,
            views: fields::count(obj, "views")?,
            conversion_rate: fields::decimal(obj, "conversion_rate")?,
            favorites: fields::count(obj, "favorites")?,
            cart_adds: fields::count(obj, "cart_adds")?,
            refunds: fields::count(obj, "refunds")?,
            deltas: KpiDeltas::default(),
        })
    }

    /// Shop totals for `current`, with deltas against the `previous` period.
    pub fn aggregate_shop_metrics_with_baseline(
        &self,
        current: &Value,
        previous: &Value,
    ) -> Result<ShopMetrics, AnalyticsError> {
        let mut metrics = self.aggregate_shop_metrics(current)?;
        metrics.deltas = self.calculate_deltas(current, previous)?;
        Ok(metrics)
    }

    /// Maps every raw listing to a `ListingItem` and ranks them three ways.
    ///
    /// `items` keeps input order. Each ranking is a stable descending sort
    /// capped at [`TOP_N`], so equal values keep their input order.
    pub fn aggregate_listings_metrics(&self, raw: &Value) -> Result<ListingsResponse, AnalyticsError> {
        let obj = fields::object(raw, "listings_stats")?;

        let items = fields::array(obj, "listings")?
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let listing = fields::object(entry, &format!("listings[{}]", i))?;
                listing_item(listing)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let top = TopListings {
            by_views: top_by(&items, |item| item.views),
            by_orders: top_by(&items, |item| item.orders),
            by_revenue: top_by(&items, |item| item.revenue),
        };

        Ok(ListingsResponse { items, top })
    }

    /// Extracts the requested series.
    ///
    /// A name that is not a known series, or that the payload does not carry,
    /// is skipped without error. Points keep payload order and are not
    /// deduplicated.
    pub fn aggregate_trends<S: AsRef<str>>(
        &self,
        raw: &Value,
        series_names: &[S],
    ) -> Result<TrendsResponse, AnalyticsError> {
        let obj = fields::object(raw, "trends_data")?;
        let mut trends = TrendsResponse::default();

        for name in series_names {
            let name = name.as_ref();
            let Ok(series) = name.parse::<TrendSeries>() else {
                tracing::debug!(series = name, "Skipping unknown trend series.");
                continue;
            };
            if !obj.contains_key(series.as_str()) {
                continue;
            }

            let points = fields::array(obj, series.as_str())?
                .iter()
                .enumerate()
                .map(|(i, point)| trend_point(point, &format!("{}[{}]", series, i)))
                .collect::<Result<Vec<_>, _>>()?;
            *trends.series_mut(series) = points;
        }

        Ok(trends)
    }

    pub fn aggregate_funnel_metrics(&self, raw: &Value) -> Result<FunnelMetrics, AnalyticsError> {
        let obj = fields::object(raw, "funnel_stats")?;
        Ok(FunnelMetrics {
            favorite_rate: fields::decimal(obj, "favorite_rate")?,
            add_to_cart_rate: fields::decimal(obj, "add_to_cart_rate")?,
            conversion_rate: fields::decimal(obj, "conversion_rate")?,
        })
    }

    /// Percentage change of each shop KPI, rounded to 2 dp.
    ///
    /// A field is left unset when its previous value is zero or negative.
    pub fn calculate_deltas(&self, current: &Value, previous: &Value) -> Result<KpiDeltas, AnalyticsError> {
        let current = fields::object(current, "current")?;
        let previous = fields::object(previous, "previous")?;

        let delta = |field: &str| -> Result<Option<Decimal>, AnalyticsError> {
            percent_change(
                fields::decimal(current, field)?,
                fields::decimal(previous, field)?,
                field,
            )
        };

        Ok(KpiDeltas {
            orders: delta("orders")?,
            gmv: delta("gmv")?,
            visits: delta("visits")?,
            views: delta("views")?,
            conversion_rate: delta("conversion_rate")?,
            favorites: delta("favorites")?,
            cart_adds: delta("cart_adds")?,
            refunds: delta("refunds")?,
        })
    }
}

fn listing_item(listing: &Object) -> Result<ListingItem, AnalyticsError> {
    Ok(ListingItem {
        listing_id: fields::count(listing, "listing_id")?,
        title: fields::text(listing, "title")?,
        views: fields::count(listing, "views")?,
        orders: fields::count(listing, "orders")?,
        revenue: fields::decimal(listing, "revenue")?,
        etsy_url: fields::text(listing, "etsy_url")?,
    })
}

fn trend_point(point: &Value, context: &str) -> Result<TrendPoint, AnalyticsError> {
    let obj = fields::object(point, context)?;
    let value = obj
        .get("value")
        .ok_or_else(|| AnalyticsError::malformed(format!("{}.value", context), "missing"))?;
    Ok(TrendPoint {
        date: fields::date(obj, "date")
            .map_err(|e| rescope(e, context))?,
        value: fields::required_decimal(value, &format!("{}.value", context))?,
    })
}

/// Prefixes a field-level error with the path of the enclosing element.
fn rescope(err: AnalyticsError, context: &str) -> AnalyticsError {
    match err {
        AnalyticsError::MalformedPayload { field, reason } => AnalyticsError::MalformedPayload {
            field: format!("{}.{}", context, field),
            reason,
        },
        other => other,
    }
}

fn top_by<K, F>(items: &[ListingItem], key: F) -> Vec<ListingItem>
where
    K: Ord,
    F: Fn(&ListingItem) -> K,
{
    let mut ranked: Vec<&ListingItem> = items.iter().collect();
    // `sort_by` is stable: ties keep input order.
    ranked.sort_by(|a, b| key(b).cmp(&key(a)));
    ranked.into_iter().take(TOP_N).cloned().collect()
}

fn percent_change(
    current: Decimal,
    previous: Decimal,
    field: &str,
) -> Result<Option<Decimal>, AnalyticsError> {
    if previous <= Decimal::ZERO {
        return Ok(None);
    }
    let change = current
        .checked_sub(previous)
        .and_then(|diff| diff.checked_div(previous))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| AnalyticsError::Calculation(format!("delta for '{}' overflowed", field)))?;
    Ok(Some(change.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)))
}
