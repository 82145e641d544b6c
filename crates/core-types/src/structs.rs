use crate::enums::TrendSeries;
use crate::error::CoreError;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// --- Shop KPIs ---

/// Percentage change of each shop KPI against a previous period.
///
/// A field is `None` when the previous value was zero or negative, i.e. there
/// is no baseline to compare against. It is never zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiDeltas {
    pub orders: Option<Decimal>,
    pub gmv: Option<Decimal>,
    pub visits: Option<Decimal>,
    pub views: Option<Decimal>,
    pub conversion_rate: Option<Decimal>,
    pub favorites: Option<Decimal>,
    pub cart_adds: Option<Decimal>,
    pub refunds: Option<Decimal>,
}

impl KpiDeltas {
    /// True when no field has a baseline.
    pub fn is_empty(&self) -> bool {
        *self == KpiDeltas::default()
    }
}

/// Shop-level totals for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopMetrics {
    pub orders: u64,
    /// Gross merchandise value in the shop's currency.
    pub gmv: Decimal,
    pub visits: u64,
    pub views: u64,
    /// Percentage, e.g. `4.2` for 4.2%.
    pub conversion_rate: Decimal,
    pub favorites: u64,
    pub cart_adds: u64,
    pub refunds: u64,
    pub deltas: KpiDeltas,
}

// --- Listings ---

/// Per-listing performance for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    pub listing_id: u64,
    pub title: String,
    pub views: u64,
    pub orders: u64,
    pub revenue: Decimal,
    pub etsy_url: String,
}

/// Top-5 rankings derived from a set of listings. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopListings {
    pub by_views: Vec<ListingItem>,
    pub by_orders: Vec<ListingItem>,
    pub by_revenue: Vec<ListingItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub items: Vec<ListingItem>,
    pub top: TopListings,
}

// --- Trends ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

impl TrendPoint {
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        Self { date, value }
    }
}

/// All known series. Series that were not requested (or not present upstream)
/// are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendsResponse {
    pub revenue: Vec<TrendPoint>,
    pub orders: Vec<TrendPoint>,
    pub visits: Vec<TrendPoint>,
    pub views: Vec<TrendPoint>,
}

impl TrendsResponse {
    pub fn series(&self, series: TrendSeries) -> &[TrendPoint] {
        match series {
            TrendSeries::Revenue => &self.revenue,
            TrendSeries::Orders => &self.orders,
            TrendSeries::Visits => &self.visits,
            TrendSeries::Views => &self.views,
        }
    }

    pub fn series_mut(&mut self, series: TrendSeries) -> &mut Vec<TrendPoint> {
        match series {
            TrendSeries::Revenue => &mut self.revenue,
            TrendSeries::Orders => &mut self.orders,
            TrendSeries::Visits => &mut self.visits,
            TrendSeries::Views => &mut self.views,
        }
    }
}

// --- Funnel ---

/// Stage-to-stage conversion percentages. The three rates are independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelMetrics {
    pub favorite_rate: Decimal,
    pub add_to_cart_rate: Decimal,
    pub conversion_rate: Decimal,
}

// --- Request scoping ---

/// An optionally bounded, inclusive date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Builds a range, rejecting windows whose start is after their end.
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, CoreError> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(CoreError::InvalidInput(
                    "date range".to_string(),
                    format!("from_date {} is after to_date {}", f, t),
                ));
            }
        }
        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// The window of equal length that ends the day before this one starts.
    ///
    /// Only defined for fully bounded ranges.
    pub fn previous_period(&self) -> Option<DateRange> {
        let (from, to) = (self.from?, self.to?);
        let days = (to - from).num_days();
        let prev_to = from.checked_sub_signed(Duration::days(1))?;
        let prev_from = prev_to.checked_sub_signed(Duration::days(days))?;
        Some(DateRange {
            from: Some(prev_from),
            to: Some(prev_to),
        })
    }

    /// Stable `from:to` fragment for cache keys, `-` standing in for an open end.
    pub fn key_fragment(&self) -> String {
        let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        format!("{}:{}", fmt(self.from), fmt(self.to))
    }

    /// Upstream query parameters for the bounded ends of the range.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(from) = self.from {
            params.push(("from_date", from.to_string()));
        }
        if let Some(to) = self.to {
            params.push(("to_date", to.to_string()));
        }
        params
    }
}
