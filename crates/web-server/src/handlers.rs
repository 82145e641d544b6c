use crate::{AppState, error::AppError, service::parse_series};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::NaiveDate;
use core_types::{DateRange, FunnelMetrics, ListingsResponse, ShopMetrics, TrendsResponse};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    shop_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    #[serde(default)]
    compare: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListingsQuery {
    shop_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}
fn default_limit() -> u32 { 50 }

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    shop_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    series: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    shop_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
}

fn require_shop_id(shop_id: Option<String>) -> Result<String, AppError> {
    match shop_id.map(|s| s.trim().to_string()) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(AppError::BadRequest("shop_id is required".to_string())),
    }
}

fn parse_date(name: &str, raw: Option<String>) -> Result<Option<NaiveDate>, AppError> {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} must be a YYYY-MM-DD date, got '{}'", name, s))),
    }
}

fn parse_range(from_date: Option<String>, to_date: Option<String>) -> Result<DateRange, AppError> {
    let from = parse_date("from_date", from_date)?;
    let to = parse_date("to_date", to_date)?;
    Ok(DateRange::new(from, to)?)
}

/// # GET /
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to EtsyNova API",
        "version": env!("CARGO_PKG_VERSION"),
        "mock_mode": state.metrics.mode().is_mock(),
    }))
}

/// # GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "etsynova-api" }))
}

/// # GET /health/
/// Liveness probe used by the frontend's proxy.
pub async fn health_probe() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// # GET /metrics/shop
/// Shop KPIs. With `compare=true` and both dates set, includes deltas against
/// the preceding period of the same length.
pub async fn get_shop_metrics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ShopQuery>, QueryRejection>,
) -> Result<Json<ShopMetrics>, AppError> {
    let Query(query) = query?;
    let shop_id = require_shop_id(query.shop_id)?;
    let range = parse_range(query.from_date, query.to_date)?;
    let metrics = state.metrics.shop_metrics(&shop_id, &range, query.compare).await?;
    Ok(Json(metrics))
}

/// # GET /metrics/listings
pub async fn get_listings_metrics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListingsQuery>, QueryRejection>,
) -> Result<Json<ListingsResponse>, AppError> {
    let Query(query) = query?;
    let shop_id = require_shop_id(query.shop_id)?;
    let range = parse_range(query.from_date, query.to_date)?;
    let listings = state.metrics.listings(&shop_id, &range, query.limit).await?;
    Ok(Json(listings))
}

/// # GET /metrics/trends
pub async fn get_trends(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TrendsQuery>, QueryRejection>,
) -> Result<Json<TrendsResponse>, AppError> {
    let Query(query) = query?;
    let shop_id = require_shop_id(query.shop_id)?;
    let range = parse_range(query.from_date, query.to_date)?;
    let series = parse_series(query.series.as_deref());
    let trends = state.metrics.trends(&shop_id, &range, &series).await?;
    Ok(Json(trends))
}

/// # GET /metrics/funnel
pub async fn get_funnel_metrics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<FunnelMetrics>, AppError> {
    let Query(query) = query?;
    let shop_id = require_shop_id(query.shop_id)?;
    let range = parse_range(query.from_date, query.to_date)?;
    let funnel = state.metrics.funnel(&shop_id, &range).await?;
    Ok(Json(funnel))
}
