use crate::error::ApiError;
use crate::ShopDataSource;
use async_trait::async_trait;
use core_types::{DataMode, DateRange};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const SHOP_STATS: &str = "shop_stats";
pub const LISTINGS_STATS: &str = "listings_stats";
pub const TRENDS_DATA: &str = "trends_data";
pub const FUNNEL_STATS: &str = "funnel_stats";

/// Serves canned responses instead of calling Etsy.
///
/// A fixture is looked up as `<dir>/<name>.json` in each directory in order.
/// The first file that exists decides: if it reads and parses it is served,
/// otherwise the built-in default for that name is. An unknown name yields `{}`.
#[derive(Debug, Clone, Default)]
pub struct FixtureClient {
    dirs: Vec<PathBuf>,
}

impl FixtureClient {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// A client that only ever serves the built-in defaults.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub async fn load_fixture(&self, name: &str) -> Value {
        for dir in &self.dirs {
            match read_fixture(dir, name).await {
                Lookup::Missing => continue,
                Lookup::Loaded(value) => return value,
                Lookup::Broken => break,
            }
        }
        default_fixture(name)
    }
}

enum Lookup {
    Missing,
    Loaded(Value),
    Broken,
}

async fn read_fixture(dir: &Path, name: &str) -> Lookup {
    let path = dir.join(format!("{}.json", name));
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Lookup::Missing,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable fixture, using built-in default.");
            return Lookup::Broken;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => {
            tracing::debug!(path = %path.display(), "Loaded fixture from disk.");
            Lookup::Loaded(value)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unparseable fixture, using built-in default.");
            Lookup::Broken
        }
    }
}

/// The built-in stand-in documents.
pub fn default_fixture(name: &str) -> Value {
    match name {
        SHOP_STATS => json!({
            "orders": 142,
            "gmv": 3456.78,
            "visits": 8932,
            "views": 12456,
            "conversion_rate": 4.2,
            "favorites": 234,
            "cart_adds": 567,
            "refunds": 23
        }),
        LISTINGS_STATS => json!({
            "listings": [
                {
                    "listing_id": 123,
                    "title": "Handmade Ceramic Mug",
                    "views": 456,
                    "orders": 45,
                    "revenue": 675.00,
                    "etsy_url": "https://etsy.com/listing/123"
                }
            ]
        }),
        TRENDS_DATA => json!({
            "revenue": [{"date": "2024-01-01", "value": 100.0}],
            "orders": [{"date": "2024-01-01", "value": 5}],
            "visits": [{"date": "2024-01-01", "value": 200}],
            "views": [{"date": "2024-01-01", "value": 300}]
        }),
        FUNNEL_STATS => json!({
            "favorite_rate": 5.2,
            "add_to_cart_rate": 8.7,
            "conversion_rate": 4.2
        }),
        _ => json!({}),
    }
}

#[async_trait]
impl ShopDataSource for FixtureClient {
    async fn fetch_shop_stats(&self, _shop_id: &str, _range: &DateRange) -> Result<Value, ApiError> {
        Ok(self.load_fixture(SHOP_STATS).await)
    }

    async fn fetch_listings_stats(
        &self,
        _shop_id: &str,
        _range: &DateRange,
        _limit: u32,
    ) -> Result<Value, ApiError> {
        Ok(self.load_fixture(LISTINGS_STATS).await)
    }

    async fn fetch_trends(
        &self,
        _shop_id: &str,
        _range: &DateRange,
        _series: &[String],
    ) -> Result<Value, ApiError> {
        Ok(self.load_fixture(TRENDS_DATA).await)
    }

    async fn fetch_funnel_stats(&self, _shop_id: &str, _range: &DateRange) -> Result<Value, ApiError> {
        Ok(self.load_fixture(FUNNEL_STATS).await)
    }

    fn mode(&self) -> DataMode {
        DataMode::Mock
    }
}
