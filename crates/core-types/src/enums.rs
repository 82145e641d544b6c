use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether upstream calls go to the real Etsy API or are served from fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Mock,
    Live,
}

impl DataMode {
    pub fn is_mock(&self) -> bool {
        matches!(self, DataMode::Mock)
    }
}

/// The named time series the trends endpoint knows how to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendSeries {
    Revenue,
    Orders,
    Visits,
    Views,
}

impl TrendSeries {
    pub const ALL: [TrendSeries; 4] = [
        TrendSeries::Revenue,
        TrendSeries::Orders,
        TrendSeries::Visits,
        TrendSeries::Views,
    ];

    /// The key used for this series in raw payloads and in responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendSeries::Revenue => "revenue",
            TrendSeries::Orders => "orders",
            TrendSeries::Visits => "visits",
            TrendSeries::Views => "views",
        }
    }
}

impl fmt::Display for TrendSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendSeries {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "revenue" => Ok(TrendSeries::Revenue),
            "orders" => Ok(TrendSeries::Orders),
            "visits" => Ok(TrendSeries::Visits),
            "views" => Ok(TrendSeries::Views),
            other => Err(CoreError::UnknownSeries(other.to_string())),
        }
    }
}
