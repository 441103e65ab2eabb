//! Price query and result types shared by the resolver and its providers.

use serde::{Deserialize, Serialize};

use super::{Decimal, Symbol, TimeMs};

/// What kind of price data a caller is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// A daily historical series.
    History,
    /// A single current price point.
    Current,
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryMode::History => write!(f, "history"),
            QueryMode::Current => write!(f, "current"),
        }
    }
}

/// Immutable price request value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceQuery {
    pub symbol: Symbol,
    pub mode: QueryMode,
    /// Requested history depth in days. Ignored for Current mode.
    pub lookback_days: u32,
}

impl PriceQuery {
    /// Build a current-price query.
    pub fn current(symbol: Symbol) -> Self {
        PriceQuery {
            symbol,
            mode: QueryMode::Current,
            lookback_days: 1,
        }
    }

    /// Build a historical-series query.
    pub fn history(symbol: Symbol, lookback_days: u32) -> Self {
        PriceQuery {
            symbol,
            mode: QueryMode::History,
            lookback_days,
        }
    }
}

/// Which tier of the fallback chain produced a result.
///
/// Always populated on a `PriceResult` so callers can render a trust
/// indicator next to the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Authenticated exchange feed (Binance).
    Primary,
    /// Public aggregator (CoinGecko).
    Secondary,
    /// Public spot feed, current prices only (Coinbase).
    Tertiary,
    /// Deterministic offline generation; terminal fallback.
    Synthetic,
}

impl PriceSource {
    /// Human-readable trust label for the rendering layer.
    pub fn trust_label(&self) -> &'static str {
        match self {
            PriceSource::Primary => "live",
            PriceSource::Secondary => "public",
            PriceSource::Tertiary => "alternative",
            PriceSource::Synthetic => "backup",
        }
    }
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSource::Primary => write!(f, "primary"),
            PriceSource::Secondary => write!(f, "secondary"),
            PriceSource::Tertiary => write!(f, "tertiary"),
            PriceSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// A single dated close price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub time_ms: TimeMs,
    pub price: Decimal,
}

/// Payload of a resolved price: a point for Current mode, a series for
/// History mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceData {
    Point(PricePoint),
    Series(Vec<PricePoint>),
}

impl PriceData {
    /// The most recent price in the payload.
    pub fn latest(&self) -> Option<PricePoint> {
        match self {
            PriceData::Point(p) => Some(*p),
            PriceData::Series(points) => points.last().copied(),
        }
    }

    /// Series length (1 for a point).
    pub fn len(&self) -> usize {
        match self {
            PriceData::Point(_) => 1,
            PriceData::Series(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolved price answer. `source` is always populated, including for the
/// synthetic terminal stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResult {
    pub symbol: Symbol,
    pub source: PriceSource,
    pub data: PriceData,
    pub as_of: TimeMs,
}
