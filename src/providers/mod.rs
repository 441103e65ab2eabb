//! Price provider abstraction: capability-tagged strategy objects forming
//! the resolver's ordered fallback chain.

use async_trait::async_trait;
use std::fmt;

use crate::domain::{PriceData, PriceQuery, PriceSource, QueryMode};

pub mod binance;
pub mod coinbase;
pub mod coingecko;
pub mod mock;
pub mod symbols;
pub mod synthetic;

pub use binance::BinanceProvider;
pub use coinbase::CoinbaseProvider;
pub use coingecko::CoinGeckoProvider;
pub use mock::MockProvider;
pub use synthetic::SyntheticSource;

/// A single upstream price source.
///
/// Implementations translate symbols to their own identifiers, handle
/// retry/backoff, and map HTTP failures onto `ProviderError` so the resolver
/// can degrade to the next tier. Adding a provider means implementing this
/// trait and inserting it into the chain; the resolver itself is unchanged.
#[async_trait]
pub trait PriceProvider: Send + Sync + fmt::Debug {
    /// Which fallback tier this provider occupies. Stamped onto results so
    /// callers can render a trust indicator.
    fn source(&self) -> PriceSource;

    /// Whether this provider can serve the given query mode at all.
    /// Unsupported modes are skipped by the resolver without an attempt.
    fn supports(&self, mode: QueryMode) -> bool;

    /// Fetch price data for a query.
    ///
    /// # Errors
    /// Any error here is recoverable from the resolver's point of view: it
    /// falls through to the next provider in the chain.
    async fn fetch(&self, query: &PriceQuery) -> Result<PriceData, ProviderError>;
}

/// Error type for provider fetch operations.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Provider cannot be used at all right now (e.g., credentials not
    /// configured).
    Unavailable(String),
    /// Network error (connection timeout, DNS failure).
    NetworkError(String),
    /// HTTP error other than rate limiting.
    HttpError { status: u16, message: String },
    /// Rate limit exceeded (HTTP 429); do not retry this provider.
    RateLimited,
    /// Symbol has no translation for this provider; fails fast without a
    /// network round trip.
    UnknownSymbol(String),
    /// Malformed or unexpected payload.
    ParseError(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            ProviderError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ProviderError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ProviderError::RateLimited => write!(f, "Rate limited"),
            ProviderError::UnknownSymbol(symbol) => {
                write!(f, "No symbol mapping for {}", symbol)
            }
            ProviderError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}
