//! Coinbase provider: the public tertiary tier.
//!
//! Serves spot (current) prices only; `supports(History)` is false, so the
//! resolver skips this tier entirely for series queries.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{symbols, PriceProvider, ProviderError};
use crate::domain::{Decimal, PriceData, PricePoint, PriceQuery, PriceSource, QueryMode, TimeMs};

/// Tertiary price source backed by the Coinbase spot price API.
#[derive(Debug, Clone)]
pub struct CoinbaseProvider {
    client: Client,
    base_url: String,
}

impl CoinbaseProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Create with the public Coinbase API URL.
    pub fn default_url() -> Self {
        Self::new("https://api.coinbase.com".to_string())
    }
}

#[async_trait]
impl PriceProvider for CoinbaseProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Tertiary
    }

    fn supports(&self, mode: QueryMode) -> bool {
        mode == QueryMode::Current
    }

    async fn fetch(&self, query: &PriceQuery) -> Result<PriceData, ProviderError> {
        let product = symbols::coinbase_product(&query.symbol);
        debug!(symbol = %query.symbol, product = %product, "Fetching spot price from Coinbase");

        let url = format!("{}/v2/prices/{}/spot", self.base_url, product);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::HttpError {
                status: status.as_u16(),
                message: "Spot price request failed".to_string(),
            });
        }

        let payload = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let point = parse_spot(&payload)?;
        Ok(PriceData::Point(point))
    }
}

fn parse_spot(payload: &serde_json::Value) -> Result<PricePoint, ProviderError> {
    let amount_str = payload
        .get("data")
        .and_then(|v| v.get("amount"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::ParseError("Missing data.amount field".to_string()))?;

    let price = Decimal::from_str_canonical(amount_str)
        .map_err(|e| ProviderError::ParseError(format!("Invalid amount: {}", e)))?;

    Ok(PricePoint {
        time_ms: TimeMs::now(),
        price,
    })
}
