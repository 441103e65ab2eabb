//! CoinGecko provider: the public secondary tier.
//!
//! Rate-limited upstream with a bounded history window: lookback is clamped
//! to [`HISTORY_CAP_DAYS`] regardless of what the caller asked for. Requires
//! a symbol-to-slug translation; unmapped symbols fail fast without a
//! network round trip so the resolver can fall through.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{symbols, PriceProvider, ProviderError};
use crate::domain::{Decimal, PriceData, PricePoint, PriceQuery, PriceSource, QueryMode, TimeMs};

/// Maximum history depth the free CoinGecko tier serves reliably.
pub const HISTORY_CAP_DAYS: u32 = 90;

/// Secondary price source backed by the public CoinGecko API.
#[derive(Debug, Clone)]
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Create with the public CoinGecko API URL.
    pub fn default_url() -> Self {
        Self::new("https://api.coingecko.com".to_string())
    }

    /// Requested lookback clamped to the provider's history cap.
    pub fn effective_lookback(requested_days: u32) -> u32 {
        requested_days.min(HISTORY_CAP_DAYS)
    }

    async fn get_json(&self, url: String) -> Result<serde_json::Value, ProviderError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        retry(backoff, || {
            let url = url.clone();
            async move {
                let response = self.client.get(&url).send().await.map_err(|e| {
                    backoff::Error::transient(ProviderError::NetworkError(e.to_string()))
                })?;

                let status = response.status();
                // 429 falls through to the next tier immediately; retrying a
                // rate-limited endpoint only digs the hole deeper.
                if status == 429 {
                    return Err(backoff::Error::permanent(ProviderError::RateLimited));
                }
                if status.is_server_error() {
                    return Err(backoff::Error::transient(ProviderError::HttpError {
                        status: status.as_u16(),
                        message: "Server error".to_string(),
                    }));
                }
                if !status.is_success() {
                    return Err(backoff::Error::permanent(ProviderError::HttpError {
                        status: status.as_u16(),
                        message: "Client error".to_string(),
                    }));
                }

                response.json::<serde_json::Value>().await.map_err(|e| {
                    backoff::Error::permanent(ProviderError::ParseError(e.to_string()))
                })
            }
        })
        .await
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Secondary
    }

    fn supports(&self, _mode: QueryMode) -> bool {
        true
    }

    async fn fetch(&self, query: &PriceQuery) -> Result<PriceData, ProviderError> {
        let id = symbols::coingecko_id(&query.symbol)
            .ok_or_else(|| ProviderError::UnknownSymbol(query.symbol.to_string()))?;

        debug!(symbol = %query.symbol, id = %id, mode = %query.mode, "Fetching from CoinGecko");

        match query.mode {
            QueryMode::Current => {
                let url = format!(
                    "{}/api/v3/simple/price?ids={}&vs_currencies=usd",
                    self.base_url, id
                );
                let payload = self.get_json(url).await?;
                let point = parse_simple_price(&payload, id)?;
                Ok(PriceData::Point(point))
            }
            QueryMode::History => {
                let days = Self::effective_lookback(query.lookback_days);
                let url = format!(
                    "{}/api/v3/coins/{}/market_chart?vs_currency=usd&days={}&interval=daily",
                    self.base_url, id, days
                );
                let payload = self.get_json(url).await?;
                let series = parse_market_chart(&payload, days)?;
                Ok(PriceData::Series(series))
            }
        }
    }
}

fn parse_simple_price(payload: &serde_json::Value, id: &str) -> Result<PricePoint, ProviderError> {
    let value = payload
        .get(id)
        .and_then(|v| v.get("usd"))
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ProviderError::ParseError(format!("Missing usd price for {}", id)))?;

    let price = Decimal::from_f64(value)
        .ok_or_else(|| ProviderError::ParseError(format!("Non-finite price for {}", id)))?;

    Ok(PricePoint {
        time_ms: TimeMs::now(),
        price,
    })
}

fn parse_market_chart(
    payload: &serde_json::Value,
    cap_days: u32,
) -> Result<Vec<PricePoint>, ProviderError> {
    let rows = payload
        .get("prices")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::ParseError("Missing prices field".to_string()))?;

    let mut series = Vec::with_capacity(rows.len());
    for row in rows {
        let pair = row
            .as_array()
            .ok_or_else(|| ProviderError::ParseError("Expected [time, price] pair".to_string()))?;

        let time_ms = pair
            .first()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ProviderError::ParseError("Missing timestamp".to_string()))?;
        let value = pair
            .get(1)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ProviderError::ParseError("Missing price".to_string()))?;
        let price = Decimal::from_f64(value)
            .ok_or_else(|| ProviderError::ParseError("Non-finite price".to_string()))?;

        series.push(PricePoint {
            time_ms: TimeMs::new(time_ms),
            price,
        });
    }

    // The daily endpoint can include a partial point for today; keep the
    // newest `cap_days` entries so the cap holds end to end.
    let cap = cap_days as usize;
    if series.len() > cap {
        series.drain(..series.len() - cap);
    }

    Ok(series)
}
