//! Binance provider: the authenticated primary tier.
//!
//! Only attempted when an API key is configured; without one every fetch
//! reports `Unavailable` and the resolver moves straight to the secondary
//! tier.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{symbols, PriceProvider, ProviderError};
use crate::domain::{Decimal, PriceData, PricePoint, PriceQuery, PriceSource, QueryMode, TimeMs};

/// Primary price source backed by the Binance REST API.
#[derive(Debug, Clone)]
pub struct BinanceProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BinanceProvider {
    /// Create a Binance provider. `api_key` of None leaves the provider
    /// configured but unavailable.
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Create with the public Binance API URL.
    pub fn default_url(api_key: Option<String>) -> Self {
        Self::new("https://api.binance.com".to_string(), api_key)
    }

    /// Whether credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json(&self, url: String) -> Result<serde_json::Value, ProviderError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let api_key = self.api_key.clone();

        retry(backoff, || {
            let url = url.clone();
            let api_key = api_key.clone();
            async move {
                let mut request = self.client.get(&url);
                if let Some(key) = &api_key {
                    request = request.header("X-MBX-APIKEY", key);
                }

                let response = request.send().await.map_err(|e| {
                    backoff::Error::transient(ProviderError::NetworkError(e.to_string()))
                })?;

                let status = response.status();
                if status == 429 {
                    return Err(backoff::Error::permanent(ProviderError::RateLimited));
                }
                if status == 401 || status == 403 {
                    return Err(backoff::Error::permanent(ProviderError::Unavailable(
                        format!("authentication rejected (HTTP {})", status.as_u16()),
                    )));
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
impl PriceProvider for BinanceProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Primary
    }

    fn supports(&self, _mode: QueryMode) -> bool {
        true
    }

    async fn fetch(&self, query: &PriceQuery) -> Result<PriceData, ProviderError> {
        if self.api_key.is_none() {
            return Err(ProviderError::Unavailable(
                "credentials not configured".to_string(),
            ));
        }

        let pair = symbols::binance_pair(&query.symbol);
        debug!(symbol = %query.symbol, pair = %pair, mode = %query.mode, "Fetching from Binance");

        match query.mode {
            QueryMode::Current => {
                let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, pair);
                let payload = self.get_json(url).await?;
                let point = parse_ticker(&payload)?;
                Ok(PriceData::Point(point))
            }
            QueryMode::History => {
                let url = format!(
                    "{}/api/v3/klines?symbol={}&interval=1d&limit={}",
                    self.base_url, pair, query.lookback_days
                );
                let payload = self.get_json(url).await?;
                let series = parse_klines(&payload)?;
                Ok(PriceData::Series(series))
            }
        }
    }
}

fn parse_ticker(payload: &serde_json::Value) -> Result<PricePoint, ProviderError> {
    let price_str = payload
        .get("price")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::ParseError("Missing price field".to_string()))?;

    let price = Decimal::from_str_canonical(price_str)
        .map_err(|e| ProviderError::ParseError(format!("Invalid price: {}", e)))?;

    Ok(PricePoint {
        time_ms: TimeMs::now(),
        price,
    })
}

fn parse_klines(payload: &serde_json::Value) -> Result<Vec<PricePoint>, ProviderError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| ProviderError::ParseError("Expected array response".to_string()))?;

    let mut series = Vec::with_capacity(rows.len());
    for row in rows {
        let fields = row
            .as_array()
            .ok_or_else(|| ProviderError::ParseError("Expected kline array".to_string()))?;

        let open_time = fields
            .first()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ProviderError::ParseError("Missing kline open time".to_string()))?;

        // Index 4 is the close price in the kline layout.
        let close_str = fields
            .get(4)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::ParseError("Missing kline close".to_string()))?;
        let close = Decimal::from_str_canonical(close_str)
            .map_err(|e| ProviderError::ParseError(format!("Invalid close: {}", e)))?;

        series.push(PricePoint {
            time_ms: TimeMs::new(open_time),
            price: close,
        });
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Symbol;

    #[test]
    fn test_parse_ticker_valid() {
        let payload = serde_json::json!({"symbol": "BTCUSDT", "price": "50000.00"});
        let point = parse_ticker(&payload).unwrap();
        assert_eq!(point.price, Decimal::from_i64(50000));
    }

    #[test]
    fn test_parse_ticker_missing_price() {
        let payload = serde_json::json!({"symbol": "BTCUSDT"});
        assert!(matches!(
            parse_ticker(&payload),
            Err(ProviderError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_klines_valid() {
        let payload = serde_json::json!([
            [1000, "100", "110", "90", "105", "12.5", 86401000],
            [86401000, "105", "120", "100", "110", "9.1", 172801000]
        ]);
        let series = parse_klines(&payload).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time_ms, TimeMs::new(1000));
        assert_eq!(series[1].price, Decimal::from_i64(110));
    }

    #[tokio::test]
    async fn test_fetch_without_credentials_is_unavailable() {
        let provider = BinanceProvider::new("http://example.invalid".to_string(), None);
        let query = PriceQuery::current(Symbol::new("BTC"));
        let err = provider.fetch(&query).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[test]
    fn test_empty_api_key_treated_as_absent() {
        let provider =
            BinanceProvider::new("http://example.invalid".to_string(), Some(String::new()));
        assert!(!provider.has_credentials());
    }
}
