use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub binance_api_url: String,
    pub binance_api_key: Option<String>,
    pub coingecko_api_url: String,
    pub coinbase_api_url: String,
    pub current_ttl_secs: u64,
    pub history_ttl_secs: u64,
    pub provider_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub default_lookback_days: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let binance_api_url = env_map
            .get("BINANCE_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.binance.com".to_string());

        // Empty means unset: the primary provider reports itself unavailable
        // rather than sending a blank key upstream.
        let binance_api_key = env_map
            .get("BINANCE_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let coingecko_api_url = env_map
            .get("COINGECKO_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.coingecko.com".to_string());

        let coinbase_api_url = env_map
            .get("COINBASE_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.coinbase.com".to_string());

        let current_ttl_secs = parse_u64(&env_map, "PRICE_CACHE_TTL_SECS", 60)?;
        let history_ttl_secs = parse_u64(&env_map, "HISTORY_CACHE_TTL_SECS", 3600)?;
        let provider_timeout_secs = parse_u64(&env_map, "PROVIDER_TIMEOUT_SECS", 10)?;

        let max_concurrent_fetches = env_map
            .get("MAX_CONCURRENT_FETCHES")
            .map(|s| s.as_str())
            .unwrap_or("4")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_CONCURRENT_FETCHES".to_string(),
                    "must be a valid usize".to_string(),
                )
            })?;

        let default_lookback_days = env_map
            .get("DEFAULT_LOOKBACK_DAYS")
            .map(|s| s.as_str())
            .unwrap_or("365")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DEFAULT_LOOKBACK_DAYS".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            binance_api_url,
            binance_api_key,
            coingecko_api_url,
            coinbase_api_url,
            current_ttl_secs,
            history_ttl_secs,
            provider_timeout_secs,
            max_concurrent_fetches,
            default_lookback_days,
        })
    }
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(s) => s.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string())
        }),
    }
}
