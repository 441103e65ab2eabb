//! Symbol translation tables for provider-specific identifiers.
//!
//! Exchange-style providers take a ticker pair that can be built
//! mechanically; CoinGecko requires an explicit slug, so unknown symbols
//! fail fast there and trigger fallback instead of a bad request upstream.

use crate::domain::{Decimal, Symbol};

/// Binance trading pair for a symbol (quoted in USDT).
pub fn binance_pair(symbol: &Symbol) -> String {
    format!("{}USDT", symbol.as_str())
}

/// Coinbase spot product identifier for a symbol (quoted in USD).
pub fn coinbase_product(symbol: &Symbol) -> String {
    format!("{}-USD", symbol.as_str())
}

/// CoinGecko API slug for a symbol. Returns None for unmapped symbols.
pub fn coingecko_id(symbol: &Symbol) -> Option<&'static str> {
    match symbol.as_str() {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "SOL" => Some("solana"),
        "BNB" => Some("binancecoin"),
        "XRP" => Some("ripple"),
        "ADA" => Some("cardano"),
        "DOGE" => Some("dogecoin"),
        "AVAX" => Some("avalanche-2"),
        "DOT" => Some("polkadot"),
        "LINK" => Some("chainlink"),
        "MATIC" => Some("matic-network"),
        "LTC" => Some("litecoin"),
        "BCH" => Some("bitcoin-cash"),
        "ATOM" => Some("cosmos"),
        "UNI" => Some("uniswap"),
        "XLM" => Some("stellar"),
        "ETC" => Some("ethereum-classic"),
        "NEAR" => Some("near"),
        "ALGO" => Some("algorand"),
        "FIL" => Some("filecoin"),
        "TRX" => Some("tron"),
        "ARB" => Some("arbitrum"),
        "OP" => Some("optimism"),
        _ => None,
    }
}

/// Default anchor price for synthetic generation when no live price has ever
/// been observed for the symbol. Rough order-of-magnitude values; synthetic
/// data is a terminal fallback, not a quote.
pub fn default_anchor_price(symbol: &Symbol) -> Decimal {
    let value = match symbol.as_str() {
        "BTC" => 50000,
        "ETH" => 3000,
        "BNB" => 500,
        "SOL" => 150,
        "LTC" | "BCH" => 100,
        "AVAX" | "LINK" | "DOT" | "ATOM" | "UNI" | "NEAR" | "FIL" | "ETC" => 20,
        _ => 1,
    };
    Decimal::from_i64(value)
}
