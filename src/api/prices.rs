use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{PriceData, PriceQuery, Symbol};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CurrentPricesQuery {
    /// Comma-separated symbols, e.g. `BTC,ETH,SOL`.
    pub symbols: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPriceDto {
    pub symbol: String,
    pub price: crate::domain::Decimal,
    pub source: crate::domain::PriceSource,
    pub trust: &'static str,
    pub as_of: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPricesResponse {
    pub prices: Vec<CurrentPriceDto>,
}

pub async fn get_current_prices(
    Query(params): Query<CurrentPricesQuery>,
    State(state): State<AppState>,
) -> Result<Json<CurrentPricesResponse>, AppError> {
    let symbols: Vec<Symbol> = params
        .symbols
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Symbol::new)
        .collect();

    if symbols.is_empty() {
        return Err(AppError::BadRequest(
            "symbols must contain at least one symbol".to_string(),
        ));
    }

    let queries = symbols.into_iter().map(PriceQuery::current).collect();
    let results = state.resolver.resolve_many(queries).await;

    let mut prices: Vec<CurrentPriceDto> = results
        .into_iter()
        .filter_map(|result| {
            result.data.latest().map(|point| CurrentPriceDto {
                symbol: result.symbol.to_string(),
                price: point.price,
                source: result.source,
                trust: result.source.trust_label(),
                as_of: result.as_of.as_i64(),
            })
        })
        .collect();
    prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    Ok(Json(CurrentPricesResponse { prices }))
}

#[derive(Debug, Deserialize)]
pub struct PriceHistoryQuery {
    pub symbol: String,
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePointDto {
    pub time_ms: i64,
    pub price: crate::domain::Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryResponse {
    pub symbol: String,
    pub source: crate::domain::PriceSource,
    pub trust: &'static str,
    pub as_of: i64,
    pub series: Vec<PricePointDto>,
}

pub async fn get_price_history(
    Query(params): Query<PriceHistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<PriceHistoryResponse>, AppError> {
    let symbol = params.symbol.trim();
    if symbol.is_empty() {
        return Err(AppError::BadRequest("symbol must not be empty".to_string()));
    }
    let days = params.days.unwrap_or(state.config.default_lookback_days);
    if days == 0 {
        return Err(AppError::BadRequest("days must be at least 1".to_string()));
    }

    let result = state
        .resolver
        .resolve(&PriceQuery::history(Symbol::new(symbol), days))
        .await;

    let series = match result.data {
        PriceData::Series(points) => points,
        PriceData::Point(point) => vec![point],
    };

    Ok(Json(PriceHistoryResponse {
        symbol: result.symbol.to_string(),
        source: result.source,
        trust: result.source.trust_label(),
        as_of: result.as_of.as_i64(),
        series: series
            .into_iter()
            .map(|p| PricePointDto {
                time_ms: p.time_ms.as_i64(),
                price: p.price,
            })
            .collect(),
    }))
}
