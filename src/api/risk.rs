use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::analytics::{risk_summary, RiskSummary};
use crate::domain::{PriceData, PriceQuery, PriceSource, Symbol};
use crate::error::AppError;

const DEFAULT_RISK_LOOKBACK_DAYS: u32 = 90;

#[derive(Debug, Deserialize)]
pub struct RiskQuery {
    pub symbol: String,
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskResponse {
    pub symbol: String,
    pub days: u32,
    /// Which tier of the fallback chain supplied the series the metrics are
    /// computed from.
    pub source: PriceSource,
    pub trust: &'static str,
    #[serde(flatten)]
    pub summary: RiskSummary,
}

pub async fn get_risk(
    Query(params): Query<RiskQuery>,
    State(state): State<AppState>,
) -> Result<Json<RiskResponse>, AppError> {
    let symbol = params.symbol.trim();
    if symbol.is_empty() {
        return Err(AppError::BadRequest("symbol must not be empty".to_string()));
    }
    let days = params.days.unwrap_or(DEFAULT_RISK_LOOKBACK_DAYS);
    if days == 0 {
        return Err(AppError::BadRequest("days must be at least 1".to_string()));
    }

    let result = state
        .resolver
        .resolve(&PriceQuery::history(Symbol::new(symbol), days))
        .await;

    let series = match &result.data {
        PriceData::Series(points) => points.as_slice(),
        PriceData::Point(point) => std::slice::from_ref(point),
    };
    let summary = risk_summary(series);

    Ok(Json(RiskResponse {
        symbol: result.symbol.to_string(),
        days,
        source: result.source,
        trust: result.source.trust_label(),
        summary,
    }))
}
