use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::transactions::parse_user;
use super::AppState;
use crate::error::AppError;
use crate::portfolio::PortfolioValuation;

#[derive(Debug, Deserialize)]
pub struct PortfolioQuery {
    pub user: String,
}

pub async fn get_portfolio(
    Query(params): Query<PortfolioQuery>,
    State(state): State<AppState>,
) -> Result<Json<PortfolioValuation>, AppError> {
    let user = parse_user(&params.user)?;
    let valuation = state.portfolio.valuation(&user).await?;
    Ok(Json(valuation))
}
