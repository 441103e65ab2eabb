pub mod groups;
pub mod health;
pub mod portfolio;
pub mod prices;
pub mod risk;
pub mod transactions;

use crate::config::Config;
use crate::db::Repository;
use crate::portfolio::PortfolioService;
use crate::resolver::PriceResolver;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub resolver: Arc<PriceResolver>,
    pub portfolio: PortfolioService,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, resolver: Arc<PriceResolver>, config: Config) -> Self {
        let portfolio = PortfolioService::new(repo.clone(), resolver.clone());
        Self {
            repo,
            resolver,
            portfolio,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/prices/current", get(prices::get_current_prices))
        .route("/v1/prices/history", get(prices::get_price_history))
        .route(
            "/v1/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/v1/transactions/import",
            post(transactions::import_transactions),
        )
        .route(
            "/v1/transactions/:id",
            axum::routing::put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route(
            "/v1/transactions/:id/unlink",
            post(transactions::unlink_transaction),
        )
        .route(
            "/v1/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route("/v1/groups/:id", axum::routing::delete(groups::delete_group))
        .route("/v1/portfolio", get(portfolio::get_portfolio))
        .route("/v1/risk", get(risk::get_risk))
        .layer(cors)
        .with_state(state)
}
