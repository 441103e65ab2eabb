//! Portfolio valuation: ledger recomputation joined with live pricing.
//!
//! The service loads a user's raw transactions and groups, runs the pure
//! cost-basis recompute, resolves current prices for every held asset
//! concurrently, and aggregates positions. Pricing never fails (the resolver
//! is total), so valuation errors are storage or ledger errors only.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::db::Repository;
use crate::domain::{Decimal, PriceQuery, PriceSource, Symbol, Transaction, UserId};
use crate::ledger::{recompute, LedgerError, LedgerWarning};
use crate::resolver::PriceResolver;

/// Valuation failure. Pricing is absent here on purpose: the resolver
/// degrades to synthetic data instead of erroring.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One aggregated asset position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPosition {
    pub asset: Symbol,
    /// Net quantity across included transactions.
    pub quantity: Decimal,
    /// Total cost basis at effective purchase prices.
    pub cost_basis: Decimal,
    /// Per-unit price at which the position breaks even. None for a zero
    /// net quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakeven_price: Option<Decimal>,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub pnl: Decimal,
    /// Unrealized return as a percentage of cost basis. None when the basis
    /// is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_pct: Option<Decimal>,
    /// Which tier of the fallback chain priced this asset.
    pub price_source: PriceSource,
    /// Human-readable trust indicator for the price source.
    pub price_trust: &'static str,
}

/// Full portfolio valuation for one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub user: UserId,
    pub positions: Vec<AssetPosition>,
    pub total_cost_basis: Decimal,
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub warnings: Vec<LedgerWarning>,
}

/// Valuation service over a repository and a price resolver.
#[derive(Clone)]
pub struct PortfolioService {
    repo: Arc<Repository>,
    resolver: Arc<PriceResolver>,
}

impl PortfolioService {
    pub fn new(repo: Arc<Repository>, resolver: Arc<PriceResolver>) -> Self {
        Self { repo, resolver }
    }

    /// Value a user's portfolio at current prices.
    ///
    /// # Errors
    /// Returns an error when storage fails or the transaction set is
    /// structurally invalid (a member referencing a nonexistent group).
    pub async fn valuation(&self, user: &UserId) -> Result<PortfolioValuation, PortfolioError> {
        let transactions = self.repo.list_transactions(user).await?;
        let groups = self.repo.list_groups(user).await?;

        let output = recompute(&transactions, &groups)?;
        let holdings = aggregate_holdings(&output.transactions);

        let queries: Vec<PriceQuery> = holdings
            .keys()
            .map(|asset| PriceQuery::current(asset.clone()))
            .collect();
        let resolved = self.resolver.resolve_many(queries).await;

        let mut priced: BTreeMap<Symbol, (Decimal, PriceSource)> = BTreeMap::new();
        for result in resolved {
            let price = result
                .data
                .latest()
                .map(|p| p.price)
                .unwrap_or_else(Decimal::zero);
            priced.insert(result.symbol, (price, result.source));
        }

        let mut positions = Vec::with_capacity(holdings.len());
        let mut total_cost_basis = Decimal::zero();
        let mut total_value = Decimal::zero();

        for (asset, holding) in holdings {
            let (current_price, price_source) = priced
                .get(&asset)
                .copied()
                .unwrap_or((Decimal::zero(), PriceSource::Synthetic));

            let current_value = holding.quantity * current_price;
            let pnl = current_value - holding.cost_basis;

            let breakeven_price = if holding.quantity.is_zero() {
                None
            } else {
                Some(holding.cost_basis / holding.quantity)
            };
            let return_pct = if holding.cost_basis.is_zero() {
                None
            } else {
                Some(pnl / holding.cost_basis * Decimal::hundred())
            };

            total_cost_basis = total_cost_basis + holding.cost_basis;
            total_value = total_value + current_value;

            positions.push(AssetPosition {
                asset,
                quantity: holding.quantity,
                cost_basis: holding.cost_basis,
                breakeven_price,
                current_price,
                current_value,
                pnl,
                return_pct,
                price_source,
                price_trust: price_source.trust_label(),
            });
        }

        let total_pnl = total_value - total_cost_basis;

        Ok(PortfolioValuation {
            user: user.clone(),
            positions,
            total_cost_basis,
            total_value,
            total_pnl,
            warnings: output.warnings,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Holding {
    quantity: Decimal,
    cost_basis: Decimal,
}

/// Net quantity and cost basis per asset over included transactions.
/// Disposals reduce basis at their effective price, so a fully closed
/// position nets out of the portfolio.
fn aggregate_holdings(transactions: &[Transaction]) -> BTreeMap<Symbol, Holding> {
    let mut holdings: BTreeMap<Symbol, Holding> = BTreeMap::new();
    for txn in transactions {
        if !txn.include_in_portfolio() {
            continue;
        }
        let entry = holdings.entry(txn.asset.clone()).or_default();
        entry.quantity = entry.quantity + txn.quantity;
        entry.cost_basis = entry.cost_basis + txn.quantity * txn.effective_purchase_price();
    }
    holdings.retain(|_, h| !h.quantity.is_zero() || !h.cost_basis.is_zero());
    holdings
}
