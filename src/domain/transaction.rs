//! Portfolio transaction type and its classification enum.

use serde::{Deserialize, Serialize};

use super::{Decimal, GroupId, Symbol, TimeMs, TransactionId, UserId};

/// Classification of a portfolio transaction.
///
/// The type is set exactly once at creation (inferred from the quantity sign
/// when not given) and changed only through explicit classification
/// operations, never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Buy,
    Sell,
    /// Position sold during a restructuring; excluded from portfolio value,
    /// its cost basis flows to the linked RestructureIn members.
    RestructureOut,
    /// Position bought with restructuring proceeds; carries an adjusted
    /// purchase price derived from the linked RestructureOut members.
    RestructureIn,
    Transfer,
    /// Manually excluded from portfolio value.
    Exclude,
}

impl TransactionType {
    /// Default classification from the quantity sign. Applied only when a
    /// transaction arrives without an explicit type.
    pub fn infer_from_quantity(quantity: Decimal) -> Self {
        if quantity.is_negative() {
            TransactionType::Sell
        } else {
            TransactionType::Buy
        }
    }

    /// Whether transactions of this type count toward current portfolio
    /// value. False exactly for RestructureOut and Exclude.
    pub fn includes_in_portfolio(&self) -> bool {
        !matches!(
            self,
            TransactionType::RestructureOut | TransactionType::Exclude
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "buy",
            TransactionType::Sell => "sell",
            TransactionType::RestructureOut => "restructure_out",
            TransactionType::RestructureIn => "restructure_in",
            TransactionType::Transfer => "transfer",
            TransactionType::Exclude => "exclude",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TransactionType::Buy),
            "sell" => Ok(TransactionType::Sell),
            "restructure_out" => Ok(TransactionType::RestructureOut),
            "restructure_in" => Ok(TransactionType::RestructureIn),
            "transfer" => Ok(TransactionType::Transfer),
            "exclude" => Ok(TransactionType::Exclude),
            other => Err(UnknownTransactionType(other.to_string())),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for an unrecognized transaction type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction type: {0}")]
pub struct UnknownTransactionType(pub String);

/// A single portfolio transaction.
///
/// `adjusted_purchase_price` and `cost_basis_transferred` are derived fields
/// populated by the ledger recompute; they are never persisted as inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user: UserId,
    pub asset: Symbol,
    /// Signed quantity: positive for acquisitions, negative for disposals.
    pub quantity: Decimal,
    /// Stated per-unit price at the time of the transaction.
    pub price: Decimal,
    pub time_ms: TimeMs,
    pub txn_type: TransactionType,
    pub restructure_group: Option<GroupId>,
    /// Per-unit price after cost-basis transfer, when this transaction is a
    /// grouped RestructureIn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_purchase_price: Option<Decimal>,
    /// Total cost basis moved onto this transaction by its group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_basis_transferred: Option<Decimal>,
}

impl Transaction {
    /// Create a transaction with derived fields cleared.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TransactionId,
        user: UserId,
        asset: Symbol,
        quantity: Decimal,
        price: Decimal,
        time_ms: TimeMs,
        txn_type: TransactionType,
        restructure_group: Option<GroupId>,
    ) -> Self {
        Transaction {
            id,
            user,
            asset,
            quantity,
            price,
            time_ms,
            txn_type,
            restructure_group,
            adjusted_purchase_price: None,
            cost_basis_transferred: None,
        }
    }

    /// Whether this transaction counts toward current portfolio value.
    pub fn include_in_portfolio(&self) -> bool {
        self.txn_type.includes_in_portfolio()
    }

    /// The per-unit purchase price used by breakeven and return metrics:
    /// the adjusted price when a cost-basis transfer applies, otherwise the
    /// stated price.
    pub fn effective_purchase_price(&self) -> Decimal {
        self.adjusted_purchase_price.unwrap_or(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_infer_type_from_quantity_sign() {
        assert_eq!(
            TransactionType::infer_from_quantity(Decimal::from_i64(2)),
            TransactionType::Buy
        );
        assert_eq!(
            TransactionType::infer_from_quantity(Decimal::from_i64(-2)),
            TransactionType::Sell
        );
        // Zero quantity defaults to Buy rather than guessing a disposal.
        assert_eq!(
            TransactionType::infer_from_quantity(Decimal::zero()),
            TransactionType::Buy
        );
    }

    #[test]
    fn test_include_in_portfolio_rule() {
        assert!(TransactionType::Buy.includes_in_portfolio());
        assert!(TransactionType::Sell.includes_in_portfolio());
        assert!(TransactionType::RestructureIn.includes_in_portfolio());
        assert!(TransactionType::Transfer.includes_in_portfolio());
        assert!(!TransactionType::RestructureOut.includes_in_portfolio());
        assert!(!TransactionType::Exclude.includes_in_portfolio());
    }

    #[test]
    fn test_type_string_roundtrip() {
        for t in [
            TransactionType::Buy,
            TransactionType::Sell,
            TransactionType::RestructureOut,
            TransactionType::RestructureIn,
            TransactionType::Transfer,
            TransactionType::Exclude,
        ] {
            assert_eq!(TransactionType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(TransactionType::from_str("airdrop").is_err());
    }

    #[test]
    fn test_effective_price_falls_back_to_stated() {
        let mut txn = Transaction::new(
            TransactionId::new("t1".to_string()),
            UserId::new("u1".to_string()),
            Symbol::new("BTC"),
            Decimal::from_i64(1),
            Decimal::from_i64(30000),
            TimeMs::new(0),
            TransactionType::Buy,
            None,
        );
        assert_eq!(txn.effective_purchase_price(), Decimal::from_i64(30000));

        txn.adjusted_purchase_price = Some(Decimal::from_i64(25000));
        assert_eq!(txn.effective_purchase_price(), Decimal::from_i64(25000));
    }
}
