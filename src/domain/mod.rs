//! Domain types for the portfolio dashboard backend.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, UserId, Symbol, TransactionId, GroupId
//! - Price query/result types with the source trust tag
//! - Transaction and RestructureGroup ledger types

pub mod decimal;
pub mod group;
pub mod price;
pub mod primitives;
pub mod transaction;

pub use decimal::Decimal;
pub use group::RestructureGroup;
pub use price::{PriceData, PricePoint, PriceQuery, PriceResult, PriceSource, QueryMode};
pub use primitives::{GroupId, Symbol, TimeMs, TransactionId, UserId};
pub use transaction::{Transaction, TransactionType, UnknownTransactionType};
