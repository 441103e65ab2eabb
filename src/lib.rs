pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod portfolio;
pub mod providers;
pub mod resolver;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, GroupId, PriceQuery, PriceResult, PriceSource, QueryMode, RestructureGroup, Symbol,
    TimeMs, Transaction, TransactionId, TransactionType, UserId,
};
pub use error::AppError;
pub use ledger::{recompute, LedgerError, LedgerWarning, RecomputeOutput};
pub use providers::{
    BinanceProvider, CoinbaseProvider, CoinGeckoProvider, MockProvider, PriceProvider,
    SyntheticSource,
};
pub use resolver::{PriceResolver, ResolverOptions};
