//! Repository layer for database operations.
//!
//! Split per domain: transaction operations in `transactions`, group
//! operations in `groups`. Persistence errors propagate to the caller
//! unmodified; only malformed numeric cells are tolerated (logged and
//! defaulted) so one bad row cannot take down a whole listing.

mod groups;
mod transactions;

use sqlx::sqlite::SqlitePool;

/// Repository for database operations.
pub struct Repository {
    pub(crate) pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}
