//! Transaction persistence operations.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use super::Repository;
use crate::domain::{
    Decimal, GroupId, Symbol, TimeMs, Transaction, TransactionId, TransactionType, UserId,
};

impl Repository {
    /// Insert a transaction. Derived cost-basis fields are not persisted.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate id).
    pub async fn insert_transaction(&self, txn: &Transaction) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user, asset, quantity, price, time_ms, txn_type,
                restructure_group, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(txn.id.as_str())
        .bind(txn.user.as_str())
        .bind(txn.asset.as_str())
        .bind(txn.quantity.to_canonical_string())
        .bind(txn.price.to_canonical_string())
        .bind(txn.time_ms.as_i64())
        .bind(txn.txn_type.as_str())
        .bind(txn.restructure_group.as_ref().map(|g| g.as_str()))
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert multiple transactions atomically. Used by CSV import.
    ///
    /// Returns the number of inserted rows.
    ///
    /// # Errors
    /// Returns an error if any insert fails; nothing is committed in that
    /// case.
    pub async fn insert_transactions_batch(
        &self,
        txns: &[Transaction],
    ) -> Result<usize, sqlx::Error> {
        if txns.is_empty() {
            return Ok(0);
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for txn in txns {
            sqlx::query(
                r#"
                INSERT INTO transactions (
                    id, user, asset, quantity, price, time_ms, txn_type,
                    restructure_group, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(txn.id.as_str())
            .bind(txn.user.as_str())
            .bind(txn.asset.as_str())
            .bind(txn.quantity.to_canonical_string())
            .bind(txn.price.to_canonical_string())
            .bind(txn.time_ms.as_i64())
            .bind(txn.txn_type.as_str())
            .bind(txn.restructure_group.as_ref().map(|g| g.as_str()))
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(txns.len())
    }

    /// All transactions for a user, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_transactions(&self, user: &UserId) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user, asset, quantity, price, time_ms, txn_type,
                   restructure_group
            FROM transactions
            WHERE user = ?
            ORDER BY time_ms ASC, id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_transaction).collect())
    }

    /// Fetch one transaction by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, user, asset, quantity, price, time_ms, txn_type,
                   restructure_group
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_transaction))
    }

    /// Update the editable fields of a transaction. Returns false when the
    /// id does not exist.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn update_transaction(&self, txn: &Transaction) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET asset = ?, quantity = ?, price = ?, time_ms = ?, txn_type = ?,
                restructure_group = ?
            WHERE id = ?
            "#,
        )
        .bind(txn.asset.as_str())
        .bind(txn.quantity.to_canonical_string())
        .bind(txn.price.to_canonical_string())
        .bind(txn.time_ms.as_i64())
        .bind(txn.txn_type.as_str())
        .bind(txn.restructure_group.as_ref().map(|g| g.as_str()))
        .bind(txn.id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a transaction. Returns false when the id does not exist.
    ///
    /// Callers enforce the grouped-transaction rule (grouped rows must be
    /// unlinked first) before reaching this.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete_transaction(&self, id: &TransactionId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clear a transaction's group link and reclassify it from its quantity
    /// sign. Returns the updated transaction, or None when the id does not
    /// exist.
    ///
    /// # Errors
    /// Returns an error if the read or write fails.
    pub async fn unlink_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let Some(mut txn) = self.get_transaction(id).await? else {
            return Ok(None);
        };

        txn.restructure_group = None;
        txn.txn_type = TransactionType::infer_from_quantity(txn.quantity);
        txn.adjusted_purchase_price = None;
        txn.cost_basis_transferred = None;

        sqlx::query(
            r#"
            UPDATE transactions
            SET restructure_group = NULL, txn_type = ?
            WHERE id = ?
            "#,
        )
        .bind(txn.txn_type.as_str())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(Some(txn))
    }
}

fn row_to_transaction(row: &SqliteRow) -> Transaction {
    let id: String = row.get("id");
    let quantity_str: String = row.get("quantity");
    let price_str: String = row.get("price");
    let type_str: String = row.get("txn_type");
    let group: Option<String> = row.get("restructure_group");

    let quantity = Decimal::from_str_canonical(&quantity_str).unwrap_or_else(|e| {
        warn!(id = %id, quantity = %quantity_str, error = %e, "failed to parse quantity, using default");
        Decimal::zero()
    });
    let price = Decimal::from_str_canonical(&price_str).unwrap_or_else(|e| {
        warn!(id = %id, price = %price_str, error = %e, "failed to parse price, using default");
        Decimal::zero()
    });
    let txn_type = type_str.parse().unwrap_or_else(|e| {
        warn!(id = %id, txn_type = %type_str, error = %e, "unknown stored transaction type, inferring from quantity");
        TransactionType::infer_from_quantity(quantity)
    });

    Transaction::new(
        TransactionId::new(id),
        UserId::new(row.get("user")),
        Symbol::new(row.get::<String, _>("asset").as_str()),
        quantity,
        price,
        TimeMs::new(row.get("time_ms")),
        txn_type,
        group.map(GroupId::new),
    )
}
