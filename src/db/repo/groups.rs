//! Restructuring group persistence operations.

use sqlx::Row;

use super::Repository;
use crate::domain::{GroupId, RestructureGroup, TimeMs, TransactionId, TransactionType, UserId};

impl Repository {
    /// Insert a restructuring group.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_group(&self, group: &RestructureGroup) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO restructure_groups (id, user, description, created_ms)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(group.id.as_str())
        .bind(group.user.as_str())
        .bind(group.description.as_deref())
        .bind(group.created_ms.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All groups for a user, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_groups(&self, user: &UserId) -> Result<Vec<RestructureGroup>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user, description, created_ms
            FROM restructure_groups
            WHERE user = ?
            ORDER BY created_ms ASC, id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                RestructureGroup::new(
                    GroupId::new(row.get("id")),
                    UserId::new(row.get("user")),
                    row.get("description"),
                    TimeMs::new(row.get("created_ms")),
                )
            })
            .collect())
    }

    /// Fetch one group by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_group(&self, id: &GroupId) -> Result<Option<RestructureGroup>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, user, description, created_ms
            FROM restructure_groups
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            RestructureGroup::new(
                GroupId::new(row.get("id")),
                UserId::new(row.get("user")),
                row.get("description"),
                TimeMs::new(row.get("created_ms")),
            )
        }))
    }

    /// Number of transactions referencing a group.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_group_members(&self, id: &GroupId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE restructure_group = ?")
                .bind(id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    /// Delete a group. Returns false when the id does not exist.
    ///
    /// Callers reject deletion while members remain; the foreign key also
    /// enforces it at the storage level.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete_group(&self, id: &GroupId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM restructure_groups WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stamp a set of transactions as members of a group, assigning each its
    /// restructuring role in one atomic write. Rolls back when any member id
    /// is missing.
    ///
    /// Returns the number of stamped members.
    ///
    /// # Errors
    /// Returns `sqlx::Error::RowNotFound` when a member id does not exist;
    /// any other storage error propagates unmodified.
    pub async fn assign_group_members(
        &self,
        group_id: &GroupId,
        members: &[(TransactionId, TransactionType)],
    ) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for (txn_id, txn_type) in members {
            let result = sqlx::query(
                r#"
                UPDATE transactions
                SET restructure_group = ?, txn_type = ?
                WHERE id = ?
                "#,
            )
            .bind(group_id.as_str())
            .bind(txn_type.as_str())
            .bind(txn_id.as_str())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
        }

        tx.commit().await?;
        Ok(members.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{Decimal, Symbol, Transaction};
    use tempfile::TempDir;

    async fn test_repo() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.unwrap();
        (temp_dir, Repository::new(pool))
    }

    fn sample_group(id: &str) -> RestructureGroup {
        RestructureGroup::new(
            GroupId::new(id.to_string()),
            UserId::new("user-1".to_string()),
            Some("BTC into ETH".to_string()),
            TimeMs::new(1000),
        )
    }

    fn sample_txn(id: &str, quantity: i64) -> Transaction {
        let quantity = Decimal::from_i64(quantity);
        Transaction::new(
            TransactionId::new(id.to_string()),
            UserId::new("user-1".to_string()),
            Symbol::new("BTC"),
            quantity,
            Decimal::from_i64(100),
            TimeMs::new(1000),
            TransactionType::infer_from_quantity(quantity),
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_list_and_get() {
        let (_guard, repo) = test_repo().await;
        repo.insert_group(&sample_group("g1")).await.unwrap();

        let groups = repo
            .list_groups(&UserId::new("user-1".to_string()))
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].description.as_deref(), Some("BTC into ETH"));

        let fetched = repo
            .get_group(&GroupId::new("g1".to_string()))
            .await
            .unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn test_assign_members_atomic() {
        let (_guard, repo) = test_repo().await;
        repo.insert_group(&sample_group("g1")).await.unwrap();
        repo.insert_transaction(&sample_txn("out", -1)).await.unwrap();

        let members = vec![
            (
                TransactionId::new("out".to_string()),
                TransactionType::RestructureOut,
            ),
            (
                TransactionId::new("ghost".to_string()),
                TransactionType::RestructureIn,
            ),
        ];
        assert!(repo
            .assign_group_members(&GroupId::new("g1".to_string()), &members)
            .await
            .is_err());

        // The existing member must be untouched after the rollback.
        let stored = repo
            .get_transaction(&TransactionId::new("out".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.restructure_group, None);
        assert_eq!(stored.txn_type, TransactionType::Sell);
    }

    #[tokio::test]
    async fn test_assign_members_stamps_role_and_group() {
        let (_guard, repo) = test_repo().await;
        repo.insert_group(&sample_group("g1")).await.unwrap();
        repo.insert_transaction(&sample_txn("out", -1)).await.unwrap();
        repo.insert_transaction(&sample_txn("in", 10)).await.unwrap();

        let members = vec![
            (
                TransactionId::new("out".to_string()),
                TransactionType::RestructureOut,
            ),
            (
                TransactionId::new("in".to_string()),
                TransactionType::RestructureIn,
            ),
        ];
        let stamped = repo
            .assign_group_members(&GroupId::new("g1".to_string()), &members)
            .await
            .unwrap();
        assert_eq!(stamped, 2);

        assert_eq!(
            repo.count_group_members(&GroupId::new("g1".to_string()))
                .await
                .unwrap(),
            2
        );

        let stored = repo
            .get_transaction(&TransactionId::new("in".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.restructure_group,
            Some(GroupId::new("g1".to_string()))
        );
        assert_eq!(stored.txn_type, TransactionType::RestructureIn);
    }

    #[tokio::test]
    async fn test_delete_group_without_members() {
        let (_guard, repo) = test_repo().await;
        repo.insert_group(&sample_group("g1")).await.unwrap();

        assert!(repo
            .delete_group(&GroupId::new("g1".to_string()))
            .await
            .unwrap());
        assert!(!repo
            .delete_group(&GroupId::new("g1".to_string()))
            .await
            .unwrap());
    }
}
