//! Store query boundary
//!
//! [`FixtureStore`] is the only way the loader and harness talk to a backing
//! store. [`PgStore`] implements it over a `sqlx` Postgres pool.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Row};

use crate::error::{HarnessError, Result};
use crate::models::{Record, TableName, TieBreak};
use crate::provisioner::ConnectionDescriptor;

/// Postgres SQLSTATE for `duplicate_table`.
const DUPLICATE_TABLE: &str = "42P07";

/// Operations the harness needs from a backing store.
#[async_trait]
pub trait FixtureStore: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Create `table` with the record shape (`id` primary key, `name` text).
    ///
    /// Fails with [`HarnessError::SchemaConflict`] if the table exists.
    async fn create_table(&self, table: &TableName) -> Result<()>;

    /// Write every record, `batch_size` rows per statement.
    ///
    /// All-or-nothing: on error no record is visible to later readers.
    /// Returns the number of rows written.
    async fn insert_all(
        &self,
        table: &TableName,
        records: &[Record],
        batch_size: usize,
    ) -> Result<u64>;

    /// `SELECT count(*)`. `None` means the store returned no row at all.
    async fn count_rows(&self, table: &TableName) -> Result<Option<i64>>;

    /// Rows whose name length equals the table's maximum name length,
    /// ordered according to `tie_break`.
    async fn longest_names(&self, table: &TableName, tie_break: TieBreak) -> Result<Vec<Record>>;

    /// Release client-side resources (pools, sockets).
    async fn close(&self) {}
}

fn tie_break_order(tie_break: TieBreak) -> &'static str {
    match tie_break {
        TieBreak::FirstOccurrence | TieBreak::LengthOnly => "ORDER BY id",
        TieBreak::Lexicographic => "ORDER BY name COLLATE \"C\", id",
    }
}

/// PostgreSQL fixture store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool against a provisioned instance.
    pub async fn connect(descriptor: &ConnectionDescriptor, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(descriptor.as_str())
            .await
            .map_err(|e| {
                HarnessError::ProvisioningFailed(format!("cannot connect to store: {}", e))
            })?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| HarnessError::query("health check", e))?;
        Ok(())
    }
}

#[async_trait]
impl FixtureStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn create_table(&self, table: &TableName) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE {} (id BIGINT PRIMARY KEY, name TEXT NOT NULL)",
            table.quoted()
        );
        match sqlx::query(&ddl).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(DUPLICATE_TABLE) => {
                Err(HarnessError::SchemaConflict(table.to_string()))
            }
            Err(e) => Err(HarnessError::load("create table", e)),
        }
    }

    async fn insert_all(
        &self,
        table: &TableName,
        records: &[Record],
        batch_size: usize,
    ) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HarnessError::load("begin transaction", e))?;

        let mut written = 0u64;
        for chunk in records.chunks(batch_size.max(1)) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} (id, name) ", table.quoted()));
            qb.push_values(chunk, |mut row, record| {
                row.push_bind(record.id).push_bind(record.name.clone());
            });

            // Dropping `tx` on error rolls the whole load back.
            let result = qb
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| HarnessError::load("insert batch", e))?;
            written += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| HarnessError::load("commit", e))?;
        Ok(written)
    }

    async fn count_rows(&self, table: &TableName) -> Result<Option<i64>> {
        let sql = format!("SELECT count(*) FROM {}", table.quoted());
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| HarnessError::query("count rows", e))?;

        row.map(|r| r.try_get::<i64, _>(0))
            .transpose()
            .map_err(|e| HarnessError::query("decode count", e))
    }

    async fn longest_names(&self, table: &TableName, tie_break: TieBreak) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT id, name FROM {t} WHERE length(name) = (SELECT max(length(name)) FROM {t}) {order}",
            t = table.quoted(),
            order = tie_break_order(tie_break),
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HarnessError::query("longest names", e))?;

        rows.iter()
            .map(|row| {
                Ok(Record {
                    id: row
                        .try_get("id")
                        .map_err(|e| HarnessError::query("decode id", e))?,
                    name: row
                        .try_get("name")
                        .map_err(|e| HarnessError::query("decode name", e))?,
                })
            })
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockStore;
    use super::*;

    fn records(names: &[&str]) -> Vec<Record> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Record {
                id: i as i64,
                name: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_tie_break_order_clause() {
        assert_eq!(tie_break_order(TieBreak::FirstOccurrence), "ORDER BY id");
        assert_eq!(tie_break_order(TieBreak::LengthOnly), "ORDER BY id");
        assert!(tie_break_order(TieBreak::Lexicographic).starts_with("ORDER BY name"));
    }

    #[tokio::test]
    async fn test_mock_create_twice_conflicts() {
        let store = MockStore::new();
        let table = TableName::new("test_table").unwrap();
        store.create_table(&table).await.unwrap();
        let err = store.create_table(&table).await.unwrap_err();
        assert!(matches!(err, HarnessError::SchemaConflict(t) if t == "test_table"));
    }

    #[tokio::test]
    async fn test_mock_failed_batch_leaves_table_empty() {
        let store = MockStore::new();
        let table = TableName::new("t").unwrap();
        store.create_table(&table).await.unwrap();
        store.set_fail_on_batch(2);

        let err = store
            .insert_all(&table, &records(&["a", "b", "c", "d", "e"]), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::LoadFailed(_)));
        assert_eq!(store.row_count(&table), Some(0));
    }

    #[tokio::test]
    async fn test_mock_longest_names_returns_all_ties() {
        let store = MockStore::new();
        let table = TableName::new("t").unwrap();
        store.create_table(&table).await.unwrap();
        store
            .insert_all(&table, &records(&["Zed", "Amy", "Bo"]), 10)
            .await
            .unwrap();

        let first = store
            .longest_names(&table, TieBreak::FirstOccurrence)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "Zed");

        let lex = store
            .longest_names(&table, TieBreak::Lexicographic)
            .await
            .unwrap();
        assert_eq!(lex[0].name, "Amy");
    }
}
