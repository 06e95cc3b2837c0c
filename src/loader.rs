//! Fixture Loader
//!
//! Creates the target table and writes the whole reference dataset into it.
//! Either every record becomes visible or the load fails with nothing
//! published.

use crate::error::{HarnessError, Result};
use crate::models::{ReferenceDataset, TableName};
use crate::store::FixtureStore;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Postgres allows 65535 bind parameters per statement, two per row.
pub const MAX_BATCH_SIZE: usize = 32_767;

/// Handle to a populated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTable {
    pub table: TableName,
    pub rows: u64,
}

#[derive(Debug, Clone)]
pub struct FixtureLoader {
    batch_size: usize,
}

impl Default for FixtureLoader {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl FixtureLoader {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(HarnessError::InvalidConfiguration(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, batch_size
            )));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Create `table` and write every record of `dataset` into it.
    ///
    /// # Errors
    /// - [`HarnessError::SchemaConflict`] if `table` already exists
    /// - [`HarnessError::LoadFailed`] on any write failure, or if the store
    ///   acknowledged fewer rows than the dataset holds
    pub async fn load<S>(
        &self,
        dataset: &ReferenceDataset,
        store: &S,
        table: &TableName,
    ) -> Result<LoadedTable>
    where
        S: FixtureStore + ?Sized,
    {
        tracing::info!(
            "Loading {} records into {}.{} (batch size {})",
            dataset.len(),
            store.name(),
            table,
            self.batch_size
        );

        store.create_table(table).await?;

        let rows = store
            .insert_all(table, dataset.records(), self.batch_size)
            .await?;
        if rows != dataset.len() as u64 {
            return Err(HarnessError::LoadFailed(format!(
                "store acknowledged {} of {} rows",
                rows,
                dataset.len()
            )));
        }

        tracing::info!("Loaded {} rows into {}", rows, table);
        Ok(LoadedTable {
            table: table.clone(),
            rows,
        })
    }
}
