//! Verification Harness
//!
//! Each check computes an answer from the reference dataset, asks the store
//! the same question, and fails with [`HarnessError::AssertionFailure`] when
//! the two disagree.

use crate::error::{HarnessError, Result};
use crate::models::{ReferenceDataset, TableName, TieBreak};
use crate::store::FixtureStore;

pub const CHECK_COUNT: &str = "verify_count";
pub const CHECK_MAX_NAME: &str = "verify_max_name";

/// A passed check with the values that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub check: &'static str,
    pub expected: String,
    pub actual: String,
}

/// Row count in the store must equal the dataset length.
pub async fn verify_count<S>(
    dataset: &ReferenceDataset,
    store: &S,
    table: &TableName,
) -> Result<CheckReport>
where
    S: FixtureStore + ?Sized,
{
    let expected = dataset.len() as i64;
    let actual = store.count_rows(table).await?.ok_or_else(|| {
        HarnessError::QueryFailure(
            "Something went wrong: database did not return any value".to_string(),
        )
    })?;

    if actual != expected {
        return Err(HarnessError::AssertionFailure {
            check: CHECK_COUNT,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    tracing::info!("All good, number of rows in a database: {}", actual);
    Ok(CheckReport {
        check: CHECK_COUNT,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// The longest name in the store must match the longest reference name.
///
/// Both sides resolve ties with `tie_break`; under
/// [`TieBreak::LengthOnly`] only the lengths are compared.
pub async fn verify_max_name<S>(
    dataset: &ReferenceDataset,
    store: &S,
    table: &TableName,
    tie_break: TieBreak,
) -> Result<CheckReport>
where
    S: FixtureStore + ?Sized,
{
    let expected = dataset.longest_name(tie_break);
    let ties = dataset
        .iter()
        .filter(|r| r.name_len() == expected.name_len())
        .count();
    if ties > 1 {
        tracing::warn!(
            "{} names share the maximum length {}, resolving with {}",
            ties,
            expected.name_len(),
            tie_break
        );
    }

    let rows = store.longest_names(table, tie_break).await?;
    let actual = rows.first().ok_or_else(|| {
        HarnessError::QueryFailure("store returned no rows for the longest name".to_string())
    })?;

    tracing::info!(
        "Max name in source: {}, and in db: {}",
        expected.name,
        actual.name
    );

    let (expected, actual) = match tie_break {
        TieBreak::LengthOnly => (
            expected.name_len().to_string(),
            actual.name_len().to_string(),
        ),
        TieBreak::FirstOccurrence | TieBreak::Lexicographic => {
            (expected.name.clone(), actual.name.clone())
        }
    };

    if expected != actual {
        return Err(HarnessError::AssertionFailure {
            check: CHECK_MAX_NAME,
            expected,
            actual,
        });
    }

    Ok(CheckReport {
        check: CHECK_MAX_NAME,
        expected,
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{FakerNames, generate};
    use crate::loader::FixtureLoader;
    use crate::store::mock::MockStore;

    fn table() -> TableName {
        TableName::new("test_table").unwrap()
    }

    async fn loaded(ds: &ReferenceDataset) -> MockStore {
        let store = MockStore::new();
        FixtureLoader::default()
            .load(ds, &store, &table())
            .await
            .unwrap();
        store
    }

    fn names(names: &[&str]) -> ReferenceDataset {
        ReferenceDataset::from_names(names.iter().map(|s| s.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_count_passes_then_fails_after_tamper() {
        let ds = generate(100, &mut FakerNames::seeded(11)).unwrap();
        let store = loaded(&ds).await;

        let report = verify_count(&ds, &store, &table()).await.unwrap();
        assert_eq!(report.expected, "100");
        assert_eq!(report.actual, "100");

        store.delete_row(&table(), 42);
        match verify_count(&ds, &store, &table()).await {
            Err(HarnessError::AssertionFailure {
                check,
                expected,
                actual,
            }) => {
                assert_eq!(check, CHECK_COUNT);
                assert_eq!(expected, "100");
                assert_eq!(actual, "99");
            }
            other => panic!("expected AssertionFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_count_is_idempotent() {
        let ds = generate(25, &mut FakerNames::seeded(5)).unwrap();
        let store = loaded(&ds).await;

        let first = verify_count(&ds, &store, &table()).await.unwrap();
        for _ in 0..3 {
            assert_eq!(verify_count(&ds, &store, &table()).await.unwrap(), first);
        }
        assert_eq!(store.query_calls(), 4);
    }

    #[tokio::test]
    async fn test_count_without_result_row_is_query_failure() {
        let ds = names(&["Ann"]);
        let store = loaded(&ds).await;
        store.set_count_returns_no_row(true);

        let err = verify_count(&ds, &store, &table()).await.unwrap_err();
        assert!(matches!(err, HarnessError::QueryFailure(_)));
    }

    #[tokio::test]
    async fn test_max_name_unique_longest() {
        // lengths [5, 5, 12, 5]
        let ds = names(&["Alice", "Bruce", "Christabelle", "Diana"]);
        let store = loaded(&ds).await;

        let report = verify_max_name(&ds, &store, &table(), TieBreak::FirstOccurrence)
            .await
            .unwrap();
        assert_eq!(report.expected, "Christabelle");
        assert_eq!(report.actual, "Christabelle");
    }

    #[tokio::test]
    async fn test_max_name_ties_resolve_identically_on_both_sides() {
        let ds = names(&["Zoe Quinn", "Amy Smith", "Bo"]);
        let store = loaded(&ds).await;

        for tie_break in [
            TieBreak::FirstOccurrence,
            TieBreak::Lexicographic,
            TieBreak::LengthOnly,
        ] {
            verify_max_name(&ds, &store, &table(), tie_break)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_max_name_mismatch_reports_both_names() {
        let ds = names(&["Alice", "Christabelle"]);
        let store = loaded(&ds).await;
        store.rename_row(&table(), 0, "Alexandria Longname");

        match verify_max_name(&ds, &store, &table(), TieBreak::FirstOccurrence).await {
            Err(HarnessError::AssertionFailure {
                check,
                expected,
                actual,
            }) => {
                assert_eq!(check, CHECK_MAX_NAME);
                assert_eq!(expected, "Christabelle");
                assert_eq!(actual, "Alexandria Longname");
            }
            other => panic!("expected AssertionFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_length_only_ignores_name_content() {
        let ds = names(&["Alice", "Christabelle"]);
        let store = loaded(&ds).await;
        store.rename_row(&table(), 1, "Maximilianos");

        let report = verify_max_name(&ds, &store, &table(), TieBreak::LengthOnly)
            .await
            .unwrap();
        assert_eq!(report.expected, "12");
        assert_eq!(report.actual, "12");
    }

    #[tokio::test]
    async fn test_max_name_on_empty_store_table_is_query_failure() {
        let ds = names(&["Alice"]);
        let store = MockStore::new();
        store.create_table(&table()).await.unwrap();

        let err = verify_max_name(&ds, &store, &table(), TieBreak::FirstOccurrence)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::QueryFailure(_)));
    }
}
