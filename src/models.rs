//! Reference data types shared by the generator, loader and harness.

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Postgres truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

/// One generated row. `id` equals the record's position in its dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub name: String,
}

impl Record {
    /// Name length in characters, matching SQL `length()` on text.
    pub fn name_len(&self) -> usize {
        self.name.chars().count()
    }
}

/// How the longest-name check picks a winner when several names share the
/// maximum length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lowest id wins on both sides (dataset order / `ORDER BY id`).
    #[default]
    FirstOccurrence,
    /// Smallest name wins on both sides (`ORDER BY name, id`).
    Lexicographic,
    /// Only the maximum length is compared.
    LengthOnly,
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TieBreak::FirstOccurrence => write!(f, "first_occurrence"),
            TieBreak::Lexicographic => write!(f, "lexicographic"),
            TieBreak::LengthOnly => write!(f, "length_only"),
        }
    }
}

/// Ordered, non-empty sequence of records with ids `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDataset {
    records: Vec<Record>,
}

impl ReferenceDataset {
    /// Build a dataset from names, assigning sequential ids from 0.
    pub fn from_names<I>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let records: Vec<Record> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Record { id: i as i64, name })
            .collect();

        if records.is_empty() {
            return Err(HarnessError::InvalidConfiguration(
                "reference dataset must contain at least one record".to_string(),
            ));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// False for every constructed dataset.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// The in-memory answer to "which record has the longest name".
    pub fn longest_name(&self, tie_break: TieBreak) -> &Record {
        let mut best = &self.records[0];
        for record in &self.records[1..] {
            let longer = record.name_len() > best.name_len();
            let wins_tie = tie_break == TieBreak::Lexicographic
                && record.name_len() == best.name_len()
                && record.name < best.name;
            if longer || wins_tie {
                best = record;
            }
        }
        best
    }
}

impl<'a> IntoIterator for &'a ReferenceDataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A table name that is safe to splice into SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Accepts `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start || !valid_rest || name.len() > MAX_IDENTIFIER_LEN {
            return Err(HarnessError::InvalidConfiguration(format!(
                "table name '{}' is not a plain SQL identifier",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL statements.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
