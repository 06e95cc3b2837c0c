use thiserror::Error;

/// Every failure the harness can report.
///
/// All variants are fatal to the check that raised them. Nothing is retried
/// internally; the session reporter records the failure and still tears the
/// store down.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("Schema conflict: table '{0}' already exists")]
    SchemaConflict(String),

    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Query failure: {0}")]
    QueryFailure(String),

    #[error("Assertion failed in {check}: expected {expected}, actual {actual}")]
    AssertionFailure {
        check: &'static str,
        expected: String,
        actual: String,
    },
}

impl HarnessError {
    /// True when the store answered but disagreed with the reference data.
    pub fn is_assertion(&self) -> bool {
        matches!(self, HarnessError::AssertionFailure { .. })
    }

    pub(crate) fn load(context: &str, e: impl std::fmt::Display) -> Self {
        HarnessError::LoadFailed(format!("{}: {}", context, e))
    }

    pub(crate) fn query(context: &str, e: impl std::fmt::Display) -> Self {
        HarnessError::QueryFailure(format!("{}: {}", context, e))
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
