//! Fixture Session
//!
//! Composes the pieces for one test session:
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌──────────┐   ┌───────────┐
//! │ Provisioner │──▶│   Loader   │──▶│  Store   │──▶│  Harness  │
//! │ (container) │   │ (tx batch) │   │ (table)  │   │ (checks)  │
//! └─────────────┘   └────────────┘   └──────────┘   └───────────┘
//!                         ▲                               ▲
//!                         └──────── ReferenceDataset ─────┘
//! ```
//!
//! The dataset is generated once and shared by every check. The store table
//! is written once by the loader and only read afterwards. [`FixtureSession::close`]
//! is the teardown point; dropping the session also releases the container.

use once_cell::sync::OnceCell;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::generator::{FakerNames, generate};
use crate::harness::{self, CHECK_COUNT, CHECK_MAX_NAME, CheckReport};
use crate::loader::{FixtureLoader, LoadedTable};
use crate::models::{ReferenceDataset, TableName};
use crate::provisioner::{ConnectionDescriptor, EphemeralPostgres};
use crate::store::{FixtureStore, PgStore};

/// Result of one check within a session.
#[derive(Debug)]
pub struct CheckOutcome {
    pub check: &'static str,
    pub result: Result<CheckReport>,
}

#[derive(Debug, Default)]
pub struct SessionReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl SessionReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &HarnessError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.check, e)))
    }
}

pub struct FixtureSession<S: FixtureStore> {
    config: HarnessConfig,
    table: TableName,
    dataset: OnceCell<ReferenceDataset>,
    loaded: Option<LoadedTable>,
    // Field order matters: the store's pool must go before the container.
    store: S,
    container: Option<EphemeralPostgres>,
}

impl FixtureSession<PgStore> {
    /// Provision a fresh Postgres container, then generate and load the
    /// reference dataset into it.
    pub async fn start(config: HarnessConfig) -> Result<Self> {
        config.validate()?;

        let container =
            EphemeralPostgres::acquire(&config.image, config.readiness_timeout()).await?;
        Self::on_container(config, container).await
    }

    /// Generate and load into an already-running container. The session
    /// takes ownership of `container`; it is released if setup fails.
    pub async fn on_container(config: HarnessConfig, container: EphemeralPostgres) -> Result<Self> {
        if let Err(e) = config.validate() {
            release_quietly(container).await;
            return Err(e);
        }
        let store = match PgStore::connect(container.descriptor(), config.max_connections).await {
            Ok(store) => store,
            Err(e) => {
                release_quietly(container).await;
                return Err(e);
            }
        };

        let mut session = Self::new(config, store)?;
        session.container = Some(container);

        if let Err(e) = session.load().await {
            tracing::error!("Fixture setup failed: {}", e);
            if let Err(close_err) = session.close().await {
                tracing::warn!("Container cleanup failed: {}", close_err);
            }
            return Err(e);
        }
        Ok(session)
    }
}

impl<S: FixtureStore> FixtureSession<S> {
    /// Run a session against an already-reachable store.
    pub async fn with_store(config: HarnessConfig, store: S) -> Result<Self> {
        config.validate()?;
        let mut session = Self::new(config, store)?;
        session.load().await?;
        Ok(session)
    }

    fn new(config: HarnessConfig, store: S) -> Result<Self> {
        let table = config.table()?;
        Ok(Self {
            config,
            table,
            dataset: OnceCell::new(),
            loaded: None,
            store,
            container: None,
        })
    }

    async fn load(&mut self) -> Result<()> {
        let loader = FixtureLoader::new(self.config.batch_size)?;
        let loaded = loader
            .load(self.dataset()?, &self.store, &self.table)
            .await?;
        self.loaded = Some(loaded);
        Ok(())
    }

    /// The session's reference dataset, generated on first use.
    pub fn dataset(&self) -> Result<&ReferenceDataset> {
        self.dataset.get_or_try_init(|| {
            let mut names = FakerNames::from_seed_option(self.config.seed);
            generate(self.config.record_count, &mut names)
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn loaded(&self) -> Option<&LoadedTable> {
        self.loaded.as_ref()
    }

    /// `None` when the session was built over an external store.
    pub fn descriptor(&self) -> Option<&ConnectionDescriptor> {
        self.container.as_ref().map(|c| c.descriptor())
    }

    pub async fn verify_count(&self) -> Result<CheckReport> {
        harness::verify_count(self.dataset()?, &self.store, &self.table).await
    }

    pub async fn verify_max_name(&self) -> Result<CheckReport> {
        harness::verify_max_name(
            self.dataset()?,
            &self.store,
            &self.table,
            self.config.tie_break,
        )
        .await
    }

    /// Run every check; one failing check does not stop the others.
    pub async fn run_checks(&self) -> SessionReport {
        let outcomes = vec![
            CheckOutcome {
                check: CHECK_COUNT,
                result: self.verify_count().await,
            },
            CheckOutcome {
                check: CHECK_MAX_NAME,
                result: self.verify_max_name().await,
            },
        ];

        for outcome in &outcomes {
            match &outcome.result {
                Ok(_) => tracing::info!("{} ... ok", outcome.check),
                Err(e) => tracing::error!("{} ... FAILED: {}", outcome.check, e),
            }
        }
        SessionReport { outcomes }
    }

    /// Session teardown: close the store client, then remove the container.
    pub async fn close(mut self) -> Result<()> {
        self.store.close().await;
        match self.container.take() {
            Some(container) => container.release().await,
            None => Ok(()),
        }
    }
}

async fn release_quietly(container: EphemeralPostgres) {
    if let Err(e) = container.release().await {
        tracing::warn!("Container cleanup failed: {}", e);
    }
}

/// Provision, load, check, tear down. Teardown runs whatever the checks
/// report; setup errors are returned after cleanup.
pub async fn run_session(config: HarnessConfig) -> Result<SessionReport> {
    let session = FixtureSession::start(config).await?;
    let report = session.run_checks().await;
    if let Err(e) = session.close().await {
        tracing::warn!("Session teardown failed: {}", e);
    }
    Ok(report)
}
