//! seedcheck - Seeded-Fixture Verification Harness
//!
//! Generates a reference dataset, loads it into a throwaway Postgres
//! container, and checks store-side aggregates against answers computed in
//! memory.
//!
//! # Modules
//!
//! - [`generator`] - Reference data generation (faker names, sequential ids)
//! - [`provisioner`] - Ephemeral Postgres containers with guaranteed teardown
//! - [`store`] - Store query boundary and its Postgres implementation
//! - [`loader`] - Table creation and all-or-nothing batched load
//! - [`harness`] - Count and longest-name checks
//! - [`session`] - Session composition, memoized dataset, teardown
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod error;
pub mod generator;
pub mod harness;
pub mod loader;
pub mod logging;
pub mod models;
pub mod provisioner;
pub mod session;
pub mod store;

// Convenient re-exports at crate root
pub use config::{HarnessConfig, LogConfig};
pub use error::{HarnessError, Result};
pub use generator::{FakerNames, NameSource, generate};
pub use harness::{CheckReport, verify_count, verify_max_name};
pub use loader::{FixtureLoader, LoadedTable};
pub use models::{Record, ReferenceDataset, TableName, TieBreak};
pub use provisioner::{ConnectionDescriptor, EphemeralPostgres, StoreImage};
pub use session::{CheckOutcome, FixtureSession, SessionReport, run_session};
pub use store::{FixtureStore, PgStore};
