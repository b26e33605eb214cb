//! DMLGuard Runner - data-update task execution with pre-mutation backup.
//!
//! [`DataUpdateExecutor`] runs DML tasks. When a task's payload names a
//! backup database, [`PreUpdateBackup`] copies every affected table there
//! first, annotates the copies, and records an audit trail. Store, drivers,
//! DML transformation, schema sync and statement application are reached
//! through the traits in [`store`], [`driver`], [`schema`] and [`migration`].

pub mod audit;
pub mod backup;
pub mod clock;
pub mod config;
pub mod driver;
pub mod executor;
pub mod migration;
pub mod schema;
pub mod store;

pub use audit::AuditTrailEmitter;
pub use backup::{backup_prefix, BackedUpTable, BackupReport, BestEffortFailure, PreUpdateBackup};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::RunnerConfig;
pub use driver::{Driver, DriverFactory};
pub use executor::{DataUpdateExecutor, ExecutorDeps, TaskExecutor};
pub use migration::{MigrationRequest, MigrationRunner, RunOnceOutcome};
pub use schema::{BackupTransformer, SchemaSyncer};
pub use store::Store;

/// Re-export core types.
pub use dmlguard_core as core;
