//! Statement transformation and schema synchronization boundaries.

use async_trait::async_trait;

use dmlguard_core::{BackupTableDescriptor, Database, Engine, Result};

/// Turns a DML statement into per-table backup statements.
pub trait BackupTransformer: Send + Sync {
    /// Produce one descriptor per affected table, in execution order.
    ///
    /// Backup tables are created in `backup_database` with names starting
    /// with `prefix`.
    fn transform(
        &self,
        engine: Engine,
        statement: &str,
        source_database: &str,
        backup_database: &str,
        prefix: &str,
    ) -> Result<Vec<BackupTableDescriptor>>;
}

/// Refreshes cached schema metadata of a database.
#[async_trait]
pub trait SchemaSyncer: Send + Sync {
    /// Re-read the schema of `database`. `force` bypasses change detection.
    async fn sync_database_schema(&self, database: &Database, force: bool) -> Result<()>;
}
