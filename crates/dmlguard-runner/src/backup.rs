//! Pre-update backup.
//!
//! Before a data-update task mutates rows, every affected table is copied
//! into a backup database:
//!
//! 1. Resolve the instance, source database, owning issue and backup database.
//! 2. Open an administrative connection to the source and to the backup database.
//! 3. Transform the DML into per-table backup statements under a timestamp prefix.
//! 4. For each table, in order: run the backup statement on the source
//!    connection, annotate the backup table, record an audit comment.
//! 5. Force a schema resync of the backup database.
//!
//! Steps 1 through 4 abort the task on failure, except the audit comment.
//! The audit comment and the resync are best effort: their failures are
//! logged and collected in the [`BackupReport`].

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use dmlguard_core::{
    format_task, AuditRecord, BackupSpec, BackupTableDescriptor, ConnectionTarget,
    Database, DatabaseLookup, Error, Instance, Issue, OpContext, Result, Task,
};

use crate::audit::AuditTrailEmitter;
use crate::clock::Clock;
use crate::config::RunnerConfig;
use crate::driver::{Driver, DriverFactory};
use crate::schema::{BackupTransformer, SchemaSyncer};
use crate::store::Store;

/// Naming prefix for backup tables created at `now`, e.g. `_20240102030405`.
pub fn backup_prefix(now: &DateTime<Local>) -> String {
    format!("_{}", now.format("%Y%m%d%H%M%S"))
}

/// A failure the backup tolerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffortFailure {
    /// The audit comment for a table could not be written.
    AuditRecord { table: String, error: String },
    /// The backup database schema could not be resynced.
    SchemaSync { database: String, error: String },
}

/// A table copied into the backup database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackedUpTable {
    pub table_name: String,
    pub original_line: Option<u32>,
    /// Whether the audit comment was written.
    pub audited: bool,
}

/// Summary of a successful backup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    /// Qualified backup database name; `None` when backup was disabled.
    pub backup_database: Option<String>,
    /// Table name prefix used for this run.
    pub prefix: Option<String>,
    /// Backed-up tables, in processing order.
    pub tables: Vec<BackedUpTable>,
    pub best_effort_failures: Vec<BestEffortFailure>,
}

impl BackupReport {
    /// Report for a run without backup.
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Whether backup was disabled for the run.
    pub fn is_skipped(&self) -> bool {
        self.backup_database.is_none()
    }
}

/// Entities a backup run works on.
struct Resolved {
    instance: Instance,
    database: Database,
    issue: Issue,
    backup_database: Database,
}

/// Coordinates the pre-update backup of a data-update task.
pub struct PreUpdateBackup {
    store: Arc<dyn Store>,
    driver_factory: Arc<dyn DriverFactory>,
    transformer: Arc<dyn BackupTransformer>,
    schema_syncer: Arc<dyn SchemaSyncer>,
    clock: Arc<dyn Clock>,
    audit: AuditTrailEmitter,
    config: RunnerConfig,
}

impl PreUpdateBackup {
    /// Create a coordinator.
    pub fn new(
        store: Arc<dyn Store>,
        driver_factory: Arc<dyn DriverFactory>,
        transformer: Arc<dyn BackupTransformer>,
        schema_syncer: Arc<dyn SchemaSyncer>,
        clock: Arc<dyn Clock>,
        config: RunnerConfig,
    ) -> Self {
        let audit = AuditTrailEmitter::new(store.clone(), config.audit_author_id);
        Self {
            store,
            driver_factory,
            transformer,
            schema_syncer,
            clock,
            audit,
            config,
        }
    }

    /// Back up the rows `statement` is about to change.
    ///
    /// Returns immediately, without touching the store or any database, when
    /// `spec` is absent or disabled.
    pub async fn run(
        &self,
        ctx: &OpContext,
        driver_ctx: &OpContext,
        statement: &str,
        spec: Option<&BackupSpec>,
        task: &Task,
    ) -> Result<BackupReport> {
        let Some(spec) = spec.filter(|spec| spec.is_enabled()) else {
            return Ok(BackupReport::skipped());
        };

        let resolved = self.resolve(ctx, spec, task).await?;

        let source = self
            .connect(driver_ctx, &resolved.instance, &resolved.database)
            .await?;
        let backup = match self
            .connect(driver_ctx, &resolved.instance, &resolved.backup_database)
            .await
        {
            Ok(driver) => driver,
            Err(e) => {
                self.release(ConnectionTarget::Source, &resolved.database, source)
                    .await;
                return Err(e);
            }
        };

        let outcome = self
            .back_up_tables(
                ctx,
                driver_ctx,
                statement,
                task,
                &resolved,
                source.as_ref(),
                backup.as_ref(),
            )
            .await;

        self.release(ConnectionTarget::Source, &resolved.database, source)
            .await;
        self.release(ConnectionTarget::Backup, &resolved.backup_database, backup)
            .await;

        let mut report = outcome?;

        if let Err(e) = ctx
            .run(
                self.schema_syncer
                    .sync_database_schema(&resolved.backup_database, self.config.force_backup_sync),
            )
            .await
        {
            error!(
                database = %spec.database,
                error = %e,
                "failed to sync backup database schema"
            );
            report.best_effort_failures.push(BestEffortFailure::SchemaSync {
                database: spec.database.clone(),
                error: e.to_string(),
            });
        }

        info!(
            task_id = task.id,
            backup_database = %spec.database,
            tables = report.tables.len(),
            best_effort_failures = report.best_effort_failures.len(),
            "pre-update backup completed"
        );

        Ok(report)
    }

    async fn resolve(&self, ctx: &OpContext, spec: &BackupSpec, task: &Task) -> Result<Resolved> {
        let instance = ctx
            .run(self.store.instance(task.instance_id))
            .await?
            .ok_or_else(|| Error::not_found("instance", task.instance_id))?;

        let database_id = task
            .database_id
            .ok_or_else(|| Error::not_found("database", format!("of task {}", task.id)))?;
        let database = ctx
            .run(self.store.database(&DatabaseLookup::Uid(database_id)))
            .await?
            .ok_or_else(|| Error::not_found("database", database_id))?;

        let issue = ctx
            .run(self.store.issue_by_pipeline(task.pipeline_id))
            .await
            .map_err(|e| match e {
                Error::Store(message) => Error::Store(format!(
                    "failed to find issue for pipeline {}: {}",
                    task.pipeline_id, message
                )),
                other => other,
            })?
            .ok_or(Error::IssueNotFound {
                pipeline_id: task.pipeline_id,
            })?;

        let target = spec.target()?;
        let backup_database = ctx
            .run(self.store.database(&DatabaseLookup::from(&target)))
            .await?
            .ok_or_else(|| Error::BackupDatabaseNotFound(spec.database.clone()))?;

        Ok(Resolved {
            instance,
            database,
            issue,
            backup_database,
        })
    }

    // Both connections go through the source instance; backup databases are
    // expected to live next to the source.
    async fn connect(
        &self,
        driver_ctx: &OpContext,
        instance: &Instance,
        database: &Database,
    ) -> Result<Box<dyn Driver>> {
        driver_ctx
            .run(self.driver_factory.admin_driver(instance, database))
            .await
            .map_err(|e| {
                if e.is_interrupted() {
                    e
                } else {
                    Error::Connect {
                        database: database.qualified_name(),
                        reason: e.to_string(),
                    }
                }
            })
    }

    async fn release(&self, role: ConnectionTarget, database: &Database, driver: Box<dyn Driver>) {
        let close_ctx = OpContext::background().with_timeout(self.config.close_timeout);
        if let Err(e) = close_ctx.run(driver.close()).await {
            warn!(
                connection = %role,
                database = %database.qualified_name(),
                error = %e,
                "failed to close database connection"
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn back_up_tables(
        &self,
        ctx: &OpContext,
        driver_ctx: &OpContext,
        statement: &str,
        task: &Task,
        resolved: &Resolved,
        source: &dyn Driver,
        backup: &dyn Driver,
    ) -> Result<BackupReport> {
        let engine = resolved.instance.engine;
        let backup_database_name = resolved.backup_database.database_name.as_str();
        let prefix = backup_prefix(&self.clock.now());

        let descriptors = self
            .transformer
            .transform(
                engine,
                statement,
                &resolved.database.database_name,
                backup_database_name,
                &prefix,
            )
            .map_err(|e| match e {
                Error::Transform(_) => e,
                other => Error::Transform(other.to_string()),
            })?;

        debug!(
            task_id = task.id,
            engine = %engine,
            prefix = %prefix,
            tables = descriptors.len(),
            "transformed DML into backup statements"
        );

        let task_reference = format_task(
            &resolved.issue.project_id,
            task.pipeline_id,
            task.stage_id,
            task.id,
        );

        let mut report = BackupReport {
            backup_database: Some(resolved.backup_database.qualified_name()),
            prefix: Some(prefix),
            ..Default::default()
        };

        for descriptor in &descriptors {
            self.back_up_table(driver_ctx, source, descriptor).await?;

            let plan = self.config.annotation_policy.plan(
                engine,
                backup_database_name,
                descriptor,
                resolved.issue.uid,
            );
            if let Some(annotation) = &plan.annotation {
                let driver = match annotation.target {
                    ConnectionTarget::Source => source,
                    ConnectionTarget::Backup => backup,
                };
                driver_ctx
                    .run(driver.execute(&annotation.statement))
                    .await
                    .map_err(|e| wrap_statement_error(e, |reason| Error::Annotation {
                        table: descriptor.table_name.clone(),
                        reason,
                    }))?;
            }

            let record = AuditRecord::single_table(
                task_reference.clone(),
                backup_database_name,
                descriptor.table_name.clone(),
                plan.original_line,
            );
            let audited = match self.audit.emit(ctx, resolved.issue.uid, record).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        task_id = task.id,
                        table = %descriptor.table_name,
                        error = %e,
                        "failed to create issue comment"
                    );
                    report.best_effort_failures.push(BestEffortFailure::AuditRecord {
                        table: descriptor.table_name.clone(),
                        error: e.to_string(),
                    });
                    false
                }
            };

            report.tables.push(BackedUpTable {
                table_name: descriptor.table_name.clone(),
                original_line: plan.original_line,
                audited,
            });
        }

        Ok(report)
    }

    async fn back_up_table(
        &self,
        driver_ctx: &OpContext,
        source: &dyn Driver,
        descriptor: &BackupTableDescriptor,
    ) -> Result<()> {
        let rows = driver_ctx
            .run(source.execute(&descriptor.statement))
            .await
            .map_err(|e| wrap_statement_error(e, |reason| Error::BackupStatement {
                table: descriptor.table_name.clone(),
                reason,
            }))?;
        debug!(table = %descriptor.table_name, rows, "backup table created");
        Ok(())
    }
}

/// Attach table context to a statement failure; interruptions pass through.
fn wrap_statement_error(err: Error, wrap: impl FnOnce(String) -> Error) -> Error {
    if err.is_interrupted() {
        err
    } else {
        wrap(err.to_string())
    }
}
