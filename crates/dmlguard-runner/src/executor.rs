//! Task executors.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use dmlguard_core::{
    Error, ExecutionPhase, MigrationKind, OpContext, Result, StatusPublisher, Task, TaskPayload,
};

use crate::backup::{BackupReport, BestEffortFailure, PreUpdateBackup};
use crate::clock::{Clock, SystemClock};
use crate::config::RunnerConfig;
use crate::driver::DriverFactory;
use crate::migration::{MigrationRequest, MigrationRunner, RunOnceOutcome};
use crate::schema::{BackupTransformer, SchemaSyncer};
use crate::store::Store;

/// Runs one attempt of a pipeline task.
///
/// Retries belong to the caller, which invokes `run_once` again while the
/// outcome is not terminated.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run the task once.
    async fn run_once(
        &self,
        ctx: &OpContext,
        driver_ctx: &OpContext,
        task: &Task,
        task_run_id: i64,
    ) -> RunOnceOutcome;
}

/// Collaborators a [`DataUpdateExecutor`] is wired to.
#[derive(Clone)]
pub struct ExecutorDeps {
    pub store: Arc<dyn Store>,
    pub driver_factory: Arc<dyn DriverFactory>,
    pub transformer: Arc<dyn BackupTransformer>,
    pub schema_syncer: Arc<dyn SchemaSyncer>,
    pub migration_runner: Arc<dyn MigrationRunner>,
    pub status: Arc<dyn StatusPublisher>,
    pub clock: Arc<dyn Clock>,
}

impl ExecutorDeps {
    /// Bundle collaborators, using the system clock.
    pub fn new(
        store: Arc<dyn Store>,
        driver_factory: Arc<dyn DriverFactory>,
        transformer: Arc<dyn BackupTransformer>,
        schema_syncer: Arc<dyn SchemaSyncer>,
        migration_runner: Arc<dyn MigrationRunner>,
        status: Arc<dyn StatusPublisher>,
    ) -> Self {
        Self {
            store,
            driver_factory,
            transformer,
            schema_syncer,
            migration_runner,
            status,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Executor for data-update (DML) tasks.
///
/// Backs up the affected rows when the payload asks for it, then hands the
/// statement to the migration runner.
pub struct DataUpdateExecutor {
    store: Arc<dyn Store>,
    status: Arc<dyn StatusPublisher>,
    clock: Arc<dyn Clock>,
    migration_runner: Arc<dyn MigrationRunner>,
    backup: PreUpdateBackup,
}

impl DataUpdateExecutor {
    /// Create a data-update executor.
    pub fn new(deps: ExecutorDeps, config: RunnerConfig) -> Self {
        let backup = PreUpdateBackup::new(
            deps.store.clone(),
            deps.driver_factory,
            deps.transformer,
            deps.schema_syncer,
            deps.clock.clone(),
            config,
        );
        Self {
            store: deps.store,
            status: deps.status,
            clock: deps.clock,
            migration_runner: deps.migration_runner,
            backup,
        }
    }

    /// Everything that must succeed before the statement is applied.
    async fn prepare(
        &self,
        ctx: &OpContext,
        driver_ctx: &OpContext,
        task: &Task,
    ) -> Result<(TaskPayload, String)> {
        let payload = TaskPayload::decode(&task.payload)?;

        let statement = ctx
            .run(self.store.sheet_statement(payload.sheet_id))
            .await?
            .ok_or_else(|| Error::not_found("sheet", payload.sheet_id))?;

        let report = self
            .backup
            .run(ctx, driver_ctx, &statement, payload.backup(), task)
            .await?;
        log_best_effort_failures(task, &report);

        Ok((payload, statement))
    }
}

#[async_trait]
impl TaskExecutor for DataUpdateExecutor {
    async fn run_once(
        &self,
        ctx: &OpContext,
        driver_ctx: &OpContext,
        task: &Task,
        task_run_id: i64,
    ) -> RunOnceOutcome {
        self.status.set(
            task_run_id,
            ExecutionPhase::PreExecuting,
            self.clock.now().with_timezone(&Utc),
        );

        let (payload, statement) = match self.prepare(ctx, driver_ctx, task).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(
                    task_id = task.id,
                    task_run_id,
                    error = %e,
                    "data update task failed before execution"
                );
                return RunOnceOutcome::fatal(e);
            }
        };

        info!(
            task_id = task.id,
            task_run_id,
            sheet_id = payload.sheet_id,
            "applying data update"
        );

        let request = MigrationRequest {
            kind: MigrationKind::Data,
            statement,
            schema_version: payload.schema_version,
            sheet_id: Some(payload.sheet_id),
        };
        self.migration_runner
            .run_migration(ctx, driver_ctx, task, task_run_id, request)
            .await
    }
}

fn log_best_effort_failures(task: &Task, report: &BackupReport) {
    for failure in &report.best_effort_failures {
        match failure {
            BestEffortFailure::AuditRecord { table, error } => warn!(
                task_id = task.id,
                table = %table,
                error = %error,
                "backup audit record missing"
            ),
            BestEffortFailure::SchemaSync { database, error } => warn!(
                task_id = task.id,
                database = %database,
                error = %error,
                "backup database schema may be stale"
            ),
        }
    }
}
