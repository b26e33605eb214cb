//! Migration runner boundary and task-run outcomes.

use async_trait::async_trait;

use dmlguard_core::{Error, MigrationKind, OpContext, Task, TaskRunResult};

/// Outcome of one `run_once` call.
///
/// `terminated` tells the scheduler whether the task run is finished. A
/// terminated run with an error is an unrecoverable task failure.
#[derive(Debug)]
pub struct RunOnceOutcome {
    pub terminated: bool,
    pub result: Result<Option<TaskRunResult>, Error>,
}

impl RunOnceOutcome {
    /// Unrecoverable failure.
    pub fn fatal(error: Error) -> Self {
        Self {
            terminated: true,
            result: Err(error),
        }
    }

    /// Finished successfully with a result.
    pub fn done(result: TaskRunResult) -> Self {
        Self {
            terminated: true,
            result: Ok(Some(result)),
        }
    }

    /// Not finished yet; the scheduler should call again.
    pub fn pending() -> Self {
        Self {
            terminated: false,
            result: Ok(None),
        }
    }

    /// Whether the run ended in an error.
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Statement handed to the migration runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    pub kind: MigrationKind,
    pub statement: String,
    pub schema_version: String,
    pub sheet_id: Option<i64>,
}

/// Applies a statement to the target database and records the result.
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// Apply `request` for `task` and report the terminal outcome.
    async fn run_migration(
        &self,
        ctx: &OpContext,
        driver_ctx: &OpContext,
        task: &Task,
        task_run_id: i64,
        request: MigrationRequest,
    ) -> RunOnceOutcome;
}
