//! Execution status registry.
//!
//! Executors publish the phase of every in-flight task run here; a progress
//! API reads it from other threads. Entries live for the process lifetime
//! unless the lifecycle owner removes them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Phase of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPhase {
    /// Preparing to execute: payload decoding, backup.
    PreExecuting,
    /// Applying the statement.
    Executing,
    /// Recording results.
    PostExecuting,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionPhase::PreExecuting => write!(f, "PRE_EXECUTING"),
            ExecutionPhase::Executing => write!(f, "EXECUTING"),
            ExecutionPhase::PostExecuting => write!(f, "POST_EXECUTING"),
            ExecutionPhase::Done => write!(f, "DONE"),
            ExecutionPhase::Failed => write!(f, "FAILED"),
        }
    }
}

/// Last known status of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub phase: ExecutionPhase,
    pub update_time: DateTime<Utc>,
}

/// Write side of the status channel.
pub trait StatusPublisher: Send + Sync {
    /// Record the phase of a task run. Last write wins.
    fn set(&self, task_run_id: i64, phase: ExecutionPhase, update_time: DateTime<Utc>);
}

/// Concurrent map from task-run id to its latest execution status.
#[derive(Debug, Default)]
pub struct ExecutionStatusRegistry {
    statuses: DashMap<i64, ExecutionStatus>,
}

impl ExecutionStatusRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest status of a task run.
    pub fn get(&self, task_run_id: i64) -> Option<ExecutionStatus> {
        self.statuses.get(&task_run_id).map(|entry| *entry.value())
    }

    /// Drop a task run's status. Returns the removed entry.
    pub fn remove(&self, task_run_id: i64) -> Option<ExecutionStatus> {
        self.statuses.remove(&task_run_id).map(|(_, status)| status)
    }

    /// Copy of every tracked status, ordered by task-run id.
    pub fn snapshot(&self) -> Vec<(i64, ExecutionStatus)> {
        let mut entries: Vec<_> = self
            .statuses
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Number of tracked task runs.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Whether no task run is tracked.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl StatusPublisher for ExecutionStatusRegistry {
    fn set(&self, task_run_id: i64, phase: ExecutionPhase, update_time: DateTime<Utc>) {
        self.statuses.insert(task_run_id, ExecutionStatus { phase, update_time });
        tracing::trace!(task_run_id, %phase, "execution status updated");
    }
}

/// Thread-safe registry handle.
pub type SharedStatusRegistry = Arc<ExecutionStatusRegistry>;

/// Create a new shared registry.
pub fn new_shared_registry() -> SharedStatusRegistry {
    Arc::new(ExecutionStatusRegistry::new())
}
