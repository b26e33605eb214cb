//! Core error types.

use thiserror::Error;

/// Errors raised while executing a data-update task.
///
/// Every variant is fatal to the task run. Failures that the backup protocol
/// tolerates never become an `Error`; the runner reports them separately.
#[derive(Debug, Error)]
pub enum Error {
    /// The task payload could not be decoded.
    #[error("invalid database data update payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A qualified resource name could not be parsed.
    #[error("invalid resource name {name:?}: {reason}")]
    InvalidResourceName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A referenced entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `instance` or `sheet`.
        kind: &'static str,
        /// Identifier used for the lookup.
        id: String,
    },

    /// No issue owns the task's pipeline.
    #[error("issue not found for pipeline {pipeline_id}")]
    IssueNotFound {
        /// Pipeline the task belongs to.
        pipeline_id: i64,
    },

    /// The backup target does not resolve to a known database.
    #[error("backup database {0:?} not found")]
    BackupDatabaseNotFound(String),

    /// Persistent store failure.
    #[error("store error: {0}")]
    Store(String),

    /// A database connection could not be acquired.
    #[error("failed to connect to database {database:?}: {reason}")]
    Connect {
        /// Database the connection was opened against.
        database: String,
        /// Underlying driver message.
        reason: String,
    },

    /// Generic driver failure.
    #[error("driver error: {0}")]
    Driver(String),

    /// DML-to-backup transformation failed.
    #[error("failed to transform DML to select: {0}")]
    Transform(String),

    /// A backup statement failed to execute.
    #[error("failed to back up table {table:?}: {reason}")]
    BackupStatement {
        /// Table being backed up.
        table: String,
        /// Underlying driver message.
        reason: String,
    },

    /// A backup annotation statement failed to execute.
    #[error("failed to annotate backup table {table:?}: {reason}")]
    Annotation {
        /// Backup table being annotated.
        table: String,
        /// Underlying driver message.
        reason: String,
    },

    /// Schema synchronization failure.
    #[error("schema sync error: {0}")]
    SchemaSync(String),

    /// Migration runner failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// The operation deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The operation was cancelled by its caller.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] error.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether the error came from an interrupted context rather than the operation itself.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::DeadlineExceeded | Error::Cancelled)
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;
