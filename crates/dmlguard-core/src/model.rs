//! Task payloads and the entities a data-update run resolves.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::Result;
use crate::resource::BackupTarget;

/// Decoded payload of a data-update task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    /// Sheet holding the DML statement.
    pub sheet_id: i64,
    /// Schema version recorded by the migration runner.
    #[serde(default)]
    pub schema_version: String,
    /// Where to back up affected rows, if anywhere.
    #[serde(default)]
    pub pre_update_backup_detail: Option<BackupSpec>,
}

impl TaskPayload {
    /// Decode a payload from its JSON text.
    pub fn decode(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The backup spec when backup is enabled.
    pub fn backup(&self) -> Option<&BackupSpec> {
        self.pre_update_backup_detail
            .as_ref()
            .filter(|spec| spec.is_enabled())
    }
}

/// Pre-update backup settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSpec {
    /// Qualified backup database name. Empty disables backup.
    #[serde(default)]
    pub database: String,
}

impl BackupSpec {
    /// Create a spec targeting the given qualified database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    /// Whether a backup was requested.
    pub fn is_enabled(&self) -> bool {
        !self.database.is_empty()
    }

    /// Parse the backup target.
    pub fn target(&self) -> Result<BackupTarget> {
        BackupTarget::parse(&self.database)
    }
}

/// A pipeline task as handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub pipeline_id: i64,
    pub stage_id: i64,
    pub instance_id: i64,
    pub database_id: Option<i64>,
    /// Raw JSON payload.
    pub payload: String,
}

/// A registered database instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub uid: i64,
    /// Resource id, the `<instance>` segment of qualified names.
    pub resource_id: String,
    pub engine: Engine,
}

/// A database on some instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    pub uid: i64,
    /// Resource id of the owning instance.
    pub instance_id: String,
    pub database_name: String,
}

impl Database {
    /// Qualified `<instance>/<database>` name.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.instance_id, self.database_name)
    }
}

/// The issue that owns a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub uid: i64,
    pub project_id: String,
    pub pipeline_id: i64,
}

/// Database lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLookup {
    /// By database uid.
    Uid(i64),
    /// By owning instance and name.
    Name {
        instance_id: String,
        database_name: String,
    },
}

impl std::fmt::Display for DatabaseLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseLookup::Uid(uid) => write!(f, "{}", uid),
            DatabaseLookup::Name {
                instance_id,
                database_name,
            } => write!(f, "{}/{}", instance_id, database_name),
        }
    }
}

impl From<&BackupTarget> for DatabaseLookup {
    fn from(target: &BackupTarget) -> Self {
        DatabaseLookup::Name {
            instance_id: target.instance_id.clone(),
            database_name: target.database_name.clone(),
        }
    }
}

/// One table's worth of backup work.
///
/// Produced in order by the DML transformer; the order must be preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTableDescriptor {
    /// Name of the backup table to create.
    pub table_name: String,
    /// Statement that creates and fills the backup table.
    pub statement: String,
    /// Line of the originating DML statement in the sheet.
    pub original_line: u32,
}

/// Kind of change handed to the migration runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// Schema change (DDL).
    Migrate,
    /// Data change (DML).
    Data,
}

impl std::fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationKind::Migrate => write!(f, "MIGRATE"),
            MigrationKind::Data => write!(f, "DATA"),
        }
    }
}

/// Terminal result of a task run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunResult {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_history: Option<String>,
    #[serde(default)]
    pub version: String,
}
