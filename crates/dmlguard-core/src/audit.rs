//! Audit records for pre-update backups.
//!
//! Each backed-up table produces one issue comment authored by the system bot.

use serde::{Deserialize, Serialize};

/// Principal that authors system-generated issue comments.
pub const SYSTEM_BOT_ID: i64 = 1;

/// Reference to one backed-up table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTableRef {
    /// Schema of the backup table. Always empty for now.
    pub schema: String,
    pub table: String,
}

/// Record of a table backed up before a data update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Rollout path of the task that made the backup.
    pub task: String,
    /// Name of the backup database.
    pub database: String,
    pub tables: Vec<BackupTableRef>,
    /// Source line of the DML, for dialects that report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_line: Option<u32>,
}

impl AuditRecord {
    /// Record for a single backup table.
    pub fn single_table(
        task: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        original_line: Option<u32>,
    ) -> Self {
        Self {
            task: task.into(),
            database: database.into(),
            tables: vec![BackupTableRef {
                schema: String::new(),
                table: table.into(),
            }],
            original_line,
        }
    }
}

/// Structured issue comment events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueCommentEvent {
    /// Rows were backed up before a task ran.
    TaskPriorBackup(AuditRecord),
}

/// Issue comment to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueComment {
    pub issue_id: i64,
    pub event: IssueCommentEvent,
}

impl IssueComment {
    /// Wrap an audit record for an issue.
    pub fn prior_backup(issue_id: i64, record: AuditRecord) -> Self {
        Self {
            issue_id,
            event: IssueCommentEvent::TaskPriorBackup(record),
        }
    }

    /// The audit record carried by this comment, if any.
    pub fn audit_record(&self) -> Option<&AuditRecord> {
        match &self.event {
            IssueCommentEvent::TaskPriorBackup(record) => Some(record),
        }
    }
}
