//! Qualified resource names.
//!
//! Backup targets arrive in task payloads as `"<instance>/<database>"` or in
//! the long form `"instances/<instance>/databases/<database>"`. Audit records
//! refer to tasks by their rollout path.

use crate::error::{Error, Result};

const INSTANCE_PREFIX: &str = "instances/";
const DATABASE_SEGMENT: &str = "/databases/";

/// Location a pre-update backup is written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupTarget {
    /// Resource id of the instance hosting the backup database.
    pub instance_id: String,
    /// Name of the backup database on that instance.
    pub database_name: String,
}

impl BackupTarget {
    /// Parse a qualified backup database name.
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidResourceName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let long_form = name
            .strip_prefix(INSTANCE_PREFIX)
            .and_then(|rest| rest.split_once(DATABASE_SEGMENT));
        let (instance_id, database_name) = match long_form {
            Some(parts) => parts,
            None => name
                .split_once('/')
                .ok_or_else(|| invalid("expected <instance>/<database>"))?,
        };

        if instance_id.is_empty() || instance_id.contains('/') {
            return Err(invalid("empty or malformed instance id"));
        }
        if database_name.is_empty() || database_name.contains('/') {
            return Err(invalid("empty or malformed database name"));
        }

        Ok(Self {
            instance_id: instance_id.to_string(),
            database_name: database_name.to_string(),
        })
    }

    /// Long resource form, `instances/<instance>/databases/<database>`.
    pub fn resource_name(&self) -> String {
        format!(
            "{}{}{}{}",
            INSTANCE_PREFIX, self.instance_id, DATABASE_SEGMENT, self.database_name
        )
    }
}

impl std::fmt::Display for BackupTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.instance_id, self.database_name)
    }
}

impl std::str::FromStr for BackupTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Format the rollout path of a task, as recorded in audit comments.
pub fn format_task(project_id: &str, pipeline_id: i64, stage_id: i64, task_id: i64) -> String {
    format!(
        "projects/{}/rollouts/{}/stages/{}/tasks/{}",
        project_id, pipeline_id, stage_id, task_id
    )
}
