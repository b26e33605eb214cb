//! Backup audit trail.

use std::sync::Arc;

use dmlguard_core::{AuditRecord, IssueComment, OpContext, Result};

use crate::store::Store;

/// Writes one issue comment per backed-up table.
///
/// Callers treat failures as best effort: a lost comment never fails a task.
#[derive(Clone)]
pub struct AuditTrailEmitter {
    store: Arc<dyn Store>,
    author_id: i64,
}

impl AuditTrailEmitter {
    /// Create an emitter writing through `store` as `author_id`.
    pub fn new(store: Arc<dyn Store>, author_id: i64) -> Self {
        Self { store, author_id }
    }

    /// Record that `record` was written for `issue_id`.
    pub async fn emit(&self, ctx: &OpContext, issue_id: i64, record: AuditRecord) -> Result<()> {
        let comment = IssueComment::prior_backup(issue_id, record);
        ctx.run(self.store.create_issue_comment(&comment, self.author_id))
            .await
    }
}

impl std::fmt::Debug for AuditTrailEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrailEmitter")
            .field("author_id", &self.author_id)
            .finish_non_exhaustive()
    }
}
