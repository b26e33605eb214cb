//! Persistent store boundary.

use async_trait::async_trait;

use dmlguard_core::{Database, DatabaseLookup, Instance, Issue, IssueComment, Result};

/// Reads and writes the executor needs from the metadata store.
///
/// Lookups return `Ok(None)` when the entity does not exist and `Err` only
/// when the store itself fails.
#[async_trait]
pub trait Store: Send + Sync {
    /// Statement text of a sheet.
    async fn sheet_statement(&self, sheet_id: i64) -> Result<Option<String>>;

    /// Instance by uid.
    async fn instance(&self, uid: i64) -> Result<Option<Instance>>;

    /// Database by uid or by instance and name.
    async fn database(&self, lookup: &DatabaseLookup) -> Result<Option<Database>>;

    /// Issue that owns a pipeline.
    async fn issue_by_pipeline(&self, pipeline_id: i64) -> Result<Option<Issue>>;

    /// Persist an issue comment authored by `creator_id`.
    async fn create_issue_comment(&self, comment: &IssueComment, creator_id: i64) -> Result<()>;
}
