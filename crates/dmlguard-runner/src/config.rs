//! Runner configuration.

use std::time::Duration;

use dmlguard_core::{AnnotationPolicy, SYSTEM_BOT_ID};

/// Default bound on releasing one connection, in seconds.
pub const DEFAULT_CLOSE_TIMEOUT_SECS: u64 = 10;

/// Data-update runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Force a full schema resync of the backup database after backup.
    pub force_backup_sync: bool,

    /// Principal recorded as the author of backup audit comments.
    pub audit_author_id: i64,

    /// Upper bound on closing each connection.
    ///
    /// Applies independently of the driver context so a cancelled run still
    /// releases its connections.
    pub close_timeout: Duration,

    /// Per-engine backup table annotation.
    pub annotation_policy: AnnotationPolicy,
}

impl RunnerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self {
            force_backup_sync: true,
            audit_author_id: SYSTEM_BOT_ID,
            close_timeout: Duration::from_secs(DEFAULT_CLOSE_TIMEOUT_SECS),
            annotation_policy: AnnotationPolicy::standard(),
        }
    }

    /// Set whether the backup database resync is forced.
    pub fn with_force_backup_sync(mut self, force: bool) -> Self {
        self.force_backup_sync = force;
        self
    }

    /// Set the audit comment author.
    pub fn with_audit_author(mut self, author_id: i64) -> Self {
        self.audit_author_id = author_id;
        self
    }

    /// Set the connection close timeout.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set the annotation policy.
    pub fn with_annotation_policy(mut self, policy: AnnotationPolicy) -> Self {
        self.annotation_policy = policy;
        self
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}
