//! DMLGuard Core - task model, status registry, and dialect policy.
//!
//! This crate holds the pieces of the data-update executor that do not talk
//! to a database: payload decoding, resource names, the execution status
//! registry shared by concurrent task runs, the per-engine backup annotation
//! policy, and audit record payloads.

pub mod annotation;
pub mod audit;
pub mod context;
pub mod engine;
pub mod error;
pub mod model;
pub mod resource;
pub mod status;

pub use annotation::{
    Annotation, AnnotationPlan, AnnotationPolicy, AnnotationStrategy, AnnotationTemplate,
    ConnectionTarget,
};
pub use audit::{AuditRecord, BackupTableRef, IssueComment, IssueCommentEvent, SYSTEM_BOT_ID};
pub use context::{CancelHandle, OpContext};
pub use engine::Engine;
pub use error::{Error, Result};
pub use model::{
    BackupSpec, BackupTableDescriptor, Database, DatabaseLookup, Instance, Issue, MigrationKind,
    Task, TaskPayload, TaskRunResult,
};
pub use resource::{format_task, BackupTarget};
pub use status::{
    new_shared_registry, ExecutionPhase, ExecutionStatus, ExecutionStatusRegistry,
    SharedStatusRegistry, StatusPublisher,
};
