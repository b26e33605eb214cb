//! Per-engine annotation of backup tables.
//!
//! After a backup table is created it is tagged with the issue that caused
//! it. Each dialect exposes its tagging facility through a different
//! connection, so the policy records which connection runs the statement
//! alongside the statement template.
//!
//! | Engine family | Connection | Statement | Line captured |
//! |---------------|------------|-----------|---------------|
//! | MySQL, TiDB, MariaDB, OceanBase | source | ``ALTER TABLE `db`.`t` COMMENT = 'issue N'`` | no |
//! | MSSQL | backup | `EXEC sp_addextendedproperty ...` | yes |
//! | others | none | none | no |

use std::collections::HashMap;

use crate::engine::Engine;
use crate::model::BackupTableDescriptor;

/// Which open connection executes an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionTarget {
    /// Connection to the database the DML runs against.
    Source,
    /// Connection to the backup database.
    Backup,
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionTarget::Source => write!(f, "source"),
            ConnectionTarget::Backup => write!(f, "backup"),
        }
    }
}

/// Annotation statement shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationTemplate {
    /// ``ALTER TABLE `<db>`.`<table>` COMMENT = 'issue <id>'``
    TableComment,
    /// `EXEC sp_addextendedproperty 'MS_Description', 'issue <id>', 'SCHEMA', 'dbo', 'TABLE', '<table>'`
    ExtendedProperty,
}

impl AnnotationTemplate {
    /// Render the statement for one backup table.
    pub fn render(&self, backup_database: &str, table: &str, issue_id: i64) -> String {
        match self {
            AnnotationTemplate::TableComment => format!(
                "ALTER TABLE `{}`.`{}` COMMENT = 'issue {}'",
                backup_database, table, issue_id
            ),
            AnnotationTemplate::ExtendedProperty => format!(
                "EXEC sp_addextendedproperty 'MS_Description', 'issue {}', 'SCHEMA', 'dbo', 'TABLE', '{}'",
                issue_id, table
            ),
        }
    }
}

/// How one engine annotates its backup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStrategy {
    pub target: ConnectionTarget,
    pub template: AnnotationTemplate,
    /// Whether the audit record carries the descriptor's source line.
    pub captures_line: bool,
}

impl AnnotationStrategy {
    /// MySQL-family table comment, run on the source connection.
    pub const fn table_comment() -> Self {
        Self {
            target: ConnectionTarget::Source,
            template: AnnotationTemplate::TableComment,
            captures_line: false,
        }
    }

    /// MSSQL extended property, run on the backup connection.
    pub const fn extended_property() -> Self {
        Self {
            target: ConnectionTarget::Backup,
            template: AnnotationTemplate::ExtendedProperty,
            captures_line: true,
        }
    }
}

/// A rendered annotation statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub target: ConnectionTarget,
    pub statement: String,
}

/// Everything the coordinator needs to annotate one backup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationPlan {
    /// Statement to run, if the engine supports annotations.
    pub annotation: Option<Annotation>,
    /// Line recorded in the audit record.
    pub original_line: Option<u32>,
}

/// Mapping from engine to annotation strategy.
#[derive(Debug, Clone)]
pub struct AnnotationPolicy {
    strategies: HashMap<Engine, AnnotationStrategy>,
}

impl AnnotationPolicy {
    /// Policy with no strategies; every engine skips annotation.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Policy used in production.
    pub fn standard() -> Self {
        let mut policy = Self::empty();
        for engine in Engine::ALL {
            if engine.is_mysql_family() {
                policy = policy.with_strategy(engine, AnnotationStrategy::table_comment());
            }
        }
        policy.with_strategy(Engine::Mssql, AnnotationStrategy::extended_property())
    }

    /// Register or replace the strategy for an engine.
    pub fn with_strategy(mut self, engine: Engine, strategy: AnnotationStrategy) -> Self {
        self.strategies.insert(engine, strategy);
        self
    }

    /// Strategy for an engine, if it annotates.
    pub fn strategy(&self, engine: Engine) -> Option<&AnnotationStrategy> {
        self.strategies.get(&engine)
    }

    /// Plan the annotation of one backup table.
    pub fn plan(
        &self,
        engine: Engine,
        backup_database: &str,
        descriptor: &BackupTableDescriptor,
        issue_id: i64,
    ) -> AnnotationPlan {
        match self.strategy(engine) {
            Some(strategy) => AnnotationPlan {
                annotation: Some(Annotation {
                    target: strategy.target,
                    statement: strategy.template.render(
                        backup_database,
                        &descriptor.table_name,
                        issue_id,
                    ),
                }),
                original_line: strategy.captures_line.then_some(descriptor.original_line),
            },
            None => AnnotationPlan {
                annotation: None,
                original_line: None,
            },
        }
    }
}

impl Default for AnnotationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
