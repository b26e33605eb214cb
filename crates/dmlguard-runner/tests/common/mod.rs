//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use parking_lot::Mutex;

use dmlguard_core::{
    new_shared_registry, BackupTableDescriptor, Database, DatabaseLookup, Engine, Error, Instance,
    Issue, IssueComment, OpContext, Result, SharedStatusRegistry, Task, TaskRunResult,
};
use dmlguard_runner::{
    BackupTransformer, DataUpdateExecutor, Driver, DriverFactory, ExecutorDeps, FixedClock,
    MigrationRequest, MigrationRunner, PreUpdateBackup, RunOnceOutcome, RunnerConfig,
    SchemaSyncer, Store,
};

pub const INSTANCE_UID: i64 = 1;
pub const INSTANCE_ID: &str = "prod";
pub const SOURCE_DB_UID: i64 = 10;
pub const SOURCE_DB: &str = "app";
pub const BACKUP_DB_UID: i64 = 11;
pub const BACKUP_DB: &str = "bbdataarchive";
pub const ISSUE_UID: i64 = 42;
pub const PROJECT_ID: &str = "sales";
pub const PIPELINE_ID: i64 = 7;
pub const STAGE_ID: i64 = 8;
pub const TASK_ID: i64 = 3;
pub const SHEET_ID: i64 = 100;
pub const STATEMENT: &str = "DELETE FROM orders WHERE id < 10; UPDATE items SET qty = 0;";
pub const PREFIX: &str = "_20240102030405";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    sheets: Mutex<HashMap<i64, String>>,
    instances: Mutex<HashMap<i64, Instance>>,
    databases: Mutex<Vec<Database>>,
    issues: Mutex<Vec<Issue>>,
    comments: Mutex<Vec<(IssueComment, i64)>>,
    failing_comment_tables: Mutex<HashSet<String>>,
    fail_issue_lookup: AtomicBool,
    pub calls: AtomicUsize,
}

impl MemoryStore {
    pub fn seeded(engine: Engine) -> Self {
        let store = Self::default();
        store.sheets.lock().insert(SHEET_ID, STATEMENT.to_string());
        store.instances.lock().insert(
            INSTANCE_UID,
            Instance {
                uid: INSTANCE_UID,
                resource_id: INSTANCE_ID.to_string(),
                engine,
            },
        );
        store.databases.lock().extend([
            Database {
                uid: SOURCE_DB_UID,
                instance_id: INSTANCE_ID.to_string(),
                database_name: SOURCE_DB.to_string(),
            },
            Database {
                uid: BACKUP_DB_UID,
                instance_id: INSTANCE_ID.to_string(),
                database_name: BACKUP_DB.to_string(),
            },
        ]);
        store.issues.lock().push(Issue {
            uid: ISSUE_UID,
            project_id: PROJECT_ID.to_string(),
            pipeline_id: PIPELINE_ID,
        });
        store
    }

    pub fn remove_issues(&self) {
        self.issues.lock().clear();
    }

    pub fn remove_database(&self, uid: i64) {
        self.databases.lock().retain(|db| db.uid != uid);
    }

    pub fn remove_sheets(&self) {
        self.sheets.lock().clear();
    }

    pub fn fail_issue_lookup(&self) {
        self.fail_issue_lookup.store(true, Ordering::SeqCst);
    }

    pub fn fail_comment_for(&self, table: &str) {
        self.failing_comment_tables.lock().insert(table.to_string());
    }

    pub fn comments(&self) -> Vec<(IssueComment, i64)> {
        self.comments.lock().clone()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn sheet_statement(&self, sheet_id: i64) -> Result<Option<String>> {
        self.touch();
        Ok(self.sheets.lock().get(&sheet_id).cloned())
    }

    async fn instance(&self, uid: i64) -> Result<Option<Instance>> {
        self.touch();
        Ok(self.instances.lock().get(&uid).cloned())
    }

    async fn database(&self, lookup: &DatabaseLookup) -> Result<Option<Database>> {
        self.touch();
        let databases = self.databases.lock();
        let found = databases.iter().find(|db| match lookup {
            DatabaseLookup::Uid(uid) => db.uid == *uid,
            DatabaseLookup::Name {
                instance_id,
                database_name,
            } => &db.instance_id == instance_id && &db.database_name == database_name,
        });
        Ok(found.cloned())
    }

    async fn issue_by_pipeline(&self, pipeline_id: i64) -> Result<Option<Issue>> {
        self.touch();
        if self.fail_issue_lookup.load(Ordering::SeqCst) {
            return Err(Error::Store("connection reset".to_string()));
        }
        Ok(self
            .issues
            .lock()
            .iter()
            .find(|issue| issue.pipeline_id == pipeline_id)
            .cloned())
    }

    async fn create_issue_comment(&self, comment: &IssueComment, creator_id: i64) -> Result<()> {
        self.touch();
        if let Some(record) = comment.audit_record() {
            let failing = self.failing_comment_tables.lock();
            if record.tables.iter().any(|t| failing.contains(&t.table)) {
                return Err(Error::Store("comment insert failed".to_string()));
            }
        }
        self.comments.lock().push((comment.clone(), creator_id));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Open { database: String },
    Execute { database: String, statement: String },
    Close { database: String },
}

#[derive(Default)]
pub struct RecordingDriverFactory {
    events: Arc<Mutex<Vec<DriverEvent>>>,
    failing_connects: Mutex<HashSet<String>>,
    failing_statements: Arc<Mutex<Vec<String>>>,
    fail_close: Arc<AtomicBool>,
    execute_delay: Arc<Mutex<Option<Duration>>>,
    pub opened: AtomicUsize,
}

impl RecordingDriverFactory {
    pub fn fail_connect_to(&self, database: &str) {
        self.failing_connects.lock().insert(database.to_string());
    }

    pub fn fail_statements_containing(&self, needle: &str) {
        self.failing_statements.lock().push(needle.to_string());
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    /// Make every statement take `delay` before completing.
    pub fn slow_statements(&self, delay: Duration) {
        *self.execute_delay.lock() = Some(delay);
    }

    pub fn events(&self) -> Vec<DriverEvent> {
        self.events.lock().clone()
    }

    /// Statements executed against `database`, in order.
    pub fn statements_on(&self, database: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DriverEvent::Execute {
                    database: db,
                    statement,
                } if db == database => Some(statement),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DriverEvent::Close { database } => Some(database),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DriverFactory for RecordingDriverFactory {
    async fn admin_driver(
        &self,
        _instance: &Instance,
        database: &Database,
    ) -> Result<Box<dyn Driver>> {
        if self.failing_connects.lock().contains(&database.database_name) {
            return Err(Error::Driver("access denied".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.events.lock().push(DriverEvent::Open {
            database: database.database_name.clone(),
        });
        Ok(Box::new(RecordingDriver {
            database: database.database_name.clone(),
            events: self.events.clone(),
            failing_statements: self.failing_statements.clone(),
            fail_close: self.fail_close.clone(),
            execute_delay: self.execute_delay.clone(),
        }))
    }
}

struct RecordingDriver {
    database: String,
    events: Arc<Mutex<Vec<DriverEvent>>>,
    failing_statements: Arc<Mutex<Vec<String>>>,
    fail_close: Arc<AtomicBool>,
    execute_delay: Arc<Mutex<Option<Duration>>>,
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn execute(&self, statement: &str) -> Result<u64> {
        self.events.lock().push(DriverEvent::Execute {
            database: self.database.clone(),
            statement: statement.to_string(),
        });
        let delay = *self.execute_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .failing_statements
            .lock()
            .iter()
            .any(|needle| statement.contains(needle.as_str()))
        {
            return Err(Error::Driver(format!("statement failed: {}", statement)));
        }
        Ok(1)
    }

    async fn close(&self) -> Result<()> {
        self.events.lock().push(DriverEvent::Close {
            database: self.database.clone(),
        });
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(Error::Driver("close failed".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transformer, syncer, migration runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformCall {
    pub engine: Engine,
    pub statement: String,
    pub source_database: String,
    pub backup_database: String,
    pub prefix: String,
}

/// Emits one descriptor per configured `(table, line)` pair.
pub struct StaticTransformer {
    tables: Vec<(String, u32)>,
    fail: AtomicBool,
    calls: Mutex<Vec<TransformCall>>,
}

impl StaticTransformer {
    pub fn new(tables: &[(&str, u32)]) -> Self {
        Self {
            tables: tables
                .iter()
                .map(|(table, line)| (table.to_string(), *line))
                .collect(),
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransformCall> {
        self.calls.lock().clone()
    }

    pub fn backup_table(table: &str) -> String {
        format!("{}_{}", PREFIX, table)
    }
}

impl BackupTransformer for StaticTransformer {
    fn transform(
        &self,
        engine: Engine,
        statement: &str,
        source_database: &str,
        backup_database: &str,
        prefix: &str,
    ) -> Result<Vec<BackupTableDescriptor>> {
        self.calls.lock().push(TransformCall {
            engine,
            statement: statement.to_string(),
            source_database: source_database.to_string(),
            backup_database: backup_database.to_string(),
            prefix: prefix.to_string(),
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transform("unsupported statement".to_string()));
        }
        Ok(self
            .tables
            .iter()
            .map(|(table, line)| {
                let table_name = format!("{}_{}", prefix, table);
                BackupTableDescriptor {
                    statement: format!(
                        "CREATE TABLE `{}`.`{}` AS SELECT * FROM `{}`.`{}`",
                        backup_database, table_name, source_database, table
                    ),
                    table_name,
                    original_line: *line,
                }
            })
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingSyncer {
    fail: AtomicBool,
    calls: Mutex<Vec<(String, bool)>>,
}

impl RecordingSyncer {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SchemaSyncer for RecordingSyncer {
    async fn sync_database_schema(&self, database: &Database, force: bool) -> Result<()> {
        self.calls
            .lock()
            .push((database.qualified_name(), force));
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::SchemaSync("metadata fetch timed out".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMigrationRunner {
    requests: Mutex<Vec<(i64, MigrationRequest)>>,
}

impl RecordingMigrationRunner {
    pub fn requests(&self) -> Vec<(i64, MigrationRequest)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl MigrationRunner for RecordingMigrationRunner {
    async fn run_migration(
        &self,
        _ctx: &OpContext,
        _driver_ctx: &OpContext,
        _task: &Task,
        task_run_id: i64,
        request: MigrationRequest,
    ) -> RunOnceOutcome {
        let version = request.schema_version.clone();
        self.requests.lock().push((task_run_id, request));
        RunOnceOutcome::done(TaskRunResult {
            detail: "applied".to_string(),
            change_history: None,
            version,
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub drivers: Arc<RecordingDriverFactory>,
    pub transformer: Arc<StaticTransformer>,
    pub syncer: Arc<RecordingSyncer>,
    pub runner: Arc<RecordingMigrationRunner>,
    pub status: SharedStatusRegistry,
    pub clock: FixedClock,
    pub config: RunnerConfig,
}

impl Harness {
    pub fn new(engine: Engine, tables: &[(&str, u32)]) -> Self {
        let now = Local
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .expect("unambiguous local time");
        Self {
            store: Arc::new(MemoryStore::seeded(engine)),
            drivers: Arc::new(RecordingDriverFactory::default()),
            transformer: Arc::new(StaticTransformer::new(tables)),
            syncer: Arc::new(RecordingSyncer::default()),
            runner: Arc::new(RecordingMigrationRunner::default()),
            status: new_shared_registry(),
            clock: FixedClock(now),
            config: RunnerConfig::default(),
        }
    }

    pub fn coordinator(&self) -> PreUpdateBackup {
        PreUpdateBackup::new(
            self.store.clone(),
            self.drivers.clone(),
            self.transformer.clone(),
            self.syncer.clone(),
            Arc::new(self.clock),
            self.config.clone(),
        )
    }

    pub fn executor(&self) -> DataUpdateExecutor {
        let deps = ExecutorDeps::new(
            self.store.clone(),
            self.drivers.clone(),
            self.transformer.clone(),
            self.syncer.clone(),
            self.runner.clone(),
            self.status.clone(),
        )
        .with_clock(Arc::new(self.clock));
        DataUpdateExecutor::new(deps, self.config.clone())
    }

    pub fn task(&self, payload: &str) -> Task {
        Task {
            id: TASK_ID,
            pipeline_id: PIPELINE_ID,
            stage_id: STAGE_ID,
            instance_id: INSTANCE_UID,
            database_id: Some(SOURCE_DB_UID),
            payload: payload.to_string(),
        }
    }
}

pub fn payload_with_backup(database: &str) -> String {
    serde_json::json!({
        "sheetId": SHEET_ID,
        "schemaVersion": "20240102-dml",
        "preUpdateBackupDetail": { "database": database },
    })
    .to_string()
}

pub fn backup_target() -> String {
    format!("{}/{}", INSTANCE_ID, BACKUP_DB)
}
