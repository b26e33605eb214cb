//! Offline inspection commands.

use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

use dmlguard_core::{AnnotationPolicy, BackupTableDescriptor, Engine, TaskPayload};

/// Read a payload from `source`, or from stdin when it is `-`.
pub fn read_payload(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read payload from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source)
        .with_context(|| format!("failed to read payload from {}", source.display()))
}

/// Decode a payload and describe what the executor would do with it.
pub fn describe_payload(text: &str) -> Result<String> {
    let payload = TaskPayload::decode(text).context("malformed task payload")?;
    debug!(sheet_id = payload.sheet_id, "payload decoded");

    let mut out = String::new();
    writeln!(out, "sheet id:       {}", payload.sheet_id)?;
    let version = if payload.schema_version.is_empty() {
        "(none)"
    } else {
        payload.schema_version.as_str()
    };
    writeln!(out, "schema version: {}", version)?;

    match payload.backup() {
        Some(spec) => {
            let target = spec
                .target()
                .with_context(|| format!("invalid backup database {:?}", spec.database))?;
            writeln!(out, "backup:         enabled")?;
            writeln!(out, "  instance:     {}", target.instance_id)?;
            writeln!(out, "  database:     {}", target.database_name)?;
            writeln!(out, "  resource:     {}", target.resource_name())?;
        }
        None => writeln!(out, "backup:         disabled")?,
    }
    Ok(out)
}

/// A table argument, `name` or `name:line`.
pub fn parse_table(arg: &str) -> Result<BackupTableDescriptor> {
    let numbered = arg
        .rsplit_once(':')
        .filter(|(_, line)| !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()));
    let (name, line) = match numbered {
        Some((name, line)) => {
            let line = line
                .parse()
                .with_context(|| format!("invalid line number in {:?}", arg))?;
            (name, line)
        }
        None => (arg, 0),
    };
    if name.is_empty() {
        bail!("empty table name in {:?}", arg);
    }
    Ok(BackupTableDescriptor {
        table_name: name.to_string(),
        statement: String::new(),
        original_line: line,
    })
}

/// Render the annotation each table would receive.
pub fn describe_annotations(
    policy: &AnnotationPolicy,
    engine: Engine,
    backup_database: &str,
    issue_id: i64,
    tables: &[BackupTableDescriptor],
) -> Result<String> {
    let mut out = String::new();
    for table in tables {
        let plan = policy.plan(engine, backup_database, table, issue_id);
        match &plan.annotation {
            Some(annotation) => {
                write!(
                    out,
                    "{}\t{}\t{}",
                    table.table_name, annotation.target, annotation.statement
                )?;
                if let Some(line) = plan.original_line {
                    write!(out, "\tline {}", line)?;
                }
                writeln!(out)?;
            }
            None => writeln!(out, "{}\t-\tno annotation for {}", table.table_name, engine)?,
        }
    }
    Ok(out)
}
