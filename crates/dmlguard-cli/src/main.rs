//! DMLGuard command-line tools.
//!
//! Offline helpers for operators: validate a data-update task payload and
//! preview the annotation each backup table would get on a given engine.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dmlguard_core::Engine;
use dmlguard_runner::RunnerConfig;

/// DMLGuard command-line tools
#[derive(Parser, Debug)]
#[command(name = "dmlguard")]
#[command(version, about = "Inspect data-update payloads and backup annotation plans")]
pub struct Args {
    /// Log filter, e.g. `debug` or `dmlguard_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a task payload and show its backup settings
    Payload {
        /// Payload file, or `-` for stdin
        source: PathBuf,
    },
    /// Show the annotation statement each backup table would receive
    Annotate {
        /// Database engine of the source instance
        #[arg(long)]
        engine: Engine,

        /// Backup database name
        #[arg(long)]
        backup_db: String,

        /// Issue the backup belongs to
        #[arg(long)]
        issue: i64,

        /// Backup tables, as `name` or `name:line`
        #[arg(required = true)]
        tables: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "dmlguard=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(args.command)
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Payload { source } => {
            let text = commands::read_payload(&source)?;
            print!("{}", commands::describe_payload(&text)?);
        }
        Command::Annotate {
            engine,
            backup_db,
            issue,
            tables,
        } => {
            let tables = tables
                .iter()
                .map(|table| commands::parse_table(table))
                .collect::<Result<Vec<_>>>()?;
            let config = RunnerConfig::default();
            tracing::debug!(engine = %engine, tables = tables.len(), "rendering annotation plan");
            print!(
                "{}",
                commands::describe_annotations(
                    &config.annotation_policy,
                    engine,
                    &backup_db,
                    issue,
                    &tables,
                )?
            );
        }
    }
    Ok(())
}
