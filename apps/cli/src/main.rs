//! `nervemind` — run a workflow definition against the execution core from
//! the command line.
//!
//! Exit codes, per the execution core's external-interfaces contract: `0`
//! success, `2` a fatal configuration error (bad workflow, unresolved
//! executor type, missing file), `3` the run failed, `4` the run was
//! cancelled.

mod config;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use nervemind_core::ExecutionId;
use nervemind_credential::{CredentialVault, InMemoryVault, Secret, SecretKind};
use nervemind_engine::WorkflowEngine;
use nervemind_execution::ExecutionStatus;
use nervemind_executor::ExecutorRegistry;
use nervemind_workflow::{TriggerKind, Workflow};
use serde_json::Value;

use config::AppConfig;
use store::{ExecutionRecord, FileExecutionStore};

#[derive(Parser)]
#[command(name = "nervemind", version, about = "Run and inspect NerveMind workflow executions")]
struct Cli {
    /// Path to a TOML config file. Defaults to the platform config dir.
    #[arg(long, global = true, env = "NERVEMIND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow definition to completion.
    Run {
        /// Path to the workflow's canonical JSON file.
        #[arg(long)]
        workflow: PathBuf,
        /// Seed input for the entry node: a literal JSON value, or
        /// `@path/to/file.json` to read it from disk.
        #[arg(long)]
        input: Option<String>,
    },
    /// Request cancellation of a previously started execution.
    Cancel {
        execution_id: String,
    },
    /// Print the recorded status of a previously started execution.
    Status {
        execution_id: String,
    },
}

fn main() -> Result<()> {
    nervemind_log::init_subscriber();
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load(Some(&config_path)).context("loading configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().context("starting async runtime")?;

    let exit_code = runtime.block_on(async move {
        match cli.command {
            Command::Run { workflow, input } => run_workflow(&workflow, input.as_deref(), &config).await,
            Command::Cancel { execution_id } => cancel_execution(&execution_id),
            Command::Status { execution_id } => print_status(&execution_id),
        }
    })?;

    std::process::exit(exit_code);
}

async fn run_workflow(workflow_path: &PathBuf, input: Option<&str>, config: &AppConfig) -> Result<i32> {
    let workflow: Workflow = serde_json::from_slice(
        &std::fs::read(workflow_path).with_context(|| format!("reading workflow file {}", workflow_path.display()))?,
    )
    .with_context(|| format!("parsing workflow file {}", workflow_path.display()))?;
    let input_value = load_input(input)?;

    let mut registry = ExecutorRegistry::new();
    nervemind_executors::register_builtins(&mut registry, config.blocked_executables.clone())
        .context("registering built-in executors")?;

    let vault = build_vault(config)?;
    let engine = WorkflowEngine::new(Arc::new(registry), vault, config.engine_settings());

    let started_at = Utc::now();
    match engine.execute(&workflow, TriggerKind::Manual, input_value).await {
        Err(err) => {
            eprintln!("error: {err}");
            Ok(2)
        }
        Ok(outcome) => {
            let finished_at = Utc::now();
            let record = ExecutionRecord {
                id: outcome.execution_id,
                workflow_id: workflow.id,
                status: outcome.status,
                trigger_type: "manual".to_string(),
                started_at,
                finished_at: Some(finished_at),
                duration_ms: Some(outcome.duration.as_millis() as u64),
                error_message: outcome.failure.as_ref().map(|f| format!("{}: {}", f.node_id, f.message)),
                output_json: serde_json::to_value(&outcome.node_outputs).ok(),
            };

            let store = FileExecutionStore::new(AppConfig::executions_dir());
            if let Err(e) = store.save(&record) {
                tracing::warn!("failed to persist execution record: {e}");
            }

            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(exit_code_for(record.status))
        }
    }
}

fn cancel_execution(execution_id: &str) -> Result<i32> {
    let id: ExecutionId = execution_id.parse().context("invalid execution id")?;
    let store = FileExecutionStore::new(AppConfig::executions_dir());
    match store.mark_cancelled(&id)? {
        None => {
            eprintln!("no execution record found for {id}");
            Ok(2)
        }
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(exit_code_for(record.status))
        }
    }
}

fn print_status(execution_id: &str) -> Result<i32> {
    let id: ExecutionId = execution_id.parse().context("invalid execution id")?;
    let store = FileExecutionStore::new(AppConfig::executions_dir());
    match store.load(&id)? {
        None => {
            eprintln!("no execution record found for {id}");
            Ok(2)
        }
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(exit_code_for(record.status))
        }
    }
}

fn exit_code_for(status: ExecutionStatus) -> i32 {
    match status {
        ExecutionStatus::Success => 0,
        ExecutionStatus::Failed => 3,
        ExecutionStatus::Cancelled => 4,
        // `WorkflowEngine::execute` only ever hands back a terminal status;
        // a non-terminal record here can only come from a `run` that was
        // killed mid-flight, which `cancel`/`status` otherwise handle.
        ExecutionStatus::Pending | ExecutionStatus::Running => 0,
    }
}

fn load_input(input: Option<&str>) -> Result<Value> {
    match input {
        None => Ok(Value::Null),
        Some(raw) => match raw.strip_prefix('@') {
            Some(path) => {
                let bytes = std::fs::read(path).with_context(|| format!("reading input file {path}"))?;
                serde_json::from_slice(&bytes).with_context(|| format!("parsing input file {path}"))
            }
            None => serde_json::from_str(raw).context("parsing --input as JSON"),
        },
    }
}

fn build_vault(config: &AppConfig) -> Result<Option<Arc<dyn CredentialVault>>> {
    if config.credentials.is_empty() {
        return Ok(None);
    }
    let vault = InMemoryVault::new();
    for entry in &config.credentials {
        let kind = match entry.kind.as_str() {
            "bearer" => SecretKind::BearerToken,
            "basic" => SecretKind::BasicAuth,
            "apiKey" => SecretKind::ApiKey,
            "custom" => SecretKind::Custom,
            other => anyhow::bail!("unknown credential kind {other:?} for credential {}", entry.id),
        };
        vault.insert(entry.id.clone(), entry.name.as_deref(), Secret::new(kind, entry.value.clone()));
    }
    Ok(Some(Arc::new(vault)))
}
