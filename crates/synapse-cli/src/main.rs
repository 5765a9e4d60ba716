//! Synapse CLI: runs tool calls against a session state file.
//!
//! Each invocation loads (or seeds) the session state, executes one tool call
//! through the dispatcher and prints the resulting envelope as JSON on stdout.
//! Logs go to stderr.

mod cli;
mod session;

use crate::cli::{Cli, Commands};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use synapse_memory::audit::{self, AuditLog};
use synapse_runtime::config::load_config;
use synapse_runtime::drivers::create_client;
use synapse_runtime::{builtin_tool_definitions, RequestQueue, ToolRunner};
use synapse_types::config::SynapseConfig;
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::tool::{ToolCall, ToolOutcome};
use tracing::warn;

fn init_tracing_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing_stderr();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> SynapseResult<()> {
    let config = load_config(cli.config.as_deref());
    match cli.command {
        Commands::Tools => cmd_tools(),
        Commands::Init { state } => cmd_init(&state, &config),
        Commands::Exec {
            state,
            tool,
            args,
            save,
            audit,
        } => {
            let input: serde_json::Value = serde_json::from_str(&args)
                .map_err(|e| SynapseError::InvalidInput(format!("--args is not valid JSON: {e}")))?;
            cmd_exec(config, &state, &tool, input, save, audit).await
        }
        Commands::Term {
            state,
            save,
            command,
        } => {
            let input = serde_json::json!({ "command": session::join_command(&command) });
            cmd_exec(config, &state, "run_terminal_command", input, save, false).await
        }
    }
}

fn cmd_tools() -> SynapseResult<()> {
    println!("{}", serde_json::to_string_pretty(&builtin_tool_definitions())?);
    Ok(())
}

fn cmd_init(path: &Path, config: &SynapseConfig) -> SynapseResult<()> {
    session::save(path, &session::seed(config))?;
    println!("Session state written to {}", path.display());
    Ok(())
}

/// Build the queue once. A missing client is reported here and every
/// generative tool then fails with `UninitializedService`.
fn build_queue(config: &SynapseConfig) -> RequestQueue {
    let client = create_client(&config.provider);
    if let Err(reason) = &client {
        warn!(%reason, "Generative service unavailable; AI tools will fail");
    }
    RequestQueue::with_config(client, &config.queue)
}

async fn cmd_exec(
    config: SynapseConfig,
    state_path: &Path,
    tool: &str,
    input: serde_json::Value,
    save: bool,
    show_audit: bool,
) -> SynapseResult<()> {
    let state = session::load_or_seed(state_path, &config)?;
    let audit_log: Arc<AuditLog> = audit::global();
    let first_seq = audit_log.len() as u64;

    let queue = Arc::new(build_queue(&config));
    let runner = ToolRunner::new(audit_log.clone(), queue, Arc::new(config));

    let call = ToolCall {
        id: format!("cli-{tool}"),
        name: tool.to_string(),
        input,
    };
    let outcome = runner.execute_tool(&call, &state).await;

    if save && outcome.mutates() {
        session::save(state_path, &outcome.apply_to(&state))?;
    }

    let mut envelope = envelope_json(&outcome);
    if show_audit {
        envelope["audit"] = serde_json::to_value(audit_log.since(first_seq))?;
    }
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// The envelope without the snapshots themselves.
fn envelope_json(outcome: &ToolOutcome) -> serde_json::Value {
    let mut changed = Vec::new();
    if outcome.new_graph.is_some() {
        changed.push("graph");
    }
    if outcome.new_vfs.is_some() {
        changed.push("vfs");
    }
    if outcome.new_memories.is_some() {
        changed.push("memories");
    }
    serde_json::json!({
        "toolUseId": outcome.tool_use_id,
        "toolName": outcome.tool_name,
        "isError": outcome.is_error,
        "content": outcome.content,
        "changed": changed,
        "generatedImage": outcome.generated_image,
        "commitMessage": outcome.commit_message,
        "taskStatus": outcome.task_status,
    })
}
