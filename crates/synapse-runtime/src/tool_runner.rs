//! Tool dispatcher.
//!
//! Resolves a tool name through [`ToolKind`], validates its arguments, runs
//! the handler against the caller's snapshots and wraps the result in a
//! [`ToolOutcome`]. Handler errors and panics never escape: they become
//! failed envelopes. Each call records exactly one AGENT_ACTION audit event.

use crate::args::{parse_args, ToolKind};
use crate::queue::RequestQueue;
use crate::str_utils::preview;
use crate::tools::{ai, code_check, fs, graph, ledger, task, terminal, ToolContext, ToolOutput};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use synapse_memory::audit::AuditLog;
use synapse_types::audit::{AuditDomain, FAILURE_MARKER};
use synapse_types::config::SynapseConfig;
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::memory::SessionState;
use synapse_types::tool::{ToolCall, ToolDefinition, ToolOutcome};
use tracing::{debug, warn};

/// Executes tool calls against session snapshots.
pub struct ToolRunner {
    ctx: ToolContext,
    audit: Arc<AuditLog>,
}

impl ToolRunner {
    /// Create a runner. The queue is the only route to the generative
    /// service; pass [`RequestQueue::unavailable`] when there is no client.
    pub fn new(audit: Arc<AuditLog>, queue: Arc<RequestQueue>, config: Arc<SynapseConfig>) -> Self {
        Self {
            ctx: ToolContext::new(audit.clone(), queue, config),
            audit,
        }
    }

    /// The handler context (stores, queue, config).
    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Execute one tool call. Never fails; see [`ToolOutcome::is_error`].
    pub async fn execute_tool(&self, call: &ToolCall, state: &SessionState) -> ToolOutcome {
        let preview_chars = self.ctx.config.result_preview_chars;
        let args_preview = preview(&call.input.to_string(), preview_chars);

        let Some(kind) = ToolKind::from_name(&call.name) else {
            warn!(tool = %call.name, "Unknown tool");
            let content = format!(
                "{}. Available tools: {}.",
                SynapseError::UnknownTool(call.name.clone()),
                ToolKind::all().map(|k| k.name()).collect::<Vec<_>>().join(", ")
            );
            self.audit.record(
                AuditDomain::AgentAction,
                call.name.as_str(),
                format!("args: {args_preview} | unknown tool"),
            );
            return ToolOutcome {
                tool_use_id: call.id.clone(),
                tool_name: call.name.clone(),
                content,
                is_error: false,
                ..Default::default()
            };
        };

        debug!(tool = %kind, tool_use_id = %call.id, "Executing tool");
        self.settle(call, kind, &args_preview, self.dispatch(kind, &call.input, state))
            .await
    }

    /// Await a handler with panics contained, record the call and build the
    /// envelope.
    async fn settle<F>(
        &self,
        call: &ToolCall,
        kind: ToolKind,
        args_preview: &str,
        handler: F,
    ) -> ToolOutcome
    where
        F: Future<Output = SynapseResult<ToolOutput>>,
    {
        let preview_chars = self.ctx.config.result_preview_chars;
        let result = match AssertUnwindSafe(handler).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(SynapseError::Internal(format!(
                "tool handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        match result {
            Ok(output) => {
                self.audit.record(
                    AuditDomain::AgentAction,
                    kind.name(),
                    format!(
                        "args: {args_preview} | result: {}",
                        preview(&output.content, preview_chars)
                    ),
                );
                into_outcome(call, output)
            }
            Err(e) => {
                warn!(tool = %kind, error = %e, "Tool failed");
                self.audit.record(
                    AuditDomain::AgentAction,
                    kind.name(),
                    format!("args: {args_preview} | {FAILURE_MARKER}: {e}"),
                );
                ToolOutcome {
                    tool_use_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    content: format!("Error: {e}"),
                    is_error: true,
                    ..Default::default()
                }
            }
        }
    }

    async fn dispatch(
        &self,
        kind: ToolKind,
        input: &serde_json::Value,
        state: &SessionState,
    ) -> SynapseResult<ToolOutput> {
        let ctx = &self.ctx;
        match kind {
            // Graph
            ToolKind::UpsertNode => graph::upsert_node(ctx, &state.graph, parse_args(kind, input)?),
            ToolKind::CreateLink => graph::create_link(ctx, &state.graph, parse_args(kind, input)?),
            ToolKind::MergeNodes => graph::merge_nodes(ctx, &state.graph, parse_args(kind, input)?),
            ToolKind::RelinkNode => graph::relink_node(ctx, &state.graph, parse_args(kind, input)?),
            ToolKind::DeleteNode => graph::delete_node(ctx, &state.graph, parse_args(kind, input)?),
            ToolKind::SearchGraph => graph::search_graph(ctx, &state.graph, parse_args(kind, input)?),

            // Filesystem
            ToolKind::ReadFile => fs::read_file(ctx, &state.vfs, parse_args(kind, input)?),
            ToolKind::WriteFile => fs::write_file(ctx, &state.vfs, parse_args(kind, input)?),
            ToolKind::ListDirectory => fs::list_directory(ctx, &state.vfs, parse_args(kind, input)?),
            ToolKind::CreateDirectory => {
                fs::create_directory(ctx, &state.vfs, parse_args(kind, input)?)
            }
            ToolKind::DeletePath => fs::delete_path(ctx, &state.vfs, parse_args(kind, input)?),

            // Terminal and static checks
            ToolKind::RunTerminalCommand => {
                terminal::run_terminal_command(ctx, state, parse_args(kind, input)?)
            }
            ToolKind::RunCode => code_check::run_code(ctx, parse_args(kind, input)?),

            // Generative
            ToolKind::QuantumInquiry => {
                ai::quantum_inquiry(ctx, &state.graph, parse_args(kind, input)?).await
            }
            ToolKind::SynthesizeKnowledge => {
                ai::synthesize_knowledge(ctx, &state.graph, parse_args(kind, input)?).await
            }
            ToolKind::GenerateImage => ai::generate_image(ctx, parse_args(kind, input)?).await,
            ToolKind::GenerateCommitMessage => {
                ai::generate_commit_message(ctx, parse_args(kind, input)?).await
            }
            ToolKind::ReviewFailures => ai::review_failures(ctx, parse_args(kind, input)?),

            // Tasks and memory
            ToolKind::UpdateTaskStatus => {
                task::update_task_status(&state.graph, parse_args(kind, input)?)
            }
            ToolKind::Remember => ledger::remember(&state.memories, parse_args(kind, input)?),
            ToolKind::Recall => ledger::recall(&state.memories, parse_args(kind, input)?),
        }
    }
}

fn into_outcome(call: &ToolCall, output: ToolOutput) -> ToolOutcome {
    ToolOutcome {
        tool_use_id: call.id.clone(),
        tool_name: call.name.clone(),
        content: output.content,
        is_error: false,
        new_graph: output.graph.map(Arc::new),
        new_vfs: output.vfs.map(Arc::new),
        new_memories: output.memories.map(Arc::new),
        generated_image: output.generated_image,
        commit_message: output.commit_message,
        task_status: output.task_status,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Definitions for every tool, advertised to the agent.
pub fn builtin_tool_definitions() -> Vec<ToolDefinition> {
    let node_types: Vec<&str> = synapse_types::graph::NodeType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect();
    let link_types: Vec<&str> = synapse_types::graph::LinkType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect();

    vec![
        // --- Knowledge graph tools ---
        ToolDefinition {
            name: "upsert_node".to_string(),
            description: "Create a node under a parent, or update an existing node by id. Giving parentId on update moves the node.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Existing node id (omit to create)" },
                    "name": { "type": "string", "description": "Node name (required when creating)" },
                    "content": { "type": "string", "description": "Node content" },
                    "type": { "type": "string", "enum": node_types, "description": "Node type" },
                    "parentId": { "type": "string", "description": "Parent node id (required when creating)" }
                }
            }),
        },
        ToolDefinition {
            name: "create_link".to_string(),
            description: "Create a typed, directed link between two existing nodes.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "sourceId": { "type": "string", "description": "Source node id" },
                    "targetId": { "type": "string", "description": "Target node id" },
                    "type": { "type": "string", "enum": link_types, "description": "Link type" },
                    "label": { "type": "string", "description": "Optional label" },
                    "strength": { "type": "number", "description": "Strength in [0, 1]" }
                },
                "required": ["sourceId", "targetId", "type"]
            }),
        },
        ToolDefinition {
            name: "merge_nodes".to_string(),
            description: "Replace two or more nodes with one abstract-concept node. Links touching the merged nodes are removed.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "nodeIds": { "type": "array", "items": { "type": "string" }, "description": "Ids of the nodes to merge (at least two)" },
                    "newName": { "type": "string", "description": "Name of the merged node" },
                    "newContent": { "type": "string", "description": "Content of the merged node" }
                },
                "required": ["nodeIds", "newName"]
            }),
        },
        ToolDefinition {
            name: "relink_node".to_string(),
            description: "Move a node under a new hierarchical parent.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "nodeId": { "type": "string", "description": "Node to move" },
                    "newParentId": { "type": "string", "description": "New parent node id" }
                },
                "required": ["nodeId", "newParentId"]
            }),
        },
        ToolDefinition {
            name: "delete_node".to_string(),
            description: "Delete a node and every link touching it. The persona root cannot be deleted.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "nodeId": { "type": "string", "description": "Node to delete" }
                },
                "required": ["nodeId"]
            }),
        },
        ToolDefinition {
            name: "search_graph".to_string(),
            description: "Search node names and contents (case-insensitive).".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to look for" },
                    "type": { "type": "string", "enum": node_types, "description": "Only nodes of this type" },
                    "limit": { "type": "integer", "description": "Max results (default 10)" }
                }
            }),
        },
        // --- Virtual filesystem tools ---
        ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a file from the virtual filesystem.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "The file path to read" }
                },
                "required": ["path"]
            }),
        },
        ToolDefinition {
            name: "write_file".to_string(),
            description: "Write a file, creating parent folders as needed.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "The file path to write to" },
                    "content": { "type": "string", "description": "The content to write" }
                },
                "required": ["path", "content"]
            }),
        },
        ToolDefinition {
            name: "list_directory".to_string(),
            description: "List a folder in the virtual filesystem.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "The folder to list (default /)" }
                }
            }),
        },
        ToolDefinition {
            name: "create_directory".to_string(),
            description: "Create a folder and any missing parents.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "The folder path" }
                },
                "required": ["path"]
            }),
        },
        ToolDefinition {
            name: "delete_path".to_string(),
            description: "Delete a file or a folder with everything in it.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "The path to delete" }
                },
                "required": ["path"]
            }),
        },
        // --- Terminal and code ---
        ToolDefinition {
            name: "run_terminal_command".to_string(),
            description: "Run a command against the virtual filesystem: ls [path], cat <path>, write <path> <content> [--parent=<nodeId>], mkdir <path>, touch <path>, check <path> [--lang=<language>].".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The command line; quote arguments containing spaces" }
                },
                "required": ["command"]
            }),
        },
        ToolDefinition {
            name: "run_code".to_string(),
            description: "Statically check code for bracket, string and (for JSON) parse errors. The code is never executed.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string", "description": "Source code to check" },
                    "language": { "type": "string", "description": "json, javascript, typescript, rust, python, c, java, go, css or text" }
                },
                "required": ["code"]
            }),
        },
        // --- Generative tools ---
        ToolDefinition {
            name: "quantum_inquiry".to_string(),
            description: "Ask the generative model an open question and record the answer as a quantum-insight node under the persona root.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "inquiry": { "type": "string", "description": "The question" }
                },
                "required": ["inquiry"]
            }),
        },
        ToolDefinition {
            name: "synthesize_knowledge".to_string(),
            description: "Find the nodes relevant to a topic and synthesize a new insight from them, linked back to its sources.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "What to synthesize about" },
                    "maxSources": { "type": "integer", "description": "Max source nodes (default 8)" }
                },
                "required": ["topic"]
            }),
        },
        ToolDefinition {
            name: "generate_image".to_string(),
            description: "Generate an image from a prompt.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "prompt": { "type": "string", "description": "Image description" }
                },
                "required": ["prompt"]
            }),
        },
        ToolDefinition {
            name: "generate_commit_message".to_string(),
            description: "Write a git commit message for a description or diff of changes.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "changes": { "type": "string", "description": "Description or diff of the changes" }
                },
                "required": ["changes"]
            }),
        },
        // --- Tasks, memory, diagnostics ---
        ToolDefinition {
            name: "update_task_status".to_string(),
            description: "Change the status of a task node.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "taskId": { "type": "string", "description": "Task node id" },
                    "status": { "type": "string", "enum": ["pending", "in-progress", "completed", "failed"] }
                },
                "required": ["taskId", "status"]
            }),
        },
        ToolDefinition {
            name: "remember".to_string(),
            description: "Store a note in the session memory ledger.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "What to remember" },
                    "tags": { "type": "array", "items": { "type": "string" }, "description": "Optional tags" }
                },
                "required": ["text"]
            }),
        },
        ToolDefinition {
            name: "recall".to_string(),
            description: "Search the session memory ledger. Every word must match the text or a tag.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Words to look for (empty lists the newest notes)" },
                    "limit": { "type": "integer", "description": "Max results (default 5)" }
                }
            }),
        },
        ToolDefinition {
            name: "review_failures".to_string(),
            description: "List recent failed generative requests.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Max failures (default 5)" }
                }
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn runner() -> (ToolRunner, Arc<AuditLog>) {
        let audit = Arc::new(AuditLog::new());
        let runner = ToolRunner::new(
            audit.clone(),
            Arc::new(RequestQueue::unavailable("no client in tests")),
            Arc::new(SynapseConfig::default()),
        );
        (runner, audit)
    }

    fn call(name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call-1".to_string(),
            name: name.to_string(),
            input,
        }
    }

    async fn exploding_handler() -> SynapseResult<ToolOutput> {
        panic!("handler blew up")
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_failed_envelope() {
        let (runner, audit) = runner();
        let call = call("run_code", json!({"code": "x"}));
        let outcome = runner
            .settle(&call, ToolKind::RunCode, "{}", exploding_handler())
            .await;

        assert!(outcome.is_error);
        assert!(outcome.content.starts_with("Error: "));
        assert!(outcome.content.contains("tool handler panicked: handler blew up"));
        assert!(!outcome.mutates());

        let events = audit.by_domain(AuditDomain::AgentAction);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "run_code");
        assert!(events[0].details.contains(FAILURE_MARKER));
        audit.verify_integrity().unwrap();
    }

    #[test]
    fn test_builtin_tool_definitions() {
        let tools = builtin_tool_definitions();
        assert_eq!(tools.len(), ToolKind::all().count());
        for kind in ToolKind::all() {
            assert!(
                tools.iter().any(|t| t.name == kind.name()),
                "missing definition for {kind}"
            );
        }
        for tool in &tools {
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_an_error() {
        let (runner, audit) = runner();
        let state = SessionState::seeded("root", "Persona");
        let outcome = runner.execute_tool(&call("fly", json!({})), &state).await;
        assert!(!outcome.is_error);
        assert!(outcome.content.starts_with("Unknown tool: fly."));
        assert!(!outcome.mutates());
        assert_eq!(audit.len(), 1);
    }

    #[tokio::test]
    async fn test_success_records_one_agent_action() {
        let (runner, audit) = runner();
        let state = SessionState::seeded("root", "Persona");
        let outcome = runner
            .execute_tool(
                &call("write_file", json!({"path": "/a/b.txt", "content": "hi"})),
                &state,
            )
            .await;
        assert!(!outcome.is_error, "{}", outcome.content);
        assert!(outcome.new_vfs.is_some());
        assert!(outcome.new_graph.is_none());

        let actions = audit.by_domain(AuditDomain::AgentAction);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "write_file");
        assert!(actions[0].details.contains("result: Wrote 2 bytes"));
        assert_eq!(audit.by_domain(AuditDomain::Vfs).len(), 1);
    }

    #[tokio::test]
    async fn test_failure_records_marker_and_keeps_state() {
        let (runner, audit) = runner();
        let state = SessionState::seeded("root", "Persona");
        let outcome = runner
            .execute_tool(
                &call("create_link", json!({"sourceId": "missing", "targetId": "root", "type": "related"})),
                &state,
            )
            .await;
        assert!(outcome.is_error);
        assert!(outcome.content.contains("Link endpoint not found"));
        assert!(!outcome.mutates());

        let actions = audit.by_domain(AuditDomain::AgentAction);
        assert_eq!(actions.len(), 1);
        assert!(actions[0].details.contains(FAILURE_MARKER));
        assert_eq!(audit.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_args_are_contained() {
        let (runner, _) = runner();
        let state = SessionState::default();
        let outcome = runner
            .execute_tool(&call("read_file", json!({"path": 7})), &state)
            .await;
        assert!(outcome.is_error);
        assert!(outcome.content.starts_with("Error: Invalid input: read_file:"));
    }

    #[tokio::test]
    async fn test_uninitialized_service_is_reported() {
        let (runner, _) = runner();
        let state = SessionState::seeded("root", "Persona");
        let outcome = runner
            .execute_tool(&call("quantum_inquiry", json!({"inquiry": "why?"})), &state)
            .await;
        assert!(outcome.is_error);
        assert!(outcome.content.contains("not initialized"));
        assert!(outcome.new_graph.is_none());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
