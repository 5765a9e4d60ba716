//! Tool call input, tool definition and tool result envelope types.

use crate::graph::Graph;
use crate::memory::{MemoryEntry, SessionState};
use crate::vfs::VfsNode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Definition of a tool that an agent can use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool identifier.
    pub name: String,
    /// Human-readable description for the LLM.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: serde_json::Value,
}

/// A tool call requested by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool use instance.
    pub id: String,
    /// Which tool to call.
    pub name: String,
    /// The input parameters (untyped at this boundary).
    #[serde(default)]
    pub input: serde_json::Value,
}

/// Lifecycle state of a task node, reported through the side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started.
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
    /// Abandoned or failed.
    Failed,
}

/// A request to change a task's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusChange {
    /// The task node id.
    pub task_id: String,
    /// The new status.
    pub status: TaskStatus,
}

/// An image produced by the generative service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// The prompt it was generated from.
    pub prompt: String,
    /// MIME type.
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

/// Result of a tool execution.
///
/// Carries new snapshots for the stores the tool changed; the caller commits
/// them as the new current state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    /// The tool_use ID this result corresponds to.
    pub tool_use_id: String,
    /// The tool name as requested.
    pub tool_name: String,
    /// The output content.
    pub content: String,
    /// Whether the tool execution resulted in an error.
    pub is_error: bool,
    /// Replacement graph snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_graph: Option<Arc<Graph>>,
    /// Replacement VFS snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_vfs: Option<Arc<VfsNode>>,
    /// Replacement memory ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_memories: Option<Arc<Vec<MemoryEntry>>>,
    /// Generated image side channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<GeneratedImage>,
    /// Commit message side channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Task status side channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatusChange>,
}

impl ToolOutcome {
    /// Whether this outcome replaces any store snapshot.
    pub fn mutates(&self) -> bool {
        self.new_graph.is_some() || self.new_vfs.is_some() || self.new_memories.is_some()
    }

    /// The state after committing this outcome's snapshots over `state`.
    pub fn apply_to(&self, state: &SessionState) -> SessionState {
        SessionState {
            graph: self.new_graph.clone().unwrap_or_else(|| state.graph.clone()),
            vfs: self.new_vfs.clone().unwrap_or_else(|| state.vfs.clone()),
            memories: self
                .new_memories
                .clone()
                .unwrap_or_else(|| state.memories.clone()),
        }
    }
}
