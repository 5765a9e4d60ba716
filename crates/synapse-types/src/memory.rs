//! Session memory ledger entries and the combined session state.

use crate::graph::Graph;
use crate::vfs::VfsNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A note the agent chose to remember.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    /// Unique id.
    pub id: String,
    /// The remembered text.
    pub text: String,
    /// Optional tags for recall.
    #[serde(default)]
    pub tags: Vec<String>,
    /// When it was remembered.
    pub created_at: DateTime<Utc>,
}

/// The snapshots a single tool call operates on.
///
/// Owned by the orchestration layer; handed to the dispatcher per call.
/// Cloning is cheap: every store sits behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Knowledge graph snapshot.
    #[serde(default)]
    pub graph: Arc<Graph>,
    /// Virtual filesystem root.
    #[serde(default)]
    pub vfs: Arc<VfsNode>,
    /// Memory ledger snapshot.
    #[serde(default)]
    pub memories: Arc<Vec<MemoryEntry>>,
}

impl SessionState {
    /// A fresh state: persona root node, empty VFS, no memories.
    pub fn seeded(root_id: &str, persona_name: &str) -> Self {
        Self {
            graph: Arc::new(Graph::seeded(root_id, persona_name)),
            vfs: Arc::new(VfsNode::empty_folder()),
            memories: Arc::new(Vec::new()),
        }
    }
}
