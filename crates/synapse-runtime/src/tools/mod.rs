//! Tool handlers.
//!
//! Each handler reads the snapshots in [`SessionState`], routes every
//! mutation through the copy-on-write stores, and returns a [`ToolOutput`]
//! holding the replacement snapshots. A handler that fails returns `Err`
//! and no snapshot, so nothing half-built escapes.

pub mod ai;
pub mod code_check;
pub mod fs;
pub mod graph;
pub mod ledger;
pub mod task;
pub mod terminal;

use crate::queue::RequestQueue;
use std::sync::Arc;
use synapse_memory::audit::AuditLog;
use synapse_memory::{KnowledgeStore, VfsStore};
use synapse_types::config::SynapseConfig;
use synapse_types::graph::Graph;
use synapse_types::memory::MemoryEntry;
use synapse_types::tool::{GeneratedImage, TaskStatusChange};
use synapse_types::vfs::VfsNode;

/// Shared collaborators handed to every handler.
#[derive(Clone)]
pub struct ToolContext {
    pub knowledge: KnowledgeStore,
    pub vfs: VfsStore,
    pub queue: Arc<RequestQueue>,
    pub config: Arc<SynapseConfig>,
}

impl ToolContext {
    /// Build the stores over `audit`.
    pub fn new(audit: Arc<AuditLog>, queue: Arc<RequestQueue>, config: Arc<SynapseConfig>) -> Self {
        Self {
            knowledge: KnowledgeStore::new(audit.clone()),
            vfs: VfsStore::new(audit),
            queue,
            config,
        }
    }

    /// Id of the persona root node.
    pub fn root_id(&self) -> &str {
        &self.config.persona_root_id
    }
}

/// What a successful handler produced.
#[derive(Debug, Default)]
pub struct ToolOutput {
    pub content: String,
    pub graph: Option<Graph>,
    pub vfs: Option<VfsNode>,
    pub memories: Option<Vec<MemoryEntry>>,
    pub generated_image: Option<GeneratedImage>,
    pub commit_message: Option<String>,
    pub task_status: Option<TaskStatusChange>,
}

impl ToolOutput {
    /// Text only, no state change.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_vfs(mut self, vfs: VfsNode) -> Self {
        self.vfs = Some(vfs);
        self
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> (ToolContext, Arc<AuditLog>) {
    let audit = Arc::new(AuditLog::new());
    let ctx = ToolContext::new(
        audit.clone(),
        Arc::new(RequestQueue::unavailable("no client in tests")),
        Arc::new(SynapseConfig::default()),
    );
    (ctx, audit)
}
