//! Audit event types.

use serde::{Deserialize, Serialize};

/// Which part of the system an audit event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditDomain {
    /// Virtual filesystem mutation.
    Vfs,
    /// Knowledge graph mutation.
    Graph,
    /// Tool invocation outcome.
    AgentAction,
}

impl std::fmt::Display for AuditDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditDomain::Vfs => write!(f, "VFS"),
            AuditDomain::Graph => write!(f, "GRAPH"),
            AuditDomain::AgentAction => write!(f, "AGENT_ACTION"),
        }
    }
}

/// A single entry in the hash-chained audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonically increasing sequence number (0-indexed).
    pub seq: u64,
    /// RFC 3339 timestamp of when this entry was recorded.
    pub timestamp: String,
    /// Domain of the event.
    pub domain: AuditDomain,
    /// Short action tag (e.g. `write_file`, `merge_nodes`).
    pub action: String,
    /// Free-form detail (paths, ids, outcome).
    pub details: String,
    /// SHA-256 hash of the previous entry (or all-zeros for the genesis).
    pub prev_hash: String,
    /// SHA-256 hash of this entry's content concatenated with `prev_hash`.
    pub hash: String,
}

/// Marker prefixed to the details of a failed tool invocation.
pub const FAILURE_MARKER: &str = "FAILED";
