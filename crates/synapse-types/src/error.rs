//! Shared error types for the Synapse system.

use thiserror::Error;

/// Top-level error type for the Synapse system.
#[derive(Error, Debug)]
pub enum SynapseError {
    /// A VFS path does not exist (or a listed path is not a folder).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A VFS path is structurally unusable (e.g. no filename component).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A path segment that must be a folder resolves to a file.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// The requested graph node was not found.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A node creation referenced a parent that does not exist.
    #[error("Missing parent node: {0}")]
    MissingParent(String),

    /// A link endpoint does not exist in the graph.
    #[error("Link endpoint not found: {source_id} -> {target_id}")]
    EndpointNotFound {
        /// Requested source node id.
        source_id: String,
        /// Requested target node id.
        target_id: String,
    },

    /// A terminal command was missing required arguments.
    #[error("Usage: {0}")]
    UsageError(String),

    /// A terminal command verb is not recognised.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The dispatcher has no handler for this tool name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A queued generative call reached a terminal failed state.
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// The generative client was never configured.
    #[error("Generative service not initialized: {0}")]
    UninitializedService(String),

    /// Tool arguments failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SynapseError {
    fn from(e: serde_json::Error) -> Self {
        SynapseError::Serialization(e.to_string())
    }
}

/// Alias for Result with SynapseError.
pub type SynapseResult<T> = Result<T, SynapseError>;
