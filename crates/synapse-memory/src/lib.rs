//! Memory substrate for Synapse.
//!
//! Holds the copy-on-write stores the tool dispatcher mutates:
//! - Virtual filesystem (path-copying folder tree)
//! - Knowledge graph (nodes and typed links)
//! - The hash-chained audit log every mutation is recorded in

pub mod audit;
pub mod knowledge;
pub mod path;
pub mod vfs;

pub use audit::AuditLog;
pub use knowledge::KnowledgeStore;
pub use vfs::VfsStore;
