//! Core types for the Synapse agent tool engine.
//!
//! Defines the shared data structures used by the stores, the request queue,
//! and the tool dispatcher: VFS nodes, knowledge-graph nodes and links, audit
//! events, queued requests, tool calls and results. It contains no business
//! logic.

pub mod audit;
pub mod completion;
pub mod config;
pub mod error;
pub mod graph;
pub mod memory;
pub mod tool;
pub mod vfs;
