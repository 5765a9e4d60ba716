//! Synapse runtime: the tool dispatcher and everything it drives.
//!
//! Tool calls arrive as untyped JSON, are resolved and validated in
//! [`args`], executed by the handlers in [`tools`] against copy-on-write
//! snapshots, and wrapped into envelopes by [`tool_runner`]. Every request to
//! the generative service goes through the serialized [`queue`].

pub mod args;
pub mod config;
pub mod drivers;
pub mod queue;
pub mod str_utils;
pub mod tool_runner;
pub mod tools;

pub use queue::RequestQueue;
pub use tool_runner::{builtin_tool_definitions, ToolRunner};
