//! Clap CLI definitions for Synapse.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
\x1b[1;36mExamples:\x1b[0m
  synapse init --state session.json
  synapse term --state session.json --save write /notes/a.txt \"hello world\" --parent=root
  synapse exec --state session.json --tool search_graph --args '{\"query\":\"hello\"}'
  synapse tools";

/// Synapse: tool execution engine for a knowledge-graph agent.
#[derive(Parser)]
#[command(name = "synapse", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every tool definition as JSON.
    Tools,
    /// Write a fresh session state (persona root, empty filesystem).
    Init {
        /// Session state file.
        #[arg(long)]
        state: PathBuf,
    },
    /// Run one tool call against a session state.
    Exec {
        /// Session state file (seeded when missing).
        #[arg(long)]
        state: PathBuf,
        /// Tool name.
        #[arg(long)]
        tool: String,
        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Persist the resulting snapshots back to the state file.
        #[arg(long)]
        save: bool,
        /// Print the audit events recorded by this run.
        #[arg(long)]
        audit: bool,
    },
    /// Run a terminal command against the virtual filesystem.
    Term {
        /// Session state file (seeded when missing).
        #[arg(long)]
        state: PathBuf,
        /// Persist the resulting snapshots back to the state file.
        #[arg(long)]
        save: bool,
        /// The command, e.g. `ls /notes`.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}
