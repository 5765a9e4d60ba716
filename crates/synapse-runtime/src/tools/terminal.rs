//! `run_terminal_command`: a small shell over the VFS snapshot.
//!
//! Verbs: `ls [path]`, `cat <path>`, `write <path> <content> [--parent=<id>]`,
//! `mkdir <path>`, `touch <path>`, `check <path> [--lang=<language>]`.

use super::code_check::{check, Language};
use super::{ToolContext, ToolOutput};
use crate::args::TerminalArgs;
use crate::str_utils::preview;
use std::collections::BTreeMap;
use synapse_memory::knowledge::NodeUpsert;
use synapse_memory::path::{extension, normalize, resolve};
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::graph::{NodeSource, NodeType};
use synapse_types::memory::SessionState;
use tracing::debug;

const USAGE_LS: &str = "ls [path]";
const USAGE_CAT: &str = "cat <path>";
const USAGE_WRITE: &str = "write <path> <content> [--parent=<nodeId>]";
const USAGE_MKDIR: &str = "mkdir <path>";
const USAGE_TOUCH: &str = "touch <path>";
const USAGE_CHECK: &str = "check <path> [--lang=<language>]";

/// Characters of file content copied into a file-reference node.
const REFERENCE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

/// Split a command line into tokens. Single and double quotes group words;
/// a backslash escapes the next character outside single quotes.
fn tokenize(line: &str) -> SynapseResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    in_token = true;
                }
            }
            (Some(_), _) => current.push(c),
            (None, '\'') | (None, '"') => {
                quote = Some(c);
                quoted = true;
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                    in_token = false;
                    quoted = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if quote.is_some() {
        return Err(SynapseError::InvalidInput(
            "unterminated quote in command".to_string(),
        ));
    }
    if in_token {
        tokens.push(Token {
            text: current,
            quoted,
        });
    }
    Ok(tokens)
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub verb: String,
    pub args: Vec<String>,
    pub flags: BTreeMap<String, Option<String>>,
}

impl ParsedCommand {
    pub fn parse(line: &str) -> SynapseResult<Self> {
        let mut tokens = tokenize(line)?.into_iter();
        let verb = tokens
            .next()
            .map(|t| t.text)
            .ok_or_else(|| SynapseError::UsageError(all_usages()))?;

        let mut args = Vec::new();
        let mut flags = BTreeMap::new();
        for token in tokens {
            match token.text.strip_prefix("--") {
                Some(flag) if !token.quoted && !flag.is_empty() => match flag.split_once('=') {
                    Some((k, v)) => {
                        flags.insert(k.to_string(), Some(v.to_string()));
                    }
                    None => {
                        flags.insert(flag.to_string(), None);
                    }
                },
                _ => args.push(token.text),
            }
        }
        Ok(Self { verb, args, flags })
    }

    fn arg(&self, idx: usize, usage: &str) -> SynapseResult<&str> {
        self.args
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| SynapseError::UsageError(usage.to_string()))
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(|v| v.as_deref())
    }
}

fn all_usages() -> String {
    [USAGE_LS, USAGE_CAT, USAGE_WRITE, USAGE_MKDIR, USAGE_TOUCH, USAGE_CHECK].join(" | ")
}

pub fn run_terminal_command(
    ctx: &ToolContext,
    state: &SessionState,
    args: TerminalArgs,
) -> SynapseResult<ToolOutput> {
    let cmd = ParsedCommand::parse(&args.command)?;
    debug!(verb = %cmd.verb, args = cmd.args.len(), "terminal command");
    match cmd.verb.as_str() {
        "ls" => ls(ctx, state, &cmd),
        "cat" => cat(ctx, state, &cmd),
        "write" => write(ctx, state, &cmd),
        "mkdir" => mkdir(ctx, state, &cmd),
        "touch" => touch(ctx, state, &cmd),
        "check" => check_file(ctx, state, &cmd),
        other => Err(SynapseError::UnknownCommand(other.to_string())),
    }
}

fn ls(ctx: &ToolContext, state: &SessionState, cmd: &ParsedCommand) -> SynapseResult<ToolOutput> {
    let path = cmd.args.first().map(String::as_str).unwrap_or("/");
    let entries = ctx.vfs.list(&state.vfs, path)?;
    if entries.is_empty() {
        return Ok(ToolOutput::text("(empty)"));
    }
    let lines: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
    Ok(ToolOutput::text(lines.join("\n")))
}

fn cat(ctx: &ToolContext, state: &SessionState, cmd: &ParsedCommand) -> SynapseResult<ToolOutput> {
    let path = cmd.arg(0, USAGE_CAT)?;
    Ok(ToolOutput::text(ctx.vfs.read_file(&state.vfs, path)?))
}

fn write(ctx: &ToolContext, state: &SessionState, cmd: &ParsedCommand) -> SynapseResult<ToolOutput> {
    let path = cmd.arg(0, USAGE_WRITE)?;
    cmd.arg(1, USAGE_WRITE)?;
    let content = cmd.args[1..].join(" ");
    let full = normalize(path);

    // Write first: a rejected path must leave no graph event behind.
    let vfs = ctx.vfs.write_file(&state.vfs, path, &content)?;

    let mut note = String::new();
    let mut graph = None;
    if let Some(parent) = cmd.flag("parent") {
        if state.graph.contains(parent) {
            let name = resolve(path).pop().unwrap_or_else(|| full.clone());
            let (next, outcome) = ctx.knowledge.upsert_node(
                &state.graph,
                NodeUpsert {
                    name: Some(name),
                    content: Some(preview(&content, REFERENCE_PREVIEW_CHARS)),
                    node_type: Some(NodeType::FileReference),
                    parent_id: Some(parent.to_string()),
                    linked_file: Some(full.clone()),
                    source: Some(NodeSource::Terminal),
                    ..Default::default()
                },
            )?;
            note = format!(" Linked as node '{}' under '{parent}'.", outcome.id());
            graph = Some(next);
        } else {
            note = format!(" Node '{parent}' not found; no graph reference created.");
        }
    }

    let mut out = ToolOutput::text(format!("Wrote {} bytes to {full}.{note}", content.len()))
        .with_vfs(vfs);
    out.graph = graph;
    Ok(out)
}

fn mkdir(ctx: &ToolContext, state: &SessionState, cmd: &ParsedCommand) -> SynapseResult<ToolOutput> {
    let path = cmd.arg(0, USAGE_MKDIR)?;
    let next = ctx.vfs.ensure_directory(&state.vfs, path)?;
    Ok(ToolOutput::text(format!("Created {}.", normalize(path))).with_vfs(next))
}

fn touch(ctx: &ToolContext, state: &SessionState, cmd: &ParsedCommand) -> SynapseResult<ToolOutput> {
    let path = cmd.arg(0, USAGE_TOUCH)?;
    match ctx.vfs.touch(&state.vfs, path)? {
        Some(next) => Ok(ToolOutput::text(format!("Created {}.", normalize(path))).with_vfs(next)),
        None => Ok(ToolOutput::text(format!("{} already exists.", normalize(path)))),
    }
}

fn check_file(ctx: &ToolContext, state: &SessionState, cmd: &ParsedCommand) -> SynapseResult<ToolOutput> {
    let path = cmd.arg(0, USAGE_CHECK)?;
    let code = ctx.vfs.read_file(&state.vfs, path)?;
    let language = match cmd.flag("lang") {
        Some(name) => Language::from_name(name).ok_or_else(|| {
            SynapseError::UsageError(format!("{USAGE_CHECK} (unsupported language '{name}')"))
        })?,
        None => extension(path)
            .map(|ext| Language::from_extension(&ext))
            .unwrap_or(Language::Plain),
    };
    let report = check(code, language);
    Ok(ToolOutput::text(format!("{}: {report}", normalize(path))))
}
