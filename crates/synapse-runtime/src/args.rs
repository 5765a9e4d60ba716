//! Tool names and typed tool arguments.
//!
//! Arguments arrive as an untyped JSON object. Each tool deserializes them
//! into its own struct; any missing or malformed field becomes
//! `SynapseError::InvalidInput` before the handler runs.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::graph::{LinkType, NodeType};
use synapse_types::tool::TaskStatus;

/// The closed set of tools the dispatcher knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    UpsertNode,
    CreateLink,
    MergeNodes,
    RelinkNode,
    DeleteNode,
    SearchGraph,
    ReadFile,
    WriteFile,
    ListDirectory,
    CreateDirectory,
    DeletePath,
    RunTerminalCommand,
    RunCode,
    QuantumInquiry,
    SynthesizeKnowledge,
    GenerateImage,
    GenerateCommitMessage,
    UpdateTaskStatus,
    Remember,
    Recall,
    ReviewFailures,
}

/// Every variant, in advertised order. Names come from [`ToolKind::name`].
const ALL_TOOLS: [ToolKind; 21] = [
    ToolKind::UpsertNode,
    ToolKind::CreateLink,
    ToolKind::MergeNodes,
    ToolKind::RelinkNode,
    ToolKind::DeleteNode,
    ToolKind::SearchGraph,
    ToolKind::ReadFile,
    ToolKind::WriteFile,
    ToolKind::ListDirectory,
    ToolKind::CreateDirectory,
    ToolKind::DeletePath,
    ToolKind::RunTerminalCommand,
    ToolKind::RunCode,
    ToolKind::QuantumInquiry,
    ToolKind::SynthesizeKnowledge,
    ToolKind::GenerateImage,
    ToolKind::GenerateCommitMessage,
    ToolKind::UpdateTaskStatus,
    ToolKind::Remember,
    ToolKind::Recall,
    ToolKind::ReviewFailures,
];

impl ToolKind {
    /// Resolve a tool name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().find(|kind| kind.name() == name)
    }

    /// The wire name.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::UpsertNode => "upsert_node",
            ToolKind::CreateLink => "create_link",
            ToolKind::MergeNodes => "merge_nodes",
            ToolKind::RelinkNode => "relink_node",
            ToolKind::DeleteNode => "delete_node",
            ToolKind::SearchGraph => "search_graph",
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::ListDirectory => "list_directory",
            ToolKind::CreateDirectory => "create_directory",
            ToolKind::DeletePath => "delete_path",
            ToolKind::RunTerminalCommand => "run_terminal_command",
            ToolKind::RunCode => "run_code",
            ToolKind::QuantumInquiry => "quantum_inquiry",
            ToolKind::SynthesizeKnowledge => "synthesize_knowledge",
            ToolKind::GenerateImage => "generate_image",
            ToolKind::GenerateCommitMessage => "generate_commit_message",
            ToolKind::UpdateTaskStatus => "update_task_status",
            ToolKind::Remember => "remember",
            ToolKind::Recall => "recall",
            ToolKind::ReviewFailures => "review_failures",
        }
    }

    /// Every tool, in table order.
    pub fn all() -> impl Iterator<Item = ToolKind> {
        ALL_TOOLS.into_iter()
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Deserialize `input` into the argument struct for `tool`.
///
/// `null` is treated as an empty object so tools without required fields
/// accept a bare call.
pub fn parse_args<T: DeserializeOwned>(tool: ToolKind, input: &serde_json::Value) -> SynapseResult<T> {
    let value = if input.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        input.clone()
    };
    serde_json::from_value(value).map_err(|e| SynapseError::InvalidInput(format!("{tool}: {e}")))
}

fn require_text(tool: ToolKind, field: &str, value: &str) -> SynapseResult<()> {
    if value.trim().is_empty() {
        return Err(SynapseError::InvalidInput(format!(
            "{tool}: '{field}' must not be empty"
        )));
    }
    Ok(())
}

fn de_node_type<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NodeType>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(d)? else {
        return Ok(None);
    };
    NodeType::parse(&raw).map(Some).ok_or_else(|| {
        let valid: Vec<&str> = NodeType::ALL.iter().map(|t| t.as_str()).collect();
        D::Error::custom(format!(
            "unknown node type '{raw}' (expected one of: {})",
            valid.join(", ")
        ))
    })
}

fn de_link_type<'de, D: Deserializer<'de>>(d: D) -> Result<LinkType, D::Error> {
    let raw = String::deserialize(d)?;
    LinkType::parse(&raw).ok_or_else(|| {
        let valid: Vec<&str> = LinkType::ALL.iter().map(|t| t.as_str()).collect();
        D::Error::custom(format!(
            "unknown link type '{raw}' (expected one of: {})",
            valid.join(", ")
        ))
    })
}

fn root_path() -> String {
    "/".to_string()
}

fn default_search_limit() -> usize {
    10
}

fn default_recall_limit() -> usize {
    5
}

fn default_max_sources() -> usize {
    8
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertNodeArgs {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "de_node_type")]
    pub node_type: Option<NodeType>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl UpsertNodeArgs {
    pub fn validate(&self) -> SynapseResult<()> {
        if self.id.is_none() {
            require_text(
                ToolKind::UpsertNode,
                "name",
                self.name.as_deref().unwrap_or_default(),
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkArgs {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type", deserialize_with = "de_link_type")]
    pub link_type: LinkType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub strength: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeNodesArgs {
    pub node_ids: Vec<String>,
    pub new_name: String,
    #[serde(default)]
    pub new_content: String,
}

impl MergeNodesArgs {
    pub fn validate(&self) -> SynapseResult<()> {
        require_text(ToolKind::MergeNodes, "newName", &self.new_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelinkNodeArgs {
    pub node_id: String,
    pub new_parent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNodeArgs {
    pub node_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchGraphArgs {
    #[serde(default)]
    pub query: String,
    #[serde(default, rename = "type", deserialize_with = "de_node_type")]
    pub node_type: Option<NodeType>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

/// Arguments for tools that take only a path.
#[derive(Debug, Deserialize)]
pub struct PathArgs {
    pub path: String,
}

impl PathArgs {
    pub fn validate(&self, tool: ToolKind) -> SynapseResult<()> {
        require_text(tool, "path", &self.path)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListDirectoryArgs {
    #[serde(default = "root_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct TerminalArgs {
    pub command: String,
}

#[derive(Debug, Deserialize)]
pub struct RunCodeArgs {
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InquiryArgs {
    pub inquiry: String,
}

impl InquiryArgs {
    pub fn validate(&self) -> SynapseResult<()> {
        require_text(ToolKind::QuantumInquiry, "inquiry", &self.inquiry)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeArgs {
    pub topic: String,
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

impl SynthesizeArgs {
    pub fn validate(&self) -> SynapseResult<()> {
        require_text(ToolKind::SynthesizeKnowledge, "topic", &self.topic)
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateImageArgs {
    pub prompt: String,
}

impl GenerateImageArgs {
    pub fn validate(&self) -> SynapseResult<()> {
        require_text(ToolKind::GenerateImage, "prompt", &self.prompt)
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitMessageArgs {
    /// Description or diff of the changes to summarize.
    pub changes: String,
}

impl CommitMessageArgs {
    pub fn validate(&self) -> SynapseResult<()> {
        require_text(ToolKind::GenerateCommitMessage, "changes", &self.changes)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskStatusArgs {
    pub task_id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct RememberArgs {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RememberArgs {
    pub fn validate(&self) -> SynapseResult<()> {
        require_text(ToolKind::Remember, "text", &self.text)
    }
}

#[derive(Debug, Deserialize)]
pub struct RecallArgs {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_recall_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReviewFailuresArgs {
    #[serde(default = "default_recall_limit")]
    pub limit: usize,
}
