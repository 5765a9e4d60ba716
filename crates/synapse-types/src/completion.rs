//! Generative-service request/response types and request-queue records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sampling and output options for a completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Requested response MIME type (e.g. `application/json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Requested output modalities (e.g. `["IMAGE"]`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<String>,
}

/// A request to the generative service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Prompt contents, one entry per user turn.
    pub contents: Vec<String>,
    /// Optional system instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    /// Optional generation options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerationConfig>,
}

impl CompletionRequest {
    /// A single-turn text request.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            contents: vec![prompt.into()],
            system_instruction: None,
            config: None,
        }
    }

    /// Attach a system instruction.
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Attach generation options.
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// A function call proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments.
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Binary output (e.g. a generated image), base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type of the payload.
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

/// A response from the generative service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    /// Concatenated text output.
    pub text: String,
    /// Function calls, if the model proposed any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<FunctionCall>,
    /// First binary part, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl CompletionResponse {
    /// A text-only response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Lifecycle of a queued request. Moves from `Pending` to a terminal state
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Admitted, not yet finished.
    Pending,
    /// Completed successfully.
    Succeeded,
    /// Completed with an error.
    Failed,
}

impl RequestStatus {
    /// Whether this is `Succeeded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// Caller-provided metadata for a queued request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Which agent/handler issued the request.
    pub agent_label: String,
}

impl RequestMeta {
    /// Metadata for the given agent label.
    pub fn agent(label: impl Into<String>) -> Self {
        Self {
            agent_label: label.into(),
        }
    }
}

/// A record of one call that went through the request queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedRequest {
    /// Sequence number in submission order.
    pub seq: u64,
    /// The request payload.
    pub payload: CompletionRequest,
    /// When the request was enqueued.
    pub issued_at: DateTime<Utc>,
    /// When the request reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: RequestStatus,
    /// Issuing agent label.
    pub agent_label: String,
    /// Model identifier.
    pub model: String,
    /// Error text for failed requests.
    pub error: Option<String>,
    /// Trimmed response text for succeeded requests.
    pub result_summary: Option<String>,
}

/// Counts of queue records by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Requests still in flight or waiting.
    pub pending: usize,
    /// Requests that succeeded.
    pub succeeded: usize,
    /// Requests that failed.
    pub failed: usize,
}
