//! Google Gemini `generateContent` driver.

use super::CompletionClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use synapse_types::completion::{
    CompletionRequest, CompletionResponse, FunctionCall, GenerationConfig, InlineData,
};
use tracing::debug;
use zeroize::Zeroizing;

/// Gemini REST client.
pub struct GeminiClient {
    api_key: Zeroizing<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(api_key: String, base_url: String, timeout_secs: u64) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            api_key: Zeroizing::new(api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<&'a GenerationConfig>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

fn build_body(request: &CompletionRequest) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: request
            .contents
            .iter()
            .map(|c| Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(c)],
            })
            .collect(),
        system_instruction: request.system_instruction.as_deref().map(|s| Content {
            role: None,
            parts: vec![Part::text(s)],
        }),
        generation_config: request.config.as_ref(),
    }
}

/// Fold the first candidate's parts into one response.
fn fold_response(resp: GenerateResponse) -> Result<CompletionResponse, String> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or("Gemini returned no candidates")?;

    let mut out = CompletionResponse::default();
    for part in candidate.content.parts {
        if let Some(text) = part.text {
            out.text.push_str(&text);
        }
        if let Some(call) = part.function_call {
            out.function_calls.push(call);
        }
        if out.inline_data.is_none() {
            out.inline_data = part.inline_data;
        }
    }
    Ok(out)
}

#[async_trait]
impl CompletionClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, String> {
        let url = self.endpoint(&request.model);
        let body = build_body(&request);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Gemini request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Gemini returned {status}: {text}"));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| format!("Failed to parse Gemini response: {e}"))?;
        let out = fold_response(parsed)?;
        debug!(
            model = %request.model,
            chars = out.text.len(),
            calls = out.function_calls.len(),
            "Gemini completion"
        );
        Ok(out)
    }
}
