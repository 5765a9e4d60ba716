//! Generative-service drivers.
//!
//! The [`CompletionClient`] trait is the only shape the runtime knows about;
//! every call to it goes through the [`RequestQueue`](crate::queue::RequestQueue).

pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use synapse_types::completion::{CompletionRequest, CompletionResponse};
use synapse_types::config::ProviderConfig;

/// An asynchronous `complete(request) -> response | error` endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Run one completion. Errors are provider messages.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, String>;
}

/// Build the configured client, reading the API key from the environment.
///
/// Fails with a human-readable reason when the key is missing; callers
/// report it once and fall back to an unavailable queue.
pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn CompletionClient>, String> {
    let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
    if api_key.trim().is_empty() {
        return Err(format!("{} is not set", config.api_key_env));
    }
    let client = gemini::GeminiClient::new(api_key, config.base_url.clone(), config.timeout_secs)?;
    Ok(Arc::new(client))
}
