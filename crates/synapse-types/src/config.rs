//! Runtime configuration (`~/.synapse/config.toml`).

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapseConfig {
    /// Id of the core-persona node that insights and fallback merges hang from.
    pub persona_root_id: String,
    /// Display name for a freshly seeded persona root.
    pub persona_name: String,
    /// Max characters of a tool result kept in the AGENT_ACTION audit detail.
    pub result_preview_chars: usize,
    /// Model selection.
    pub models: ModelConfig,
    /// Generative provider settings.
    pub provider: ProviderConfig,
    /// Request queue settings.
    pub queue: QueueConfig,
}

impl Default for SynapseConfig {
    fn default() -> Self {
        Self {
            persona_root_id: "root".to_string(),
            persona_name: "Core Persona".to_string(),
            result_preview_chars: 500,
            models: ModelConfig::default(),
            provider: ProviderConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

/// Which model each kind of call uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// General-purpose calls (inquiry, commit messages).
    pub default: String,
    /// Cheap relevance filtering.
    pub filter: String,
    /// Expensive synthesis.
    pub synthesis: String,
    /// Image generation.
    pub image: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: "gemini-2.5-flash".to_string(),
            filter: "gemini-2.5-flash-lite".to_string(),
            synthesis: "gemini-2.5-pro".to_string(),
            image: "gemini-2.5-flash-image".to_string(),
        }
    }
}

/// Generative provider connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Request queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of request records retained for failure analysis.
    pub history_limit: usize,
    /// Max characters of response text kept as a result summary.
    pub summary_chars: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            history_limit: 200,
            summary_chars: 200,
        }
    }
}
