//! Configuration loading from `~/.synapse/config.toml`.

use std::path::{Path, PathBuf};
use synapse_types::config::SynapseConfig;
use tracing::{info, warn};

/// Load configuration from `path`, or the default location when `None`.
///
/// A missing, unreadable or invalid file falls back to defaults.
pub fn load_config(path: Option<&Path>) -> SynapseConfig {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        info!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return SynapseConfig::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<SynapseConfig>(&contents) {
            Ok(config) => {
                info!(path = %config_path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %config_path.display(),
                    "Failed to parse config, using defaults"
                );
                SynapseConfig::default()
            }
        },
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to read config file, using defaults"
            );
            SynapseConfig::default()
        }
    }
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    synapse_home().join("config.toml")
}

/// Get the Synapse home directory (`~/.synapse`).
pub fn synapse_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".synapse")
}
