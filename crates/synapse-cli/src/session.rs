//! Session state files.

use std::path::Path;
use synapse_types::config::SynapseConfig;
use synapse_types::error::SynapseResult;
use synapse_types::memory::SessionState;
use tracing::info;

/// Load the state at `path`, or a freshly seeded one if the file is missing.
pub fn load_or_seed(path: &Path, config: &SynapseConfig) -> SynapseResult<SessionState> {
    if !path.exists() {
        info!(path = %path.display(), "No state file, starting from a seeded session");
        return Ok(seed(config));
    }
    let contents = std::fs::read_to_string(path)?;
    let state: SessionState = serde_json::from_str(&contents)?;
    Ok(state)
}

/// A fresh state for the configured persona.
pub fn seed(config: &SynapseConfig) -> SessionState {
    SessionState::seeded(&config.persona_root_id, &config.persona_name)
}

/// Write `state` to `path` as pretty JSON, creating parent directories.
pub fn save(path: &Path, state: &SessionState) -> SynapseResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "Session state saved");
    Ok(())
}

/// Rebuild a command line from already-split words. Special characters are
/// backslash-escaped rather than quoted so `--key=value` words stay flags.
pub fn join_command(words: &[String]) -> String {
    words
        .iter()
        .map(|w| {
            if w.is_empty() {
                return "\"\"".to_string();
            }
            let mut out = String::with_capacity(w.len());
            for c in w.chars() {
                if c.is_whitespace() || matches!(c, '"' | '\'' | '\\') {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_types::vfs::VfsNode;

    #[test]
    fn test_missing_file_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_or_seed(&dir.path().join("none.json"), &SynapseConfig::default()).unwrap();
        assert_eq!(state.graph.nodes.len(), 1);
        assert_eq!(state.graph.nodes[0].id, "root");
        assert!(state.memories.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut state = seed(&SynapseConfig::default());
        let mut root = VfsNode::empty_folder();
        if let VfsNode::Folder { children } = &mut root {
            children.insert("a.txt".to_string(), std::sync::Arc::new(VfsNode::file("hi")));
        }
        state.vfs = std::sync::Arc::new(root);

        save(&path, &state).unwrap();
        let loaded = load_or_seed(&path, &SynapseConfig::default()).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_or_seed(&path, &SynapseConfig::default()).is_err());
    }

    #[test]
    fn test_join_command_escapes_words() {
        let words: Vec<String> = ["write", "/notes/a.txt", "hello world", "--parent=root"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            join_command(&words),
            r"write /notes/a.txt hello\ world --parent=root"
        );

        let words = vec!["write".to_string(), "/q.txt".to_string(), r#"say "hi""#.to_string()];
        assert_eq!(join_command(&words), r#"write /q.txt say\ \"hi\""#);

        let words = vec!["touch".to_string(), String::new()];
        assert_eq!(join_command(&words), r#"touch """#);
    }
}
