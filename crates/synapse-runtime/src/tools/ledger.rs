//! Session memory ledger: `remember` and `recall`.

use super::ToolOutput;
use crate::args::{RecallArgs, RememberArgs};
use chrono::Utc;
use synapse_types::error::SynapseResult;
use synapse_types::memory::MemoryEntry;
use tracing::info;
use uuid::Uuid;

pub fn remember(memories: &[MemoryEntry], args: RememberArgs) -> SynapseResult<ToolOutput> {
    args.validate()?;
    let entry = MemoryEntry {
        id: Uuid::new_v4().to_string(),
        text: args.text.trim().to_string(),
        tags: args
            .tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
        created_at: Utc::now(),
    };
    info!(memory_id = %entry.id, tags = ?entry.tags, "Remembered");

    let mut next = memories.to_vec();
    let content = format!("Remembered ({} entries in ledger).", memories.len() + 1);
    next.push(entry);
    Ok(ToolOutput {
        content,
        memories: Some(next),
        ..Default::default()
    })
}

/// Keyword search: an entry matches when every query word appears in its
/// text or tags. Newest first. An empty query lists the newest entries.
pub fn recall(memories: &[MemoryEntry], args: RecallArgs) -> SynapseResult<ToolOutput> {
    let words: Vec<String> = args
        .query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();
    let hits: Vec<&MemoryEntry> = memories
        .iter()
        .rev()
        .filter(|m| {
            let text = m.text.to_lowercase();
            words
                .iter()
                .all(|w| text.contains(w.as_str()) || m.tags.iter().any(|t| t == w))
        })
        .take(args.limit)
        .collect();

    if hits.is_empty() {
        return Ok(ToolOutput::text("Nothing remembered matches."));
    }
    let lines: Vec<String> = hits
        .iter()
        .map(|m| {
            if m.tags.is_empty() {
                format!("- {}", m.text)
            } else {
                format!("- {} [{}]", m.text, m.tags.join(", "))
            }
        })
        .collect();
    Ok(ToolOutput::text(lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remember_all(notes: &[(&str, &[&str])]) -> Vec<MemoryEntry> {
        let mut ledger = Vec::new();
        for (text, tags) in notes {
            let args = RememberArgs {
                text: text.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            };
            ledger = remember(&ledger, args).unwrap().memories.unwrap();
        }
        ledger
    }

    #[test]
    fn test_remember_is_copy_on_write() {
        let first = remember_all(&[("user prefers tabs", &["Style"])]);
        let out = remember(
            &first,
            RememberArgs {
                text: "second".into(),
                tags: vec![],
            },
        )
        .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(out.memories.unwrap().len(), 2);
        assert_eq!(first[0].tags, vec!["style"]);
    }

    #[test]
    fn test_recall_matches_words_and_tags() {
        let ledger = remember_all(&[
            ("deploy runs on fridays", &["ops"]),
            ("user prefers tabs", &["style"]),
            ("ops pager rotates weekly", &[]),
        ]);
        let out = recall(&ledger, RecallArgs { query: "ops".into(), limit: 5 }).unwrap();
        assert_eq!(
            out.content,
            "- ops pager rotates weekly\n- deploy runs on fridays [ops]"
        );
        let out = recall(&ledger, RecallArgs { query: "TABS user".into(), limit: 5 }).unwrap();
        assert_eq!(out.content, "- user prefers tabs [style]");
        let out = recall(&ledger, RecallArgs { query: "".into(), limit: 1 }).unwrap();
        assert_eq!(out.content, "- ops pager rotates weekly");
        let out = recall(&ledger, RecallArgs { query: "nothing".into(), limit: 5 }).unwrap();
        assert!(out.memories.is_none());
    }

    #[test]
    fn test_blank_text_rejected() {
        assert!(remember(&[], RememberArgs { text: " ".into(), tags: vec![] }).is_err());
    }
}
