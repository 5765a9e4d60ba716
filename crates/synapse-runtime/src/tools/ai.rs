//! Tools backed by the generative service.
//!
//! Every call goes through the request queue. Store mutations happen only
//! after all of a handler's queued requests have succeeded.

use super::{ToolContext, ToolOutput};
use crate::args::{
    CommitMessageArgs, GenerateImageArgs, InquiryArgs, ReviewFailuresArgs, SynthesizeArgs,
};
use crate::str_utils::preview;
use std::collections::HashSet;
use synapse_types::completion::{CompletionRequest, GenerationConfig, RequestMeta};
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::graph::{Graph, LinkType, NodeType};
use synapse_types::tool::GeneratedImage;
use tracing::{debug, info};

const CATALOG_PREVIEW_CHARS: usize = 160;

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the filter stage's answer: a JSON array of ids, or an object with
/// an `ids` array.
fn parse_id_list(text: &str) -> SynapseResult<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        SynapseError::UpstreamFailure(format!("filter returned unparseable output: {e}"))
    })?;
    let list = match &value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => match map.get("ids") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(SynapseError::UpstreamFailure(
                    "filter returned an object without an 'ids' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(SynapseError::UpstreamFailure(
                "filter returned neither an array nor an object".to_string(),
            ))
        }
    };
    Ok(list
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

pub async fn quantum_inquiry(
    ctx: &ToolContext,
    graph: &Graph,
    args: InquiryArgs,
) -> SynapseResult<ToolOutput> {
    args.validate()?;
    let request = CompletionRequest::text(&ctx.config.models.default, args.inquiry.as_str())
        .with_system("Answer the inquiry with one concise, original insight.");
    let response = ctx
        .queue
        .enqueue(request, RequestMeta::agent("quantum_inquiry"))
        .await?;
    let insight = response.text.trim();
    if insight.is_empty() {
        return Err(SynapseError::UpstreamFailure(
            "the generative service returned no insight".to_string(),
        ));
    }

    let (next, id) = ctx
        .knowledge
        .insight_append(graph, ctx.root_id(), &args.inquiry, insight)?;
    Ok(ToolOutput::text(format!("Insight recorded as '{id}':\n{insight}")).with_graph(next))
}

/// Two stages: a cheap filter picks relevant node ids, then the synthesis
/// model writes an insight from them. An empty filter result ends the call
/// without the second stage.
pub async fn synthesize_knowledge(
    ctx: &ToolContext,
    graph: &Graph,
    args: SynthesizeArgs,
) -> SynapseResult<ToolOutput> {
    args.validate()?;
    let nothing = || {
        ToolOutput::text(format!(
            "Nothing relevant to '{}' found in the knowledge graph.",
            args.topic
        ))
    };

    let candidates: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type != NodeType::CorePersona)
        .collect();
    if candidates.is_empty() {
        return Ok(nothing());
    }
    let catalog: Vec<String> = candidates
        .iter()
        .map(|n| {
            format!(
                "{} | {} | {} | {}",
                n.id,
                n.name,
                n.node_type,
                preview(&n.content, CATALOG_PREVIEW_CHARS)
            )
        })
        .collect();

    let filter = CompletionRequest::text(
        &ctx.config.models.filter,
        format!(
            "Topic: {}\n\nNodes (id | name | type | content):\n{}",
            args.topic,
            catalog.join("\n")
        ),
    )
    .with_system("Return a JSON array with the ids of the nodes relevant to the topic. Return [] if none are.")
    .with_config(GenerationConfig {
        response_mime_type: Some("application/json".to_string()),
        ..Default::default()
    });
    let picked = ctx
        .queue
        .enqueue(filter, RequestMeta::agent("synthesize_knowledge/filter"))
        .await?;

    let mut seen = HashSet::new();
    let sources: Vec<String> = parse_id_list(&picked.text)?
        .into_iter()
        .filter(|id| graph.contains(id) && seen.insert(id.clone()))
        .take(args.max_sources)
        .collect();
    debug!(topic = %args.topic, sources = sources.len(), "synthesis filter done");
    if sources.is_empty() {
        return Ok(nothing());
    }

    let material: Vec<String> = sources
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|n| format!("## {} ({})\n{}", n.name, n.node_type, n.content))
        .collect();
    let synthesis = CompletionRequest::text(
        &ctx.config.models.synthesis,
        format!("Topic: {}\n\n{}", args.topic, material.join("\n\n")),
    )
    .with_system("Synthesize the material into one new insight about the topic.");
    let response = ctx
        .queue
        .enqueue(synthesis, RequestMeta::agent("synthesize_knowledge/synthesis"))
        .await?;
    let insight = response.text.trim();
    if insight.is_empty() {
        return Err(SynapseError::UpstreamFailure(
            "synthesis returned no text".to_string(),
        ));
    }

    let (mut next, id) = ctx
        .knowledge
        .insight_append(graph, ctx.root_id(), &args.topic, insight)?;
    for source in &sources {
        next = ctx.knowledge.create_link(
            &next,
            source,
            &id,
            LinkType::Supports,
            Some("synthesized into".to_string()),
            None,
        )?;
    }
    info!(insight_id = %id, sources = sources.len(), "Knowledge synthesized");
    Ok(ToolOutput::text(format!(
        "Synthesized '{id}' from {} node(s):\n{insight}",
        sources.len()
    ))
    .with_graph(next))
}

pub async fn generate_image(ctx: &ToolContext, args: GenerateImageArgs) -> SynapseResult<ToolOutput> {
    args.validate()?;
    let request = CompletionRequest::text(&ctx.config.models.image, args.prompt.as_str())
        .with_config(GenerationConfig {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            ..Default::default()
        });
    let response = ctx
        .queue
        .enqueue(request, RequestMeta::agent("generate_image"))
        .await?;
    let data = response.inline_data.ok_or_else(|| {
        SynapseError::UpstreamFailure("the generative service returned no image".to_string())
    })?;

    Ok(ToolOutput {
        content: format!(
            "Generated a {} image ({} bytes of base64).",
            data.mime_type,
            data.data.len()
        ),
        generated_image: Some(GeneratedImage {
            prompt: args.prompt,
            mime_type: data.mime_type,
            data: data.data,
        }),
        ..Default::default()
    })
}

pub async fn generate_commit_message(
    ctx: &ToolContext,
    args: CommitMessageArgs,
) -> SynapseResult<ToolOutput> {
    args.validate()?;
    let request = CompletionRequest::text(&ctx.config.models.default, args.changes.as_str())
        .with_system("Write a conventional git commit message for these changes. Return only the message.");
    let response = ctx
        .queue
        .enqueue(request, RequestMeta::agent("generate_commit_message"))
        .await?;
    let message = strip_code_fence(&response.text).to_string();
    if message.is_empty() {
        return Err(SynapseError::UpstreamFailure(
            "the generative service returned an empty commit message".to_string(),
        ));
    }
    Ok(ToolOutput {
        content: message.clone(),
        commit_message: Some(message),
        ..Default::default()
    })
}

/// Recent failed queue requests, for failure analysis.
pub fn review_failures(ctx: &ToolContext, args: ReviewFailuresArgs) -> SynapseResult<ToolOutput> {
    let failures = ctx.queue.recent_failures(args.limit);
    let stats = ctx.queue.stats();
    let header = format!(
        "Queue: {} pending, {} succeeded, {} failed.",
        stats.pending, stats.succeeded, stats.failed
    );
    if failures.is_empty() {
        return Ok(ToolOutput::text(format!("{header}\nNo failed requests recorded.")));
    }
    let lines: Vec<String> = failures
        .iter()
        .map(|r| {
            format!(
                "- #{} [{}] {} at {}: {}",
                r.seq,
                r.agent_label,
                r.model,
                r.issued_at.to_rfc3339(),
                r.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();
    Ok(ToolOutput::text(format!("{header}\n{}", lines.join("\n"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::CompletionClient;
    use crate::queue::RequestQueue;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use synapse_memory::audit::AuditLog;
    use synapse_memory::knowledge::NodeUpsert;
    use synapse_types::completion::{CompletionResponse, InlineData};
    use synapse_types::config::SynapseConfig;

    /// Replies from a script, in order, and keeps every request it saw.
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<CompletionResponse, String>>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, String> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        }
    }

    fn scripted(replies: Vec<Result<CompletionResponse, String>>) -> (ToolContext, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        });
        let ctx = ToolContext::new(
            Arc::new(AuditLog::new()),
            Arc::new(RequestQueue::new(client.clone())),
            Arc::new(SynapseConfig::default()),
        );
        (ctx, client)
    }

    fn graph_with(ctx: &ToolContext, names: &[&str]) -> Graph {
        let mut graph = Graph::seeded("root", "Persona");
        for name in names {
            graph = ctx
                .knowledge
                .upsert_node(
                    &graph,
                    NodeUpsert {
                        name: Some(name.to_string()),
                        content: Some(format!("notes on {name}")),
                        parent_id: Some("root".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap()
                .0;
        }
        graph
    }

    #[test]
    fn test_parse_id_list_shapes() {
        assert_eq!(parse_id_list(r#"["a","b"]"#).unwrap(), vec!["a", "b"]);
        assert_eq!(
            parse_id_list("```json\n{\"ids\": [\"x\"]}\n```").unwrap(),
            vec!["x"]
        );
        assert!(parse_id_list("[]").unwrap().is_empty());
        assert!(matches!(
            parse_id_list("the relevant ones are a and b"),
            Err(SynapseError::UpstreamFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_inquiry_appends_insight() {
        let (ctx, _) = scripted(vec![Ok(CompletionResponse::text("  Time is a river. "))]);
        let graph = Graph::seeded("root", "Persona");
        let out = quantum_inquiry(&ctx, &graph, InquiryArgs { inquiry: "What is time?".into() })
            .await
            .unwrap();
        let next = out.graph.unwrap();
        let node = next.nodes.last().unwrap();
        assert_eq!(node.node_type, NodeType::QuantumInsight);
        assert_eq!(node.content, "Time is a river.");
        assert_eq!(graph.nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_inquiry_failure_leaves_no_snapshot() {
        let (ctx, _) = scripted(vec![Err("quota".to_string())]);
        let graph = Graph::seeded("root", "Persona");
        let err = quantum_inquiry(&ctx, &graph, InquiryArgs { inquiry: "q".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, SynapseError::UpstreamFailure(_)));
    }

    #[tokio::test]
    async fn test_synthesize_empty_filter_skips_second_stage() {
        let (ctx, client) = scripted(vec![
            Ok(CompletionResponse::text("[]")),
            Ok(CompletionResponse::text("should never be used")),
        ]);
        let graph = graph_with(&ctx, &["rust", "tokio"]);
        let out = synthesize_knowledge(
            &ctx,
            &graph,
            SynthesizeArgs {
                topic: "gardening".into(),
                max_sources: 8,
            },
        )
        .await
        .unwrap();
        assert!(out.content.starts_with("Nothing relevant"));
        assert!(out.graph.is_none());
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_synthesize_links_sources() {
        let (ctx, client) = scripted(vec![Ok(CompletionResponse::text("placeholder"))]);
        let graph = graph_with(&ctx, &["rust", "tokio", "cooking"]);
        let rust = graph.nodes[1].id.clone();
        let tokio_id = graph.nodes[2].id.clone();
        {
            let mut replies = client.replies.lock().unwrap();
            replies.clear();
            replies.push_back(Ok(CompletionResponse::text(format!(
                "[\"{rust}\", \"{tokio_id}\", \"{rust}\", \"ghost\"]"
            ))));
            replies.push_back(Ok(CompletionResponse::text("Async Rust needs a runtime.")));
        }

        let out = synthesize_knowledge(
            &ctx,
            &graph,
            SynthesizeArgs {
                topic: "async rust".into(),
                max_sources: 8,
            },
        )
        .await
        .unwrap();
        let next = out.graph.unwrap();
        let insight = next.nodes.last().unwrap();
        assert_eq!(insight.content, "Async Rust needs a runtime.");
        let supports: Vec<_> = next
            .links
            .iter()
            .filter(|l| l.link_type == LinkType::Supports && l.target == insight.id)
            .map(|l| l.source.clone())
            .collect();
        assert_eq!(supports, vec![rust, tokio_id]);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].model, "gemini-2.5-flash-lite");
        assert_eq!(seen[1].model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_synthesize_second_stage_failure_is_clean() {
        let (ctx, client) = scripted(vec![]);
        let graph = graph_with(&ctx, &["rust"]);
        let id = graph.nodes[1].id.clone();
        {
            let mut replies = client.replies.lock().unwrap();
            replies.push_back(Ok(CompletionResponse::text(format!("[\"{id}\"]"))));
            replies.push_back(Err("overloaded".to_string()));
        }
        let result = synthesize_knowledge(
            &ctx,
            &graph,
            SynthesizeArgs {
                topic: "rust".into(),
                max_sources: 8,
            },
        )
        .await;
        assert!(matches!(result, Err(SynapseError::UpstreamFailure(_))));
        assert_eq!(ctx.queue.stats().failed, 1);
        assert_eq!(ctx.queue.stats().succeeded, 1);
    }

    #[tokio::test]
    async fn test_image_side_channel() {
        let (ctx, client) = scripted(vec![Ok(CompletionResponse {
            inline_data: Some(InlineData {
                mime_type: "image/png".into(),
                data: "iVBOR".into(),
            }),
            ..Default::default()
        })]);
        let out = generate_image(&ctx, GenerateImageArgs { prompt: "a fox".into() })
            .await
            .unwrap();
        let image = out.generated_image.unwrap();
        assert_eq!(image.prompt, "a fox");
        assert_eq!(image.mime_type, "image/png");
        let seen = client.seen.lock().unwrap();
        assert!(seen[0]
            .config
            .as_ref()
            .unwrap()
            .response_modalities
            .contains(&"IMAGE".to_string()));
    }

    #[tokio::test]
    async fn test_image_missing_payload() {
        let (ctx, _) = scripted(vec![Ok(CompletionResponse::text("sorry"))]);
        let err = generate_image(&ctx, GenerateImageArgs { prompt: "a fox".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, SynapseError::UpstreamFailure(_)));
    }

    #[tokio::test]
    async fn test_commit_message_strips_fence() {
        let (ctx, _) = scripted(vec![Ok(CompletionResponse::text(
            "```\nfeat: add terminal check verb\n```",
        ))]);
        let out = generate_commit_message(
            &ctx,
            CommitMessageArgs {
                changes: "added check".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out.commit_message.as_deref(), Some("feat: add terminal check verb"));
    }

    #[tokio::test]
    async fn test_review_failures_lists_errors() {
        let (ctx, _) = scripted(vec![Err("quota exceeded".to_string())]);
        let _ = generate_commit_message(&ctx, CommitMessageArgs { changes: "x".into() }).await;
        let out = review_failures(&ctx, ReviewFailuresArgs { limit: 5 }).unwrap();
        assert!(out.content.starts_with("Queue: 0 pending, 0 succeeded, 1 failed."));
        assert!(out.content.contains("[generate_commit_message]"));
        assert!(out.content.contains("quota exceeded"));
    }
}
