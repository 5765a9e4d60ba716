//! Knowledge-graph tools.

use super::{ToolContext, ToolOutput};
use crate::args::{
    CreateLinkArgs, DeleteNodeArgs, MergeNodesArgs, RelinkNodeArgs, SearchGraphArgs,
    UpsertNodeArgs,
};
use crate::str_utils::preview;
use synapse_memory::knowledge::{NodeUpsert, RelinkOutcome, UpsertOutcome};
use synapse_types::error::SynapseResult;
use synapse_types::graph::Graph;

pub fn upsert_node(ctx: &ToolContext, graph: &Graph, args: UpsertNodeArgs) -> SynapseResult<ToolOutput> {
    args.validate()?;
    let (next, outcome) = ctx.knowledge.upsert_node(
        graph,
        NodeUpsert {
            id: args.id,
            name: args.name,
            content: args.content,
            node_type: args.node_type,
            parent_id: args.parent_id,
            ..Default::default()
        },
    )?;
    let content = match &outcome {
        UpsertOutcome::Created { id, parent_id } => {
            format!("Created node '{id}' under '{parent_id}'.")
        }
        UpsertOutcome::Updated { id, relink: None } => format!("Updated node '{id}'."),
        UpsertOutcome::Updated {
            id,
            relink: Some(relink),
        } => format!("Updated node '{id}'; parent change: {relink}."),
    };
    Ok(ToolOutput::text(content).with_graph(next))
}

pub fn create_link(ctx: &ToolContext, graph: &Graph, args: CreateLinkArgs) -> SynapseResult<ToolOutput> {
    let next = ctx.knowledge.create_link(
        graph,
        &args.source_id,
        &args.target_id,
        args.link_type,
        args.label,
        args.strength,
    )?;
    Ok(ToolOutput::text(format!(
        "Linked '{}' -[{}]-> '{}'.",
        args.source_id, args.link_type, args.target_id
    ))
    .with_graph(next))
}

pub fn merge_nodes(ctx: &ToolContext, graph: &Graph, args: MergeNodesArgs) -> SynapseResult<ToolOutput> {
    args.validate()?;
    let (next, outcome) = ctx.knowledge.merge_nodes(
        graph,
        &args.node_ids,
        &args.new_name,
        &args.new_content,
        ctx.root_id(),
    )?;
    let mut content = format!(
        "Merged {} nodes into '{}' under '{}' ({} links removed).",
        outcome.merged.len(),
        outcome.new_id,
        outcome.parent_id,
        outcome.removed_links
    );
    if outcome.parent_conflict {
        content.push_str(" The merged nodes had different parents; the first one found was used.");
    }
    if outcome.used_fallback {
        content.push_str(" None of them had a parent; attached to the persona root.");
    }
    Ok(ToolOutput::text(content).with_graph(next))
}

pub fn relink_node(ctx: &ToolContext, graph: &Graph, args: RelinkNodeArgs) -> SynapseResult<ToolOutput> {
    let (next, outcome) = ctx
        .knowledge
        .relink(graph, &args.node_id, &args.new_parent_id)?;
    let content = format!("Relink '{}': {outcome}.", args.node_id);
    Ok(match outcome {
        RelinkOutcome::Relinked { .. } => ToolOutput::text(content).with_graph(next),
        _ => ToolOutput::text(content),
    })
}

pub fn delete_node(ctx: &ToolContext, graph: &Graph, args: DeleteNodeArgs) -> SynapseResult<ToolOutput> {
    let (next, removed) = ctx
        .knowledge
        .delete_node(graph, &args.node_id, ctx.root_id())?;
    Ok(ToolOutput::text(format!(
        "Deleted node '{}' and {removed} link(s).",
        args.node_id
    ))
    .with_graph(next))
}

pub fn search_graph(ctx: &ToolContext, graph: &Graph, args: SearchGraphArgs) -> SynapseResult<ToolOutput> {
    let hits = ctx
        .knowledge
        .search(graph, &args.query, args.node_type, args.limit);
    if hits.is_empty() {
        return Ok(ToolOutput::text("No matching nodes."));
    }
    let lines: Vec<String> = hits
        .iter()
        .map(|n| {
            format!(
                "- [{}] {} ({}): {}",
                n.id,
                n.name,
                n.node_type,
                preview(&n.content, 120)
            )
        })
        .collect();
    Ok(ToolOutput::text(lines.join("\n")))
}
