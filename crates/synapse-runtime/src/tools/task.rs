//! `update_task_status`: validated side-channel status change.

use super::ToolOutput;
use crate::args::UpdateTaskStatusArgs;
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::graph::{Graph, NodeType};
use synapse_types::tool::TaskStatusChange;

pub fn update_task_status(graph: &Graph, args: UpdateTaskStatusArgs) -> SynapseResult<ToolOutput> {
    let node = graph
        .node(&args.task_id)
        .ok_or_else(|| SynapseError::NodeNotFound(args.task_id.clone()))?;
    if node.node_type != NodeType::Task {
        return Err(SynapseError::InvalidInput(format!(
            "'{}' is a {} node, not a task",
            node.id, node.node_type
        )));
    }
    let status = serde_json::to_value(args.status)?;
    let label = status.as_str().unwrap_or_default();
    Ok(ToolOutput {
        content: format!("Task '{}' ({}) marked {label}.", node.id, node.name),
        task_status: Some(TaskStatusChange {
            task_id: args.task_id,
            status: args.status,
        }),
        ..Default::default()
    })
}
