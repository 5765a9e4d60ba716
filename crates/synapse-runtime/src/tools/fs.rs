//! Virtual filesystem tools.

use super::{ToolContext, ToolOutput};
use crate::args::{ListDirectoryArgs, PathArgs, ToolKind, WriteFileArgs};
use synapse_memory::path::normalize;
use synapse_types::error::SynapseResult;
use synapse_types::vfs::VfsNode;

pub fn read_file(ctx: &ToolContext, vfs: &VfsNode, args: PathArgs) -> SynapseResult<ToolOutput> {
    args.validate(ToolKind::ReadFile)?;
    let content = ctx.vfs.read_file(vfs, &args.path)?;
    Ok(ToolOutput::text(content))
}

pub fn write_file(ctx: &ToolContext, vfs: &VfsNode, args: WriteFileArgs) -> SynapseResult<ToolOutput> {
    let next = ctx.vfs.write_file(vfs, &args.path, &args.content)?;
    Ok(ToolOutput::text(format!(
        "Wrote {} bytes to {}.",
        args.content.len(),
        normalize(&args.path)
    ))
    .with_vfs(next))
}

pub fn list_directory(ctx: &ToolContext, vfs: &VfsNode, args: ListDirectoryArgs) -> SynapseResult<ToolOutput> {
    let entries = ctx.vfs.list(vfs, &args.path)?;
    if entries.is_empty() {
        return Ok(ToolOutput::text(format!("{} is empty.", normalize(&args.path))));
    }
    let lines: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
    Ok(ToolOutput::text(lines.join("\n")))
}

pub fn create_directory(ctx: &ToolContext, vfs: &VfsNode, args: PathArgs) -> SynapseResult<ToolOutput> {
    args.validate(ToolKind::CreateDirectory)?;
    let next = ctx.vfs.ensure_directory(vfs, &args.path)?;
    Ok(ToolOutput::text(format!("Directory {} is ready.", normalize(&args.path))).with_vfs(next))
}

pub fn delete_path(ctx: &ToolContext, vfs: &VfsNode, args: PathArgs) -> SynapseResult<ToolOutput> {
    args.validate(ToolKind::DeletePath)?;
    let next = ctx.vfs.remove(vfs, &args.path)?;
    Ok(ToolOutput::text(format!("Deleted {}.", normalize(&args.path))).with_vfs(next))
}
