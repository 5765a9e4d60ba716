//! Slash-separated path resolution over the virtual filesystem.
//!
//! Pure functions; nothing here allocates a new tree or fails loudly. A path
//! that cannot be walked simply resolves to `None`.

use synapse_types::vfs::VfsNode;

/// Split a path into its segments.
///
/// Empty segments and `.` are dropped. Names are kept verbatim, surrounding
/// whitespace included. `..` steps back one segment and is clamped at the
/// root, so no path can name anything outside the tree.
pub fn resolve(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name.to_string()),
        }
    }
    segments
}

/// Canonical absolute form of a path (`/a/b`, or `/` for the root).
pub fn normalize(path: &str) -> String {
    join(&resolve(path))
}

/// Render segments as an absolute path.
pub fn join(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

/// Walk `path` from `root`.
///
/// Returns `None` if any intermediate segment is missing or is a file.
pub fn lookup<'a>(root: &'a VfsNode, path: &str) -> Option<&'a VfsNode> {
    lookup_segments(root, &resolve(path))
}

/// [`lookup`] over already-resolved segments.
pub fn lookup_segments<'a>(root: &'a VfsNode, segments: &[String]) -> Option<&'a VfsNode> {
    let mut current = root;
    for segment in segments {
        current = current.children()?.get(segment)?.as_ref();
    }
    Some(current)
}

/// File extension of the last segment, lowercased.
pub fn extension(path: &str) -> Option<String> {
    let name = resolve(path).pop()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
