//! Copy-on-write virtual filesystem store.
//!
//! Every mutating operation takes a snapshot by reference and returns a new
//! root. Only the folders along the touched path are rebuilt; every other
//! subtree is shared with the input through its `Arc`. The input is never
//! modified.

use crate::audit::AuditLog;
use crate::path::{join, lookup_segments, resolve};
use std::sync::Arc;
use synapse_types::audit::AuditDomain;
use synapse_types::error::{SynapseError, SynapseResult};
use synapse_types::vfs::{Children, VfsNode};

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Child name.
    pub name: String,
    /// Whether the child is a folder.
    pub is_folder: bool,
    /// Content length in bytes for files, child count for folders.
    pub size: usize,
}

impl std::fmt::Display for DirEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_folder {
            write!(f, "{}/", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// VFS operations with audit emission.
#[derive(Clone)]
pub struct VfsStore {
    audit: Arc<AuditLog>,
}

impl VfsStore {
    /// Create a store that records mutations to `audit`.
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self { audit }
    }

    /// Resolve a path to a node.
    pub fn lookup<'a>(&self, tree: &'a VfsNode, path: &str) -> SynapseResult<&'a VfsNode> {
        let segments = resolve(path);
        lookup_segments(tree, &segments).ok_or_else(|| SynapseError::NotFound(join(&segments)))
    }

    /// Content of the file at `path`.
    pub fn read_file<'a>(&self, tree: &'a VfsNode, path: &str) -> SynapseResult<&'a str> {
        let node = self.lookup(tree, path)?;
        node.content().ok_or_else(|| {
            SynapseError::InvalidPath(format!("{} is a directory", crate::path::normalize(path)))
        })
    }

    /// Children of the folder at `path`, sorted by name.
    pub fn list(&self, tree: &VfsNode, path: &str) -> SynapseResult<Vec<DirEntry>> {
        let segments = resolve(path);
        let children = lookup_segments(tree, &segments)
            .and_then(|n| n.children())
            .ok_or_else(|| SynapseError::NotFound(join(&segments)))?;
        Ok(children
            .iter()
            .map(|(name, node)| DirEntry {
                name: name.clone(),
                is_folder: node.is_folder(),
                size: match node.as_ref() {
                    VfsNode::File { content } => content.len(),
                    VfsNode::Folder { children } => children.len(),
                },
            })
            .collect())
    }

    /// Create every missing folder along `path`.
    ///
    /// Fails with `NotADirectory` if an existing segment is a file.
    pub fn ensure_directory(&self, tree: &VfsNode, path: &str) -> SynapseResult<VfsNode> {
        let segments = resolve(path);
        let next = rewrite(tree, &segments, &mut Vec::new(), true, &mut |children: &Children| {
            Ok(children.clone())
        })?;
        self.audit
            .record(AuditDomain::Vfs, "ensure_directory", join(&segments));
        Ok(next)
    }

    /// Create or overwrite the file at `path`, creating parent folders.
    ///
    /// Fails with `InvalidPath` if the path has no filename component or
    /// names an existing folder.
    pub fn write_file(&self, tree: &VfsNode, path: &str, content: &str) -> SynapseResult<VfsNode> {
        let segments = resolve(path);
        let (name, parents) = segments
            .split_last()
            .ok_or_else(|| SynapseError::InvalidPath(format!("'{path}' has no filename")))?;
        let full = join(&segments);
        let next = rewrite(tree, parents, &mut Vec::new(), true, &mut |children: &Children| {
            if children.get(name).is_some_and(|n| n.is_folder()) {
                return Err(SynapseError::InvalidPath(format!("{full} is a directory")));
            }
            let mut updated = children.clone();
            updated.insert(name.clone(), Arc::new(VfsNode::file(content)));
            Ok(updated)
        })?;
        self.audit.record(
            AuditDomain::Vfs,
            "write_file",
            format!("{full} ({} bytes)", content.len()),
        );
        Ok(next)
    }

    /// Create an empty file at `path` unless something already exists there.
    ///
    /// Returns `None` (and records nothing) when the path already exists.
    pub fn touch(&self, tree: &VfsNode, path: &str) -> SynapseResult<Option<VfsNode>> {
        if lookup_segments(tree, &resolve(path)).is_some() {
            return Ok(None);
        }
        self.write_file(tree, path, "").map(Some)
    }

    /// Remove the file or folder subtree at `path`.
    pub fn remove(&self, tree: &VfsNode, path: &str) -> SynapseResult<VfsNode> {
        let segments = resolve(path);
        let (name, parents) = segments
            .split_last()
            .ok_or_else(|| SynapseError::InvalidPath("cannot remove the root folder".to_string()))?;
        let full = join(&segments);
        let next = rewrite(tree, parents, &mut Vec::new(), false, &mut |children: &Children| {
            if !children.contains_key(name) {
                return Err(SynapseError::NotFound(full.clone()));
            }
            let mut updated = children.clone();
            updated.remove(name);
            Ok(updated)
        })?;
        self.audit.record(AuditDomain::Vfs, "delete_path", full);
        Ok(next)
    }
}

/// Rebuild the folders along `segments` and replace the children of the last
/// one with `edit(children)`.
///
/// Missing folders are created when `create` is set; otherwise a missing
/// segment is `NotFound`. A file where a folder is needed is `NotADirectory`
/// when creating and `NotFound` otherwise.
fn rewrite(
    node: &VfsNode,
    segments: &[String],
    walked: &mut Vec<String>,
    create: bool,
    edit: &mut dyn FnMut(&Children) -> SynapseResult<Children>,
) -> SynapseResult<VfsNode> {
    let children = match node {
        VfsNode::Folder { children } => children,
        VfsNode::File { .. } if create => {
            return Err(SynapseError::NotADirectory(join(walked)));
        }
        VfsNode::File { .. } => return Err(SynapseError::NotFound(join(walked))),
    };

    let Some((head, rest)) = segments.split_first() else {
        return Ok(VfsNode::Folder {
            children: edit(children)?,
        });
    };

    walked.push(head.clone());
    let child = match children.get(head) {
        Some(existing) => rewrite(existing, rest, walked, create, edit)?,
        None if create => rewrite(&VfsNode::empty_folder(), rest, walked, create, edit)?,
        None => return Err(SynapseError::NotFound(join(walked))),
    };

    let mut updated = children.clone();
    updated.insert(head.clone(), Arc::new(child));
    Ok(VfsNode::Folder { children: updated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::lookup;

    fn store() -> (VfsStore, Arc<AuditLog>) {
        let audit = Arc::new(AuditLog::new());
        (VfsStore::new(audit.clone()), audit)
    }

    fn snapshot(tree: &VfsNode) -> String {
        serde_json::to_string(tree).unwrap()
    }

    #[test]
    fn test_ensure_directory_creates_nested_folders() {
        let (store, audit) = store();
        let empty = VfsNode::empty_folder();
        let tree = store.ensure_directory(&empty, "/research/notes").unwrap();

        let research = lookup(&tree, "/research").unwrap();
        assert!(research.is_folder());
        let notes = lookup(&tree, "/research/notes").unwrap();
        assert_eq!(notes.children().unwrap().len(), 0);
        assert_eq!(empty, VfsNode::empty_folder());
        assert_eq!(audit.by_domain(AuditDomain::Vfs).len(), 1);
    }

    #[test]
    fn test_write_then_lookup_leaves_original() {
        let (store, _) = store();
        let tree = VfsNode::empty_folder();
        let before = snapshot(&tree);
        let next = store.write_file(&tree, "/a/b.txt", "hi").unwrap();

        assert_eq!(lookup(&next, "/a/b.txt"), Some(&VfsNode::file("hi")));
        assert!(lookup(&tree, "/a").is_none());
        assert_eq!(snapshot(&tree), before);
    }

    #[test]
    fn test_write_overwrites_file() {
        let (store, audit) = store();
        let t1 = store.write_file(&VfsNode::default(), "x.md", "one").unwrap();
        let t2 = store.write_file(&t1, "/x.md", "two").unwrap();
        assert_eq!(store.read_file(&t1, "x.md").unwrap(), "one");
        assert_eq!(store.read_file(&t2, "x.md").unwrap(), "two");
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn test_write_shares_untouched_subtrees() {
        let (store, _) = store();
        let t1 = store.write_file(&VfsNode::default(), "/keep/k.txt", "k").unwrap();
        let t2 = store.write_file(&t1, "/other/o.txt", "o").unwrap();
        let keep1 = &t1.children().unwrap()["keep"];
        let keep2 = &t2.children().unwrap()["keep"];
        assert!(Arc::ptr_eq(keep1, keep2));
    }

    #[test]
    fn test_write_rejects_root_and_folders() {
        let (store, audit) = store();
        let tree = store.ensure_directory(&VfsNode::default(), "/dir").unwrap();
        assert!(matches!(
            store.write_file(&tree, "/", "x"),
            Err(SynapseError::InvalidPath(_))
        ));
        assert!(matches!(
            store.write_file(&tree, "", "x"),
            Err(SynapseError::InvalidPath(_))
        ));
        assert!(matches!(
            store.write_file(&tree, "/dir", "x"),
            Err(SynapseError::InvalidPath(_))
        ));
        // Only the mkdir was recorded.
        assert_eq!(audit.len(), 1);
    }

    #[test]
    fn test_ensure_through_file_fails() {
        let (store, _) = store();
        let tree = store.write_file(&VfsNode::default(), "/a.txt", "x").unwrap();
        let err = store.ensure_directory(&tree, "/a.txt/sub").unwrap_err();
        assert!(matches!(err, SynapseError::NotADirectory(ref p) if p == "/a.txt"));
        let err = store.write_file(&tree, "/a.txt/b.txt", "y").unwrap_err();
        assert!(matches!(err, SynapseError::NotADirectory(_)));
    }

    #[test]
    fn test_list_is_sorted_and_idempotent() {
        let (store, audit) = store();
        let t = store.write_file(&VfsNode::default(), "/b.txt", "bb").unwrap();
        let t = store.ensure_directory(&t, "/a").unwrap();
        let before = snapshot(&t);
        let events = audit.len();

        let first = store.list(&t, "/").unwrap();
        let second = store.list(&t, "/").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            vec!["a/", "b.txt"]
        );
        assert_eq!(first[1].size, 2);
        assert_eq!(snapshot(&t), before);
        assert_eq!(audit.len(), events);
    }

    #[test]
    fn test_list_missing_or_file_is_not_found() {
        let (store, _) = store();
        let t = store.write_file(&VfsNode::default(), "/f", "x").unwrap();
        assert!(matches!(store.list(&t, "/nope"), Err(SynapseError::NotFound(_))));
        assert!(matches!(store.list(&t, "/f"), Err(SynapseError::NotFound(_))));
    }

    #[test]
    fn test_touch_only_creates() {
        let (store, audit) = store();
        let t = store.write_file(&VfsNode::default(), "/a.txt", "keep").unwrap();
        assert!(store.touch(&t, "/a.txt").unwrap().is_none());
        let t2 = store.touch(&t, "/b.txt").unwrap().unwrap();
        assert_eq!(store.read_file(&t2, "/a.txt").unwrap(), "keep");
        assert_eq!(store.read_file(&t2, "/b.txt").unwrap(), "");
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn test_remove() {
        let (store, _) = store();
        let t = store.write_file(&VfsNode::default(), "/d/x.txt", "x").unwrap();
        let removed = store.remove(&t, "/d").unwrap();
        assert!(lookup(&removed, "/d").is_none());
        assert!(lookup(&t, "/d/x.txt").is_some());
        assert!(matches!(store.remove(&t, "/zzz"), Err(SynapseError::NotFound(_))));
        assert!(matches!(store.remove(&t, "/"), Err(SynapseError::InvalidPath(_))));
        assert!(matches!(
            store.remove(&t, "/d/x.txt/y"),
            Err(SynapseError::NotFound(_))
        ));
    }
}
