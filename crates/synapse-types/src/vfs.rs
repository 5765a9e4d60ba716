//! Virtual filesystem node type.
//!
//! A tree of folders and files. Children are reference-counted so a new
//! snapshot can share every subtree it did not touch with the previous one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Children of a folder, keyed by name. Ordered so listings and serialized
/// snapshots are deterministic.
pub type Children = BTreeMap<String, Arc<VfsNode>>;

/// A node in the virtual filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VfsNode {
    /// A folder holding named children.
    Folder {
        /// Child nodes by name.
        #[serde(default)]
        children: Children,
    },
    /// A file with UTF-8 content.
    File {
        /// The file content.
        content: String,
    },
}

impl VfsNode {
    /// An empty folder (also the implicit root of a fresh tree).
    pub fn empty_folder() -> Self {
        VfsNode::Folder {
            children: Children::new(),
        }
    }

    /// A file with the given content.
    pub fn file(content: impl Into<String>) -> Self {
        VfsNode::File {
            content: content.into(),
        }
    }

    /// Whether this node is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, VfsNode::Folder { .. })
    }

    /// Children if this is a folder.
    pub fn children(&self) -> Option<&Children> {
        match self {
            VfsNode::Folder { children } => Some(children),
            VfsNode::File { .. } => None,
        }
    }

    /// Content if this is a file.
    pub fn content(&self) -> Option<&str> {
        match self {
            VfsNode::File { content } => Some(content),
            VfsNode::Folder { .. } => None,
        }
    }

    /// Total number of files in this subtree.
    pub fn file_count(&self) -> usize {
        match self {
            VfsNode::File { .. } => 1,
            VfsNode::Folder { children } => children.values().map(|c| c.file_count()).sum(),
        }
    }
}

impl Default for VfsNode {
    fn default() -> Self {
        Self::empty_folder()
    }
}
