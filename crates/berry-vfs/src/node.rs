//! Folder and file entities of the virtual tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel id of the root folder.
pub const ROOT_ID: &str = "root";

/// Display name of the root folder.
pub const ROOT_NAME: &str = "Root";

/// Opaque, tree-wide unique node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The root folder's id.
    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The `type` tag of a node, as written to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Folder,
    File,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::File => "file",
        }
    }
}

/// Payload that distinguishes folders from files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Ordered children; insertion order is display order.
    Folder { children: Vec<Node> },
    /// Text content.
    File { content: String },
}

/// A folder or file in the tree.
///
/// Only the tree store hands out mutable access, so a `Node` obtained
/// from outside the crate is always a read-only view or a detached copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    /// `None` only for the root folder.
    pub(crate) parent_id: Option<NodeId>,
    pub(crate) created_at: u64,
    pub(crate) modified_at: u64,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn folder(id: NodeId, name: &str, parent_id: Option<NodeId>, now: u64) -> Self {
        Self {
            id,
            name: name.to_string(),
            parent_id,
            created_at: now,
            modified_at: now,
            kind: NodeKind::Folder {
                children: Vec::new(),
            },
        }
    }

    pub(crate) fn file(
        id: NodeId,
        name: &str,
        parent_id: Option<NodeId>,
        content: &str,
        now: u64,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            parent_id,
            created_at: now,
            modified_at: now,
            kind: NodeKind::File {
                content: content.to_string(),
            },
        }
    }

    /// An empty root folder.
    pub(crate) fn new_root(now: u64) -> Self {
        Self::folder(NodeId::root(), ROOT_NAME, None, now)
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }

    /// Creation time in unix milliseconds.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Last rename, content edit, or move in unix milliseconds.
    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn entry_type(&self) -> EntryType {
        match self.kind {
            NodeKind::Folder { .. } => EntryType::Folder,
            NodeKind::File { .. } => EntryType::File,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Children of a folder; empty for files.
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.kind {
            NodeKind::Folder { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// Text content of a file; `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Folder { .. } => None,
        }
    }

    /// Ids of this node and all of its descendants, pre-order.
    pub fn subtree_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id.clone());
            // Reverse so the first child is visited first.
            stack.extend(node.children().iter().rev());
        }
        ids
    }

    /// Number of nodes in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut root = Node::new_root(1);
        let mut docs = Node::folder("docs".into(), "Docs", Some(NodeId::root()), 1);
        docs.children_mut()
            .unwrap()
            .push(Node::file("a".into(), "a.txt", Some("docs".into()), "hi", 1));
        root.children_mut().unwrap().push(docs);
        root.children_mut()
            .unwrap()
            .push(Node::file("b".into(), "b.txt", Some(NodeId::root()), "", 1));
        root
    }

    #[test]
    fn root_has_sentinel_id_and_no_parent() {
        let root = Node::new_root(0);
        assert!(root.id().is_root());
        assert_eq!(root.name(), ROOT_NAME);
        assert!(root.parent_id().is_none());
        assert!(root.is_folder());
    }

    #[test]
    fn file_has_content_and_no_children() {
        let f = Node::file("f".into(), "f.txt", Some(NodeId::root()), "body", 5);
        assert_eq!(f.content(), Some("body"));
        assert!(f.children().is_empty());
        assert_eq!(f.entry_type(), EntryType::File);
        assert_eq!(f.created_at(), 5);
        assert_eq!(f.modified_at(), 5);
    }

    #[test]
    fn folder_has_no_content() {
        let d = Node::folder("d".into(), "D", Some(NodeId::root()), 0);
        assert_eq!(d.content(), None);
        assert_eq!(d.entry_type(), EntryType::Folder);
    }

    #[test]
    fn subtree_ids_are_preorder() {
        let ids: Vec<String> = sample()
            .subtree_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, ["root", "docs", "a", "b"]);
    }

    #[test]
    fn subtree_len_counts_all_nodes() {
        assert_eq!(sample().subtree_len(), 4);
    }

    #[test]
    fn entry_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&EntryType::Folder).unwrap(),
            "\"folder\""
        );
        let t: EntryType = serde_json::from_str("\"file\"").unwrap();
        assert_eq!(t, EntryType::File);
    }

    #[test]
    fn node_id_display_and_root_check() {
        let id = NodeId::new("file-1-abc");
        assert_eq!(id.to_string(), "file-1-abc");
        assert!(!id.is_root());
        assert!(NodeId::from("root").is_root());
    }
}
