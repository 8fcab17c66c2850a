//! Single-slot clipboard for pending copy and cut operations.
//!
//! A copy is a frozen template: the node is snapshotted when it is staged
//! and every paste clones that snapshot, so later edits to the source are
//! not reflected. A cut is a relocation of the live node: paste looks the
//! node up by id, moves it, and empties the clipboard.

use berry_types::error::FsError;

use crate::node::{Node, NodeId};
use crate::tree::TreeStore;

/// Kind of staged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    Copy,
    Cut,
}

/// A staged operation awaiting paste.
#[derive(Debug, Clone)]
pub struct ClipboardEntry {
    /// The node as it was when staged.
    pub node: Node,
    pub op: ClipOp,
    pub source_parent_id: Option<NodeId>,
}

/// The clipboard. Holds at most one entry.
#[derive(Debug, Default)]
pub struct Clipboard {
    entry: Option<ClipboardEntry>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any staged entry.
    pub fn set(&mut self, node: Node, op: ClipOp, source_parent_id: Option<NodeId>) {
        log::debug!("clipboard {op:?}: {} ({})", node.name(), node.id());
        self.entry = Some(ClipboardEntry {
            node,
            op,
            source_parent_id,
        });
    }

    /// Snapshot a node from `tree` and stage it.
    pub fn stage(&mut self, tree: &TreeStore, id: &NodeId, op: ClipOp) -> Result<(), FsError> {
        if op == ClipOp::Cut && id.is_root() {
            return Err(FsError::RootImmutable);
        }
        let found = tree.find_by_id(id)?;
        let parent = found.parent.map(|p| p.id().clone());
        self.set(found.node.clone(), op, parent);
        Ok(())
    }

    pub fn peek(&self) -> Option<&ClipboardEntry> {
        self.entry.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Apply the staged operation into `dest` and return the pasted node's id.
    ///
    /// A copy keeps its entry for repeated pastes. A cut clears its entry,
    /// including when the source has been deleted in the meantime.
    pub fn paste(&mut self, tree: &mut TreeStore, dest: &NodeId) -> Result<NodeId, FsError> {
        let entry = self.entry.as_ref().ok_or(FsError::ClipboardEmpty)?;
        if !tree.get(dest).is_some_and(Node::is_folder) {
            return Err(FsError::InvalidDestination(dest.to_string()));
        }
        match entry.op {
            ClipOp::Copy => tree.insert_clone(&entry.node, dest),
            ClipOp::Cut => {
                let id = entry.node.id().clone();
                if !tree.contains(&id) {
                    self.entry = None;
                    return Err(FsError::NotFound(id.to_string()));
                }
                tree.move_node(&id, dest)?;
                self.entry = None;
                Ok(id)
            },
        }
    }
}
