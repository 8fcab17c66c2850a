//! Structural checks over a whole tree.

use std::collections::HashSet;
use std::fmt;

use crate::node::{Node, NodeId};
use crate::tree::TreeStore;

/// A broken tree invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The same id appears more than once.
    DuplicateId(NodeId),
    /// A node's `parent_id` does not name the folder that holds it.
    ParentMismatch {
        id: NodeId,
        recorded: Option<NodeId>,
        actual: NodeId,
    },
    /// The root records a parent.
    RootHasParent(NodeId),
    /// The root does not carry the sentinel id.
    RootIdMismatch(NodeId),
    /// A node has a blank name.
    EmptyName(NodeId),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate id {id}"),
            Self::ParentMismatch {
                id,
                recorded,
                actual,
            } => write!(f, "{id} records parent {recorded:?} but lives in {actual}"),
            Self::RootHasParent(parent) => write!(f, "root records parent {parent}"),
            Self::RootIdMismatch(id) => write!(f, "root has id {id}"),
            Self::EmptyName(id) => write!(f, "{id} has an empty name"),
        }
    }
}

/// Every invariant violation in `tree`. Empty for a well-formed tree.
pub fn validate(tree: &TreeStore) -> Vec<Violation> {
    let root = tree.root();
    let mut violations = Vec::new();
    if !root.id().is_root() {
        violations.push(Violation::RootIdMismatch(root.id().clone()));
    }
    if let Some(parent) = root.parent_id() {
        violations.push(Violation::RootHasParent(parent.clone()));
    }

    let mut seen: HashSet<&NodeId> = HashSet::new();
    seen.insert(root.id());
    let mut stack: Vec<&Node> = vec![root];
    while let Some(folder) = stack.pop() {
        for child in folder.children() {
            if !seen.insert(child.id()) {
                violations.push(Violation::DuplicateId(child.id().clone()));
            }
            if child.parent_id() != Some(folder.id()) {
                violations.push(Violation::ParentMismatch {
                    id: child.id().clone(),
                    recorded: child.parent_id().cloned(),
                    actual: folder.id().clone(),
                });
            }
            if child.name().trim().is_empty() {
                violations.push(Violation::EmptyName(child.id().clone()));
            }
            if child.is_folder() {
                stack.push(child);
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tree_is_valid() {
        assert!(validate(&TreeStore::new()).is_empty());
    }

    #[test]
    fn built_tree_is_valid() {
        let mut tree = TreeStore::new();
        let a = tree.create_folder(&NodeId::root(), "A").unwrap();
        let b = tree.create_folder(&a, "B").unwrap();
        tree.create_file(&b, "f", "x").unwrap();
        tree.copy_node(&a, &b).unwrap();
        assert!(validate(&tree).is_empty());
    }

    #[test]
    fn detects_duplicates_and_parent_mismatch() {
        let mut root = Node::new_root(0);
        let children = root.children_mut().unwrap();
        children.push(Node::file("x".into(), "a", Some(NodeId::root()), "", 0));
        children.push(Node::file("x".into(), "b", Some("elsewhere".into()), "", 0));
        children.push(Node::folder("y".into(), " ", Some(NodeId::root()), 0));
        let tree = TreeStore::from_parts(root, crate::id::IdGenerator::new());

        let violations = validate(&tree);
        assert!(violations.contains(&Violation::DuplicateId("x".into())));
        assert!(violations.contains(&Violation::ParentMismatch {
            id: "x".into(),
            recorded: Some("elsewhere".into()),
            actual: NodeId::root(),
        }));
        assert!(violations.contains(&Violation::EmptyName("y".into())));
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn detects_bad_root() {
        let root = Node::folder("top".into(), "Root", Some("other".into()), 0);
        let tree = TreeStore::from_parts(root, crate::id::IdGenerator::new());
        let violations = validate(&tree);
        assert!(violations.contains(&Violation::RootIdMismatch("top".into())));
        assert!(violations.contains(&Violation::RootHasParent("other".into())));
    }

    #[test]
    fn violation_display() {
        assert_eq!(
            Violation::DuplicateId("x".into()).to_string(),
            "duplicate id x"
        );
    }
}
