//! The tree store: sole owner and mutator of the node tree.
//!
//! Nodes are addressed by id. Lookups walk the tree breadth-first and
//! produce an index path (child positions from the root), which the
//! mutators then follow to edit the one node or child list they touch.
//! Every mutator validates its inputs before changing anything, so an
//! `Err` always leaves the tree as it was.

use std::collections::VecDeque;

use berry_types::error::FsError;

use crate::id::IdGenerator;
use crate::node::{EntryType, Node, NodeId, NodeKind, ROOT_ID};
use crate::time::next_monotonic_timestamp_ms;

/// Child positions leading from the root to a node. Empty for the root.
type IndexPath = Vec<usize>;

/// Prefix used when a copy would collide with an existing sibling name.
const COPY_PREFIX: &str = "Copy of";

/// A node together with the folder that contains it.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub node: &'a Node,
    /// `None` for the root.
    pub parent: Option<&'a Node>,
}

/// Owner of the node tree.
#[derive(Debug)]
pub struct TreeStore {
    root: Node,
    ids: IdGenerator,
}

impl TreeStore {
    /// A tree holding only an empty root folder.
    pub fn new() -> Self {
        Self::from_parts(
            Node::new_root(next_monotonic_timestamp_ms()),
            IdGenerator::new(),
        )
    }

    /// Adopt an already well-formed root, registering every id in it.
    pub(crate) fn from_root(root: Node) -> Self {
        let mut ids = IdGenerator::new();
        for id in root.subtree_ids() {
            ids.observe(&id);
        }
        Self::from_parts(root, ids)
    }

    /// Adopt a root whose ids `ids` has already observed.
    pub(crate) fn from_parts(root: Node, ids: IdGenerator) -> Self {
        Self { root, ids }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.root.subtree_len()
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.root.children().is_empty()
    }

    // -- Lookup --

    /// Find a node and its containing folder.
    pub fn find_by_id(&self, id: &NodeId) -> Result<Located<'_>, FsError> {
        let not_found = || FsError::NotFound(id.to_string());
        let path = self.locate(id).ok_or_else(not_found)?;
        let node = node_at(&self.root, &path).ok_or_else(not_found)?;
        let parent = match path.split_last() {
            Some((_, parent_path)) => node_at(&self.root, parent_path),
            None => None,
        };
        Ok(Located { node, parent })
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.find_by_id(id).ok().map(|found| found.node)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.locate(id).is_some()
    }

    /// Ordered children of a folder.
    pub fn children(&self, folder_id: &NodeId) -> Result<&[Node], FsError> {
        let found = self.find_by_id(folder_id)?;
        if !found.node.is_folder() {
            return Err(FsError::InvalidParent(folder_id.to_string()));
        }
        Ok(found.node.children())
    }

    /// Display path of a node: `/` for the root, `/Documents/Work` below it.
    pub fn path_of(&self, id: &NodeId) -> Result<String, FsError> {
        let path = self
            .locate(id)
            .ok_or_else(|| FsError::NotFound(id.to_string()))?;
        let mut names = Vec::with_capacity(path.len());
        let mut node = &self.root;
        for &index in &path {
            node = &node.children()[index];
            names.push(node.name.as_str());
        }
        Ok(format!("/{}", names.join("/")))
    }

    /// Walk names from the root. The first sibling with a matching name wins.
    pub fn resolve_path(&self, path: &str) -> Result<&Node, FsError> {
        let mut node = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node
                .children()
                .iter()
                .find(|child| child.name == segment)
                .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        }
        Ok(node)
    }

    // -- Mutation --

    /// Create an empty folder at the end of `parent_id`'s children.
    pub fn create_folder(&mut self, parent_id: &NodeId, name: &str) -> Result<NodeId, FsError> {
        let name = valid_name(name)?;
        let parent = self.folder_path(parent_id, FsError::InvalidParent)?;
        let id = self.ids.mint(EntryType::Folder);
        let node = Node::folder(
            id.clone(),
            name,
            Some(parent_id.clone()),
            next_monotonic_timestamp_ms(),
        );
        self.attach(&parent, node)
            .map_err(|_| FsError::InvalidParent(parent_id.to_string()))?;
        log::debug!("created folder {id} ({name}) in {parent_id}");
        Ok(id)
    }

    /// Create a file at the end of `parent_id`'s children.
    pub fn create_file(
        &mut self,
        parent_id: &NodeId,
        name: &str,
        content: &str,
    ) -> Result<NodeId, FsError> {
        let name = valid_name(name)?;
        let parent = self.folder_path(parent_id, FsError::InvalidParent)?;
        let id = self.ids.mint(EntryType::File);
        let node = Node::file(
            id.clone(),
            name,
            Some(parent_id.clone()),
            content,
            next_monotonic_timestamp_ms(),
        );
        self.attach(&parent, node)
            .map_err(|_| FsError::InvalidParent(parent_id.to_string()))?;
        log::debug!("created file {id} ({name}) in {parent_id}");
        Ok(id)
    }

    /// Rename a node. A blank name is rejected and leaves the node untouched.
    pub fn rename(&mut self, id: &NodeId, new_name: &str) -> Result<(), FsError> {
        let name = valid_name(new_name)?;
        let node = self.node_mut(id)?;
        node.name = name.to_string();
        node.modified_at = next_monotonic_timestamp_ms();
        log::debug!("renamed {id} to {name}");
        Ok(())
    }

    /// Replace a file's content.
    pub fn set_content(&mut self, id: &NodeId, content: &str) -> Result<(), FsError> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::File { content: current } => {
                *current = content.to_string();
            },
            NodeKind::Folder { .. } => return Err(FsError::NotAFile(id.to_string())),
        }
        node.modified_at = next_monotonic_timestamp_ms();
        log::debug!("updated content of {id} ({} bytes)", content.len());
        Ok(())
    }

    /// Remove a node and its whole subtree.
    ///
    /// Returns the ids of every removed node so the caller can close any
    /// window bound to one of them.
    pub fn delete(&mut self, id: &NodeId) -> Result<Vec<NodeId>, FsError> {
        if id.is_root() {
            return Err(FsError::RootImmutable);
        }
        let path = self
            .locate(id)
            .ok_or_else(|| FsError::NotFound(id.to_string()))?;
        let (&index, parent_path) = path
            .split_last()
            .ok_or(FsError::RootImmutable)?;
        let siblings = self
            .children_mut_at(parent_path)
            .ok_or_else(|| FsError::NotFound(id.to_string()))?;
        let removed = siblings.remove(index);
        let ids = removed.subtree_ids();
        log::debug!("deleted {id} ({} nodes)", ids.len());
        Ok(ids)
    }

    /// Relocate a node (and its subtree) to the end of `dest`'s children.
    ///
    /// Moving into the current parent is a no-op.
    pub fn move_node(&mut self, id: &NodeId, dest: &NodeId) -> Result<(), FsError> {
        if id.is_root() {
            return Err(FsError::RootImmutable);
        }
        let source = self
            .locate(id)
            .ok_or_else(|| FsError::NotFound(id.to_string()))?;
        let mut target = self.folder_path(dest, FsError::InvalidDestination)?;
        if target.starts_with(&source) {
            return Err(FsError::MoveIntoDescendant {
                id: id.to_string(),
                dest: dest.to_string(),
            });
        }
        let (&index, parent_path) = source.split_last().ok_or(FsError::RootImmutable)?;
        if parent_path == target.as_slice() {
            return Ok(());
        }

        let siblings = self
            .children_mut_at(parent_path)
            .ok_or_else(|| FsError::NotFound(id.to_string()))?;
        let mut node = siblings.remove(index);
        shift_after_removal(&mut target, &source);

        node.parent_id = Some(dest.clone());
        node.modified_at = next_monotonic_timestamp_ms();
        if let Err(node) = self.attach(&target, node) {
            // Put it back where it was; the tree must not lose the node.
            if let Some(siblings) = self.children_mut_at(parent_path) {
                siblings.insert(index, node);
            }
            return Err(FsError::InvalidDestination(dest.to_string()));
        }
        log::debug!("moved {id} into {dest}");
        Ok(())
    }

    /// Deep-copy a node into `dest` with fresh ids at every level.
    ///
    /// A name already taken in `dest` is adjusted to `Copy of <name>`.
    pub fn copy_node(&mut self, id: &NodeId, dest: &NodeId) -> Result<NodeId, FsError> {
        let source = self
            .locate(id)
            .ok_or_else(|| FsError::NotFound(id.to_string()))?;
        let target = self.folder_path(dest, FsError::InvalidDestination)?;
        let template =
            node_at(&self.root, &source).ok_or_else(|| FsError::NotFound(id.to_string()))?;
        let copy = prepare_clone(&self.root, &mut self.ids, template, &target, dest)?;
        self.insert_prepared(&target, copy, dest)
    }

    /// Deep-copy a detached node into `dest`, as [`TreeStore::copy_node`] does.
    pub(crate) fn insert_clone(&mut self, template: &Node, dest: &NodeId) -> Result<NodeId, FsError> {
        let target = self.folder_path(dest, FsError::InvalidDestination)?;
        let copy = prepare_clone(&self.root, &mut self.ids, template, &target, dest)?;
        self.insert_prepared(&target, copy, dest)
    }

    // -- Internals --

    /// Breadth-first search for `id`, returning its index path.
    fn locate(&self, id: &NodeId) -> Option<IndexPath> {
        if id.as_str() == ROOT_ID {
            return Some(Vec::new());
        }
        let mut queue: VecDeque<(IndexPath, &Node)> = VecDeque::new();
        queue.push_back((Vec::new(), &self.root));
        while let Some((path, folder)) = queue.pop_front() {
            for (index, child) in folder.children().iter().enumerate() {
                if child.id == *id {
                    let mut found = path.clone();
                    found.push(index);
                    return Some(found);
                }
                if !child.children().is_empty() {
                    let mut next = path.clone();
                    next.push(index);
                    queue.push_back((next, child));
                }
            }
        }
        None
    }

    /// Index path of `id` if it is a folder, else `err(id)`.
    fn folder_path(&self, id: &NodeId, err: fn(String) -> FsError) -> Result<IndexPath, FsError> {
        let path = self.locate(id).ok_or_else(|| err(id.to_string()))?;
        match node_at(&self.root, &path) {
            Some(node) if node.is_folder() => Ok(path),
            _ => Err(err(id.to_string())),
        }
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node, FsError> {
        let path = self
            .locate(id)
            .ok_or_else(|| FsError::NotFound(id.to_string()))?;
        node_at_mut(&mut self.root, &path).ok_or_else(|| FsError::NotFound(id.to_string()))
    }

    fn children_mut_at(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        node_at_mut(&mut self.root, path).and_then(Node::children_mut)
    }

    /// Append `node` to the folder at `path`, handing it back on failure.
    fn attach(&mut self, path: &[usize], node: Node) -> Result<(), Node> {
        match self.children_mut_at(path) {
            Some(children) => {
                children.push(node);
                Ok(())
            },
            None => Err(node),
        }
    }

    fn insert_prepared(
        &mut self,
        target: &[usize],
        copy: Node,
        dest: &NodeId,
    ) -> Result<NodeId, FsError> {
        let id = copy.id.clone();
        let name = copy.name.clone();
        self.attach(target, copy)
            .map_err(|_| FsError::InvalidDestination(dest.to_string()))?;
        log::debug!("copied into {dest} as {id} ({name})");
        Ok(id)
    }
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn node_at<'a>(root: &'a Node, path: &[usize]) -> Option<&'a Node> {
    path.iter()
        .try_fold(root, |node, &index| node.children().get(index))
}

fn node_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> Option<&'a mut Node> {
    let mut node = root;
    for &index in path {
        node = node.children_mut()?.get_mut(index)?;
    }
    Some(node)
}

/// Trimmed name, or `EmptyName` when nothing is left.
fn valid_name(name: &str) -> Result<&str, FsError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(FsError::EmptyName)
    } else {
        Ok(trimmed)
    }
}

/// Fix up `target` after the node at `removed` left its parent's children.
fn shift_after_removal(target: &mut [usize], removed: &[usize]) {
    let depth = removed.len() - 1;
    if target.len() > depth && target[..depth] == removed[..depth] && target[depth] > removed[depth]
    {
        target[depth] -= 1;
    }
}

/// Name for a copy landing among `siblings`.
///
/// Unchanged when free, then `Copy of <name>`, then `Copy of <name> (2)`, ...
pub(crate) fn copy_name(siblings: &[Node], name: &str) -> String {
    let taken = |candidate: &str| siblings.iter().any(|s| s.name == candidate);
    if !taken(name) {
        return name.to_string();
    }
    let base = format!("{COPY_PREFIX} {name}");
    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base} ({n})");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Detached copy of `template` ready to append to the folder at `target`.
fn prepare_clone(
    root: &Node,
    ids: &mut IdGenerator,
    template: &Node,
    target: &[usize],
    dest: &NodeId,
) -> Result<Node, FsError> {
    let siblings = node_at(root, target)
        .ok_or_else(|| FsError::InvalidDestination(dest.to_string()))?
        .children();
    let mut copy = fresh_clone(template, dest, ids, next_monotonic_timestamp_ms());
    copy.name = copy_name(siblings, &template.name);
    Ok(copy)
}

/// Clone `template` under `parent_id`, minting a new id for every node.
fn fresh_clone(template: &Node, parent_id: &NodeId, ids: &mut IdGenerator, now: u64) -> Node {
    let id = ids.mint(template.entry_type());
    let kind = match &template.kind {
        NodeKind::File { content } => NodeKind::File {
            content: content.clone(),
        },
        NodeKind::Folder { children } => NodeKind::Folder {
            children: children
                .iter()
                .map(|child| fresh_clone(child, &id, ids, now))
                .collect(),
        },
    };
    Node {
        id,
        name: template.name.clone(),
        parent_id: Some(parent_id.clone()),
        created_at: now,
        modified_at: now,
        kind,
    }
}
