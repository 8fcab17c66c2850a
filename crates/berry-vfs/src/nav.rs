//! Per-window back/forward history over folder ids.
//!
//! History entries are plain ids. They are never rewritten when the tree
//! changes; an entry whose folder was deleted simply fails to resolve when
//! it is visited, and the window falls back to the root.

use std::collections::HashMap;

use crate::node::NodeId;
use crate::tree::TreeStore;
use crate::window::WindowId;

/// Default number of entries kept per window.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// History of one window. `cursor` always indexes into `locations`.
#[derive(Debug, Clone)]
struct NavContext {
    locations: Vec<NodeId>,
    cursor: usize,
}

impl NavContext {
    fn new(start: NodeId) -> Self {
        Self {
            locations: vec![start],
            cursor: 0,
        }
    }

    fn current(&self) -> &NodeId {
        &self.locations[self.cursor]
    }
}

/// Navigation manager for all open file-browser windows.
#[derive(Debug)]
pub struct NavigationManager {
    contexts: HashMap<WindowId, NavContext>,
    limit: usize,
}

impl NavigationManager {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Keep at most `limit` entries per window (minimum 1).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            contexts: HashMap::new(),
            limit: limit.max(1),
        }
    }

    /// Start a window's history at `start`.
    ///
    /// Does nothing when the window already has history.
    pub fn init(&mut self, window: WindowId, start: NodeId) {
        if self.contexts.contains_key(&window) {
            log::debug!("{window} already has navigation history");
            return;
        }
        self.contexts.insert(window, NavContext::new(start));
    }

    /// Visit `folder`, discarding any forward history.
    pub fn navigate_to(&mut self, window: WindowId, folder: NodeId) {
        let Some(ctx) = self.contexts.get_mut(&window) else {
            self.init(window, folder);
            return;
        };
        ctx.locations.truncate(ctx.cursor + 1);
        ctx.locations.push(folder);
        if ctx.locations.len() > self.limit {
            let excess = ctx.locations.len() - self.limit;
            ctx.locations.drain(..excess);
        }
        ctx.cursor = ctx.locations.len() - 1;
    }

    /// Step back one entry. Returns `false` at the oldest entry.
    pub fn back(&mut self, window: WindowId) -> bool {
        match self.contexts.get_mut(&window) {
            Some(ctx) if ctx.cursor > 0 => {
                ctx.cursor -= 1;
                true
            },
            _ => false,
        }
    }

    /// Step forward one entry. Returns `false` at the newest entry.
    pub fn forward(&mut self, window: WindowId) -> bool {
        match self.contexts.get_mut(&window) {
            Some(ctx) if ctx.cursor + 1 < ctx.locations.len() => {
                ctx.cursor += 1;
                true
            },
            _ => false,
        }
    }

    /// Navigate to the parent of the current folder.
    ///
    /// Does nothing at the root. A current entry that no longer resolves
    /// is treated as being inside the root. Returns whether history moved.
    pub fn up(&mut self, window: WindowId, tree: &TreeStore) -> bool {
        let current = self.current(window);
        if current.is_root() {
            return false;
        }
        let parent = match tree.find_by_id(&current) {
            Ok(found) => found
                .parent
                .map(|p| p.id().clone())
                .unwrap_or_else(NodeId::root),
            Err(e) => {
                log::warn!("{window}: {e}; going up to root");
                NodeId::root()
            },
        };
        self.navigate_to(window, parent);
        true
    }

    /// Current folder id, or root for a window without history.
    pub fn current(&self, window: WindowId) -> NodeId {
        self.contexts
            .get(&window)
            .map(|ctx| ctx.current().clone())
            .unwrap_or_else(NodeId::root)
    }

    /// Current folder id, replaced by root when it no longer names a folder.
    ///
    /// The fallback is pushed as a fresh navigation so back still reaches
    /// the entries before it.
    pub fn resolve_current(&mut self, window: WindowId, tree: &TreeStore) -> NodeId {
        let current = self.current(window);
        match tree.get(&current) {
            Some(node) if node.is_folder() => current,
            _ => {
                log::warn!("{window}: folder {current} not found, falling back to root");
                let root = NodeId::root();
                self.navigate_to(window, root.clone());
                root
            },
        }
    }

    pub fn can_go_back(&self, window: WindowId) -> bool {
        self.contexts.get(&window).is_some_and(|ctx| ctx.cursor > 0)
    }

    pub fn can_go_forward(&self, window: WindowId) -> bool {
        self.contexts
            .get(&window)
            .is_some_and(|ctx| ctx.cursor + 1 < ctx.locations.len())
    }

    /// Forget a window's history.
    pub fn close(&mut self, window: WindowId) -> bool {
        self.contexts.remove(&window).is_some()
    }

    /// All history entries of a window, oldest first.
    pub fn history(&self, window: WindowId) -> &[NodeId] {
        self.contexts
            .get(&window)
            .map(|ctx| ctx.locations.as_slice())
            .unwrap_or(&[])
    }

    /// Cursor position of a window, if it has history.
    pub fn cursor(&self, window: WindowId) -> Option<usize> {
        self.contexts.get(&window).map(|ctx| ctx.cursor)
    }

    pub fn is_tracking(&self, window: WindowId) -> bool {
        self.contexts.contains_key(&window)
    }
}

impl Default for NavigationManager {
    fn default() -> Self {
        Self::new()
    }
}
