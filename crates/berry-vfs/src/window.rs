//! Windows that display tree content, and the node each one is bound to.
//!
//! A window's kind is an explicit tag rather than something parsed out of
//! its identifier, so closing every window bound to a deleted node is a
//! plain lookup.

use std::collections::BTreeMap;
use std::fmt;

use crate::node::NodeId;

/// Identifier of an open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// What a window is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowKind {
    /// A file browser. `folder` is where it was opened; its current
    /// location lives in the navigation manager.
    FolderView { folder: NodeId },
    /// An editor bound to one file.
    FileView { file: NodeId },
    /// Any other application window.
    App { name: String },
}

impl WindowKind {
    /// The node this window must close with, if any.
    ///
    /// Folder views are bound to the folder they were opened on; a browser
    /// that navigated elsewhere falls back to root through the navigation
    /// manager instead.
    pub fn bound_node(&self) -> Option<&NodeId> {
        match self {
            Self::FolderView { folder } => Some(folder),
            Self::FileView { file } => Some(file),
            Self::App { .. } => None,
        }
    }
}

/// Registry of open windows.
#[derive(Debug, Default)]
pub struct WindowBindings {
    windows: BTreeMap<WindowId, WindowKind>,
    next_id: u64,
}

impl WindowBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new window and return its id.
    pub fn open(&mut self, kind: WindowKind) -> WindowId {
        self.next_id += 1;
        let id = WindowId(self.next_id);
        log::debug!("opened {id}: {kind:?}");
        self.windows.insert(id, kind);
        id
    }

    pub fn close(&mut self, id: WindowId) -> Option<WindowKind> {
        self.windows.remove(&id)
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowKind> {
        self.windows.get(&id)
    }

    /// First window matching `kind` exactly.
    pub fn find(&self, kind: &WindowKind) -> Option<WindowId> {
        self.windows
            .iter()
            .find_map(|(id, k)| (k == kind).then_some(*id))
    }

    /// Close every window bound to one of `removed`, returning their ids.
    pub fn close_bound_to(&mut self, removed: &[NodeId]) -> Vec<WindowId> {
        let closing: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, kind)| kind.bound_node().is_some_and(|n| removed.contains(n)))
            .map(|(id, _)| *id)
            .collect();
        for id in &closing {
            self.windows.remove(id);
            log::debug!("closed {id}: bound node removed");
        }
        closing
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &WindowKind)> {
        self.windows.iter().map(|(id, kind)| (*id, kind))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_assigns_increasing_ids() {
        let mut wins = WindowBindings::new();
        let a = wins.open(WindowKind::App {
            name: "terminal".into(),
        });
        let b = wins.open(WindowKind::FileView {
            file: "readme".into(),
        });
        assert!(a < b);
        assert_eq!(wins.len(), 2);
    }

    #[test]
    fn close_bound_to_closes_only_matching_windows() {
        let mut wins = WindowBindings::new();
        let editor = wins.open(WindowKind::FileView { file: "a".into() });
        let browser = wins.open(WindowKind::FolderView {
            folder: "docs".into(),
        });
        let other = wins.open(WindowKind::FileView { file: "b".into() });
        let app = wins.open(WindowKind::App {
            name: "settings".into(),
        });

        let closed = wins.close_bound_to(&["docs".into(), "a".into()]);
        assert_eq!(closed, vec![editor, browser]);
        assert!(wins.get(other).is_some());
        assert!(wins.get(app).is_some());
    }

    #[test]
    fn app_windows_are_unbound() {
        let kind = WindowKind::App {
            name: "chat".into(),
        };
        assert!(kind.bound_node().is_none());
    }

    #[test]
    fn find_matches_exact_kind() {
        let mut wins = WindowBindings::new();
        let id = wins.open(WindowKind::FolderView {
            folder: "pictures".into(),
        });
        let found = wins.find(&WindowKind::FolderView {
            folder: "pictures".into(),
        });
        assert_eq!(found, Some(id));
        assert!(
            wins.find(&WindowKind::FileView {
                file: "pictures".into()
            })
            .is_none()
        );
    }

    #[test]
    fn display_format() {
        assert_eq!(WindowId(7).to_string(), "window-7");
    }
}
