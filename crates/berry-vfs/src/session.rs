//! A user's file-system session: the tree plus everything layered on it.
//!
//! The session loads the tree from a [`KeyValueStore`] when opened, turns
//! every operation outcome into a [`Notice`], and persists with a
//! trailing-edge debounce. Callers pass the current [`Instant`] into each
//! mutation and into [`FsSession::tick`]; the session never reads the
//! clock for scheduling.

use std::time::{Duration, Instant};

use berry_types::config::BerryConfig;
use berry_types::error::FsError;

use crate::clipboard::{ClipOp, Clipboard};
use crate::codec;
use crate::nav::NavigationManager;
use crate::node::NodeId;
use crate::notice::Notice;
use crate::seed::default_tree;
use crate::storage::KeyValueStore;
use crate::tree::TreeStore;
use crate::validate::validate;
use crate::window::{WindowBindings, WindowId, WindowKind};

/// Suffix of the key that keeps an undecodable payload for diagnosis.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// How the tree was obtained when the session opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet; the default tree was used.
    Fresh,
    /// The stored tree loaded cleanly.
    Loaded,
    /// The stored tree was legacy or needed repairs and was rewritten.
    Migrated,
    /// The stored payload was unusable; it was archived and replaced.
    Recovered,
    /// The store could not be read; the default tree is used in memory.
    Unavailable,
}

pub struct FsSession {
    store: Box<dyn KeyValueStore>,
    key: String,
    tree: TreeStore,
    nav: NavigationManager,
    clipboard: Clipboard,
    windows: WindowBindings,
    notices: Vec<Notice>,
    debounce: Duration,
    save_due: Option<Instant>,
    outcome: LoadOutcome,
}

impl FsSession {
    /// Open `user`'s tree. Never fails: unreadable or corrupt storage
    /// falls back to the default tree.
    pub fn open(store: Box<dyn KeyValueStore>, config: &BerryConfig, user: &str) -> Self {
        let key = config.storage_key(user);
        let (tree, outcome) = load(store.as_ref(), &key);
        let mut session = Self {
            store,
            key,
            tree,
            nav: NavigationManager::with_limit(config.navigation.history_limit),
            clipboard: Clipboard::new(),
            windows: WindowBindings::new(),
            notices: Vec::new(),
            debounce: Duration::from_millis(config.storage.save_debounce_ms),
            save_due: None,
            outcome,
        };
        if matches!(
            outcome,
            LoadOutcome::Fresh | LoadOutcome::Migrated | LoadOutcome::Recovered
        ) {
            session.write();
        }
        log::info!(
            "Opened file system {} ({outcome:?}, {} nodes)",
            session.key,
            session.tree.len()
        );
        session
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.outcome
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn navigation(&self) -> &NavigationManager {
        &self.nav
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn windows(&self) -> &WindowBindings {
        &self.windows
    }

    /// Take all queued notices, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -- Tree operations --

    pub fn create_folder(
        &mut self,
        parent: &NodeId,
        name: &str,
        now: Instant,
    ) -> Result<NodeId, FsError> {
        let result = self.tree.create_folder(parent, name);
        self.record(now, result, |_| "Folder created".to_string())
    }

    pub fn create_file(
        &mut self,
        parent: &NodeId,
        name: &str,
        content: &str,
        now: Instant,
    ) -> Result<NodeId, FsError> {
        let result = self.tree.create_file(parent, name, content);
        self.record(now, result, |_| "File created".to_string())
    }

    pub fn rename(&mut self, id: &NodeId, name: &str, now: Instant) -> Result<(), FsError> {
        let result = self.tree.rename(id, name);
        let name = name.trim();
        self.record(now, result, |_| format!("Renamed to {name}"))
    }

    /// Replace a file's content, as an editor save does.
    pub fn save_file(&mut self, id: &NodeId, content: &str, now: Instant) -> Result<(), FsError> {
        let result = self.tree.set_content(id, content);
        self.record(now, result, |_| "File saved successfully".to_string())
    }

    /// Delete a node and close every window bound to it or its descendants.
    pub fn delete(&mut self, id: &NodeId, now: Instant) -> Result<Vec<NodeId>, FsError> {
        let name = self.name_of(id);
        let result = self.tree.delete(id);
        if let Ok(removed) = &result {
            for window in self.windows.close_bound_to(removed) {
                self.nav.close(window);
            }
        }
        self.record(now, result, |_| format!("Deleted {name}"))
    }

    pub fn move_node(&mut self, id: &NodeId, dest: &NodeId, now: Instant) -> Result<(), FsError> {
        let name = self.name_of(id);
        let result = self.tree.move_node(id, dest);
        self.record(now, result, |_| format!("Moved {name}"))
    }

    pub fn copy_node(
        &mut self,
        id: &NodeId,
        dest: &NodeId,
        now: Instant,
    ) -> Result<NodeId, FsError> {
        let result = self.tree.copy_node(id, dest);
        let result = self.with_name(result);
        self.record(now, result, |(_, name)| format!("Copied: {name}"))
            .map(|(id, _)| id)
    }

    // -- Clipboard --

    pub fn copy(&mut self, id: &NodeId) -> Result<(), FsError> {
        self.stage(id, ClipOp::Copy)
    }

    pub fn cut(&mut self, id: &NodeId) -> Result<(), FsError> {
        self.stage(id, ClipOp::Cut)
    }

    pub fn paste(&mut self, dest: &NodeId, now: Instant) -> Result<NodeId, FsError> {
        let result = self.clipboard.paste(&mut self.tree, dest);
        let result = self.with_name(result);
        self.record(now, result, |(_, name)| format!("Pasted: {name}"))
            .map(|(id, _)| id)
    }

    fn stage(&mut self, id: &NodeId, op: ClipOp) -> Result<(), FsError> {
        let result = self.clipboard.stage(&self.tree, id, op);
        let verb = match op {
            ClipOp::Copy => "Copied",
            ClipOp::Cut => "Cut",
        };
        let name = self.name_of(id);
        self.notify(&result, || format!("{verb} to clipboard: {name}"));
        result
    }

    // -- Windows and navigation --

    /// Open a file browser on `folder`, or return the one already open there.
    pub fn open_folder_window(&mut self, folder: &NodeId) -> Result<WindowId, FsError> {
        match self.tree.get(folder) {
            Some(node) if node.is_folder() => {},
            Some(_) => return Err(FsError::InvalidParent(folder.to_string())),
            None => return Err(FsError::NotFound(folder.to_string())),
        }
        let kind = WindowKind::FolderView {
            folder: folder.clone(),
        };
        if let Some(existing) = self.windows.find(&kind) {
            return Ok(existing);
        }
        let window = self.windows.open(kind);
        self.nav.init(window, folder.clone());
        Ok(window)
    }

    /// Open an editor on `file`, or return the one already open on it.
    pub fn open_file_window(&mut self, file: &NodeId) -> Result<WindowId, FsError> {
        match self.tree.get(file) {
            Some(node) if node.is_file() => {},
            Some(_) => return Err(FsError::NotAFile(file.to_string())),
            None => return Err(FsError::NotFound(file.to_string())),
        }
        let kind = WindowKind::FileView { file: file.clone() };
        Ok(self.windows.find(&kind).unwrap_or_else(|| self.windows.open(kind)))
    }

    pub fn open_app_window(&mut self, name: &str) -> WindowId {
        self.windows.open(WindowKind::App {
            name: name.to_string(),
        })
    }

    pub fn close_window(&mut self, window: WindowId) -> Option<WindowKind> {
        self.nav.close(window);
        self.windows.close(window)
    }

    /// Point a browser window at `folder`.
    pub fn navigate(&mut self, window: WindowId, folder: &NodeId) -> Result<(), FsError> {
        match self.tree.get(folder) {
            Some(node) if node.is_folder() => {
                self.nav.navigate_to(window, folder.clone());
                Ok(())
            },
            Some(_) => Err(FsError::InvalidParent(folder.to_string())),
            None => Err(FsError::NotFound(folder.to_string())),
        }
    }

    pub fn back(&mut self, window: WindowId) -> bool {
        self.nav.back(window)
    }

    pub fn forward(&mut self, window: WindowId) -> bool {
        self.nav.forward(window)
    }

    pub fn up(&mut self, window: WindowId) -> bool {
        self.nav.up(window, &self.tree)
    }

    /// Folder a window is showing; stale entries fall back to root.
    pub fn current_folder(&mut self, window: WindowId) -> NodeId {
        self.nav.resolve_current(window, &self.tree)
    }

    // -- Persistence --

    pub fn is_dirty(&self) -> bool {
        self.save_due.is_some()
    }

    /// When the pending save is due, if any.
    pub fn save_due(&self) -> Option<Instant> {
        self.save_due
    }

    /// Write if the debounce deadline has passed. Returns whether it wrote.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.save_due {
            Some(due) if now >= due => {
                self.write();
                true
            },
            _ => false,
        }
    }

    /// Write pending changes now, as on suspend, lock or logout.
    pub fn flush(&mut self) -> bool {
        if self.save_due.is_none() {
            return false;
        }
        self.write();
        true
    }

    /// Flush and end the session.
    pub fn close(mut self) {
        self.flush();
        log::info!("Closed file system {}", self.key);
    }

    // -- Internals --

    fn mark_dirty(&mut self, now: Instant) {
        self.save_due = Some(now + self.debounce);
    }

    fn write(&mut self) {
        self.save_due = None;
        let written = codec::to_json(&self.tree).and_then(|json| self.store.set(&self.key, &json));
        match written {
            Ok(()) => log::debug!("Saved file system {}", self.key),
            Err(e) => {
                log::error!("Failed to save file system {}: {e}", self.key);
                self.notices
                    .push(Notice::error(format!("Could not save files: {e}")));
            },
        }
    }

    fn name_of(&self, id: &NodeId) -> String {
        self.tree
            .get(id)
            .map(|n| n.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    fn with_name(&self, result: Result<NodeId, FsError>) -> Result<(NodeId, String), FsError> {
        result.map(|id| {
            let name = self.name_of(&id);
            (id, name)
        })
    }

    fn notify<T>(&mut self, result: &Result<T, FsError>, success: impl FnOnce() -> String) {
        match result {
            Ok(_) => self.notices.push(Notice::success(success())),
            Err(e) => {
                log::debug!("{e}");
                self.notices.extend(Notice::from_error(e));
            },
        }
    }

    /// Queue the notice for `result` and schedule a save when it succeeded.
    fn record<T>(
        &mut self,
        now: Instant,
        result: Result<T, FsError>,
        success: impl FnOnce(&T) -> String,
    ) -> Result<T, FsError> {
        if let Ok(value) = &result {
            self.mark_dirty(now);
            self.notify(&result, || success(value));
        } else {
            self.notify(&result, String::new);
        }
        result
    }
}

/// Read and decode the stored tree, falling back to the default tree.
fn load(store: &dyn KeyValueStore, key: &str) -> (TreeStore, LoadOutcome) {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            log::info!("No stored file system under {key}, starting from defaults");
            return (default_tree(), LoadOutcome::Fresh);
        },
        Err(e) => {
            log::error!("Cannot read {key}: {e}; using defaults without saving over it");
            return (default_tree(), LoadOutcome::Unavailable);
        },
    };
    let decoded = codec::decode(&raw);
    if let Ok(decoded) = &decoded {
        if log::log_enabled!(log::Level::Debug) {
            for violation in validate(&decoded.tree) {
                log::debug!("Loaded tree violates an invariant: {violation}");
            }
        }
    }
    match decoded {
        Ok(decoded) if decoded.needs_rewrite() => (decoded.tree, LoadOutcome::Migrated),
        Ok(decoded) => (decoded.tree, LoadOutcome::Loaded),
        Err(e) => {
            let archive = format!("{key}{CORRUPT_SUFFIX}");
            log::warn!("{e}; archiving payload under {archive}");
            if let Err(e) = store.set(&archive, &raw) {
                log::error!("Failed to archive corrupt payload: {e}");
            }
            (default_tree(), LoadOutcome::Recovered)
        },
    }
}
