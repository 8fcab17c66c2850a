//! BerryOS virtual file system.
//!
//! An in-memory tree of folders and files owned by a single [`TreeStore`],
//! with per-window navigation history, a single-slot clipboard, a lenient
//! JSON storage codec, and an [`FsSession`] that persists the tree through
//! an injected [`KeyValueStore`] on a debounced schedule.

// Re-exports from berry-types.
pub use berry_types::config;
pub use berry_types::error;

pub mod clipboard;
pub mod codec;
pub mod id;
pub mod nav;
pub mod node;
pub mod notice;
pub mod seed;
pub mod session;
pub mod storage;
pub mod time;
pub mod tree;
pub mod validate;
pub mod window;

pub use clipboard::{ClipOp, Clipboard, ClipboardEntry};
pub use nav::NavigationManager;
pub use node::{EntryType, Node, NodeId, NodeKind};
pub use notice::{Notice, Severity};
pub use session::{FsSession, LoadOutcome};
pub use storage::{DirStore, KeyValueStore, MemoryStore};
pub use tree::{Located, TreeStore};
pub use window::{WindowBindings, WindowId, WindowKind};
