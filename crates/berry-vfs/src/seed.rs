//! The tree a new user starts with.

use crate::node::{Node, NodeId};
use crate::time::next_monotonic_timestamp_ms;
use crate::tree::TreeStore;

pub const DOCUMENTS_ID: &str = "documents";
pub const PICTURES_ID: &str = "pictures";
pub const DOWNLOADS_ID: &str = "downloads";
pub const README_ID: &str = "readme";
pub const NOTES_ID: &str = "notes";

const README_TEXT: &str = "Welcome to BerryOS!\n\n\
This is a desktop operating system UI built with React.\n\n\
Features:\n\
- Window management\n\
- File system\n\
- Desktop icons\n\
- Applications";

const NOTES_TEXT: &str = "Your notes here...";

/// Root with Documents, Pictures, Downloads, README.txt and Notes.txt.
pub fn default_tree() -> TreeStore {
    let now = next_monotonic_timestamp_ms();
    let parent = Some(NodeId::root());
    let mut root = Node::new_root(now);
    if let Some(children) = root.children_mut() {
        for (id, name) in [
            (DOCUMENTS_ID, "Documents"),
            (PICTURES_ID, "Pictures"),
            (DOWNLOADS_ID, "Downloads"),
        ] {
            children.push(Node::folder(id.into(), name, parent.clone(), now));
        }
        children.push(Node::file(
            README_ID.into(),
            "README.txt",
            parent.clone(),
            README_TEXT,
            now,
        ));
        children.push(Node::file(NOTES_ID.into(), "Notes.txt", parent, NOTES_TEXT, now));
    }
    TreeStore::from_root(root)
}
