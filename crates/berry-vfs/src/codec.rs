//! Storage document format.
//!
//! The current shape is
//!
//! ```json
//! { "root": { "type": "folder", "name": "Root", "id": "root", "data": [ ... ] } }
//! ```
//!
//! where every entry is `{ type, name, id, data, createdAt, modifiedAt }`
//! and `data` is an entry array for folders or a string for files.
//!
//! Older builds stored `{ id, name, type, parent, children | content }`
//! nodes with no `data` field, either under `root` or as the bare root
//! node. Those documents are detected by the missing `data` marker and
//! migrated on load.
//!
//! Decoding is lenient: missing, empty or duplicate ids are regenerated,
//! blank names are defaulted and payloads that contradict their type are
//! reset. Each fix is reported as a [`Repair`] instead of failing the load.
//! Only a document with no usable root is rejected.
//!
//! Nesting depth is not limited: every level of folders the tree store
//! accepts must load back.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use berry_types::error::{FsError, Result};

use crate::id::IdGenerator;
use crate::node::{EntryType, Node, NodeId, NodeKind, ROOT_ID, ROOT_NAME};
use crate::time::{observe_timestamp_ms, unix_time_ms_now};
use crate::tree::TreeStore;

/// Name given to entries stored without one.
pub const UNTITLED: &str = "Untitled";

// -- Encoding --

/// Serializable view of a tree, borrowing from it.
#[derive(Debug, Serialize)]
pub struct StorageDoc<'a> {
    pub root: StoredEntry<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry<'a> {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub name: &'a str,
    pub id: &'a NodeId,
    pub data: StoredData<'a>,
    pub created_at: u64,
    pub modified_at: u64,
}

/// Folder children or file text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StoredData<'a> {
    Children(Vec<StoredEntry<'a>>),
    Text(&'a str),
}

impl<'a> StoredEntry<'a> {
    fn from_node(node: &'a Node) -> Self {
        let data = match node.kind() {
            NodeKind::Folder { children } => {
                StoredData::Children(children.iter().map(StoredEntry::from_node).collect())
            },
            NodeKind::File { content } => StoredData::Text(content),
        };
        Self {
            entry_type: node.entry_type(),
            name: node.name(),
            id: node.id(),
            data,
            created_at: node.created_at(),
            modified_at: node.modified_at(),
        }
    }
}

/// Build the storage document for `tree`.
pub fn encode(tree: &TreeStore) -> StorageDoc<'_> {
    StorageDoc {
        root: StoredEntry::from_node(tree.root()),
    }
}

/// Encode `tree` as a JSON string.
pub fn to_json(tree: &TreeStore) -> Result<String> {
    Ok(serde_json::to_string(&encode(tree))?)
}

// -- Decoding --

/// Which document layout a payload used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageShape {
    Current,
    Legacy,
}

/// A fix applied while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// The entry's id was missing, empty or already used.
    IdRegenerated { old: Option<String>, new: NodeId },
    /// The root carried an id other than the sentinel.
    RootIdReset { old: String },
    /// The entry had no usable name.
    NameDefaulted { id: NodeId },
    /// The payload did not match the entry type and was emptied.
    PayloadReset { id: NodeId },
    /// A child that was not an object was dropped.
    EntryDropped { parent: NodeId },
    /// A timestamp was not unix milliseconds and was set to the load time.
    TimestampDefaulted { id: NodeId, field: &'static str },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdRegenerated { old: Some(old), new } => {
                write!(f, "regenerated duplicate or empty id {old:?} as {new}")
            },
            Self::IdRegenerated { old: None, new } => write!(f, "minted missing id {new}"),
            Self::RootIdReset { old } => write!(f, "root id {old:?} reset to sentinel"),
            Self::NameDefaulted { id } => write!(f, "{id} had no name, using {UNTITLED:?}"),
            Self::PayloadReset { id } => write!(f, "{id} payload did not match its type"),
            Self::EntryDropped { parent } => write!(f, "dropped malformed child of {parent}"),
            Self::TimestampDefaulted { id, field } => {
                write!(f, "{id} {field} was not a unix-ms timestamp, using load time")
            },
        }
    }
}

/// Outcome of a successful decode.
#[derive(Debug)]
pub struct Decoded {
    pub tree: TreeStore,
    pub shape: StorageShape,
    pub repairs: Vec<Repair>,
}

impl Decoded {
    /// Whether the stored payload should be rewritten in the current shape.
    pub fn needs_rewrite(&self) -> bool {
        self.shape == StorageShape::Legacy || !self.repairs.is_empty()
    }
}

/// Parse a stored payload into a tree.
pub fn decode(raw: &str) -> std::result::Result<Decoded, FsError> {
    let corrupt = |e: serde_json::Error| FsError::CorruptPersistence(e.to_string());
    let mut de = serde_json::Deserializer::from_str(raw);
    de.disable_recursion_limit();
    let doc = Value::deserialize(&mut de).map_err(corrupt)?;
    de.end().map_err(corrupt)?;
    decode_value(&doc)
}

/// Decode an already-parsed storage document.
pub fn decode_value(doc: &Value) -> std::result::Result<Decoded, FsError> {
    let corrupt = |why: &str| FsError::CorruptPersistence(why.to_string());
    let doc = doc.as_object().ok_or_else(|| corrupt("document is not an object"))?;
    let root = match doc.get("root") {
        Some(Value::Object(root)) => root,
        Some(_) => return Err(corrupt("root is not an object")),
        // Bare legacy root node.
        None if doc.contains_key("children") => doc,
        None => return Err(corrupt("missing root")),
    };
    let shape = if root.contains_key("data") {
        StorageShape::Current
    } else if root.contains_key("children") {
        StorageShape::Legacy
    } else {
        return Err(corrupt("root has no children"));
    };

    let mut decoder = Decoder {
        shape,
        ids: IdGenerator::new(),
        repairs: Vec::new(),
        now: unix_time_ms_now(),
        latest: 0,
    };
    let root = decoder.root(root)?;
    observe_timestamp_ms(decoder.latest);
    for repair in &decoder.repairs {
        log::warn!("Storage repair: {repair}");
    }
    if shape == StorageShape::Legacy {
        log::warn!("Migrating legacy storage document ({} nodes)", root.subtree_len());
    }
    Ok(Decoded {
        tree: TreeStore::from_parts(root, decoder.ids),
        shape,
        repairs: decoder.repairs,
    })
}

struct Decoder {
    shape: StorageShape,
    ids: IdGenerator,
    repairs: Vec<Repair>,
    now: u64,
    /// Largest stored timestamp seen.
    latest: u64,
}

impl Decoder {
    fn root(&mut self, raw: &Map<String, Value>) -> std::result::Result<Node, FsError> {
        let Some(children) = self.folder_payload(raw) else {
            return Err(FsError::CorruptPersistence(
                "root is not a folder".to_string(),
            ));
        };
        match raw.get("id").and_then(Value::as_str) {
            Some(ROOT_ID) => {},
            Some(other) => self.repairs.push(Repair::RootIdReset {
                old: other.to_string(),
            }),
            None => {},
        }
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(ROOT_NAME);

        let root_id = NodeId::root();
        let mut root = Node::folder(root_id.clone(), name, None, self.now);
        root.created_at = self.timestamp(raw, &root_id, "createdAt");
        root.modified_at = self.timestamp(raw, &root_id, "modifiedAt");
        let decoded = self.children(children, &root_id);
        if let Some(slot) = root.children_mut() {
            *slot = decoded;
        }
        Ok(root)
    }

    fn children(&mut self, raw: &[Value], parent: &NodeId) -> Vec<Node> {
        let mut out = Vec::with_capacity(raw.len());
        for value in raw {
            match value.as_object() {
                Some(entry) => out.push(self.entry(entry, parent)),
                None => self.repairs.push(Repair::EntryDropped {
                    parent: parent.clone(),
                }),
            }
        }
        out
    }

    fn entry(&mut self, raw: &Map<String, Value>, parent: &NodeId) -> Node {
        let declared = match raw.get("type").and_then(Value::as_str) {
            Some("folder") => Some(EntryType::Folder),
            Some("file") => Some(EntryType::File),
            _ => None,
        };
        let folder_payload = self.folder_payload(raw);
        let text_payload = self.text_payload(raw);
        let entry_type = declared.unwrap_or(if folder_payload.is_some() {
            EntryType::Folder
        } else {
            EntryType::File
        });

        let id = self.id(raw, entry_type);
        let name = match raw.get("name").and_then(Value::as_str).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                self.repairs.push(Repair::NameDefaulted { id: id.clone() });
                UNTITLED.to_string()
            },
        };

        let kind = match entry_type {
            EntryType::Folder => {
                let children = match folder_payload {
                    Some(children) => self.children(children, &id),
                    None => {
                        if self.has_payload(raw) {
                            self.repairs.push(Repair::PayloadReset { id: id.clone() });
                        }
                        Vec::new()
                    },
                };
                NodeKind::Folder { children }
            },
            EntryType::File => {
                let content = match text_payload {
                    Some(text) => text.to_string(),
                    None => {
                        if self.has_payload(raw) {
                            self.repairs.push(Repair::PayloadReset { id: id.clone() });
                        }
                        String::new()
                    },
                };
                NodeKind::File { content }
            },
        };

        let created_at = self.timestamp(raw, &id, "createdAt");
        let modified_at = self.timestamp(raw, &id, "modifiedAt");
        Node {
            id,
            name,
            parent_id: Some(parent.clone()),
            created_at,
            modified_at,
            kind,
        }
    }

    /// Keep the stored id when it is usable, otherwise mint a new one.
    fn id(&mut self, raw: &Map<String, Value>, entry_type: EntryType) -> NodeId {
        let stored = raw.get("id").and_then(Value::as_str);
        if let Some(id) = stored.filter(|id| !id.trim().is_empty()) {
            let id = NodeId::new(id);
            if self.ids.observe(&id) {
                return id;
            }
        }
        let new = self.ids.mint(entry_type);
        self.repairs.push(Repair::IdRegenerated {
            old: stored.map(str::to_string),
            new: new.clone(),
        });
        new
    }

    fn folder_payload<'v>(&self, raw: &'v Map<String, Value>) -> Option<&'v [Value]> {
        let key = match self.shape {
            StorageShape::Current => "data",
            StorageShape::Legacy => "children",
        };
        raw.get(key).and_then(Value::as_array).map(Vec::as_slice)
    }

    fn text_payload<'v>(&self, raw: &'v Map<String, Value>) -> Option<&'v str> {
        let key = match self.shape {
            StorageShape::Current => "data",
            StorageShape::Legacy => "content",
        };
        raw.get(key).and_then(Value::as_str)
    }

    fn has_payload(&self, raw: &Map<String, Value>) -> bool {
        match self.shape {
            StorageShape::Current => raw.contains_key("data"),
            StorageShape::Legacy => raw.contains_key("children") || raw.contains_key("content"),
        }
    }

    /// Stored unix-ms timestamp, or the load time when absent or not numeric.
    ///
    /// Only a present but unusable value counts as a repair.
    fn timestamp(&mut self, raw: &Map<String, Value>, id: &NodeId, field: &'static str) -> u64 {
        match raw.get(field) {
            Some(value) => match value.as_u64() {
                Some(ts) => {
                    self.latest = self.latest.max(ts);
                    ts
                },
                None => {
                    self.repairs.push(Repair::TimestampDefaulted {
                        id: id.clone(),
                        field,
                    });
                    self.now
                },
            },
            None => self.now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;
    use serde_json::json;

    /// Root -> A -> B -> C -> deep.txt, Root -> Empty, Root -> top.txt
    fn deep_tree() -> TreeStore {
        let mut tree = TreeStore::new();
        let a = tree.create_folder(&NodeId::root(), "A").unwrap();
        let b = tree.create_folder(&a, "B").unwrap();
        let c = tree.create_folder(&b, "C").unwrap();
        tree.create_file(&c, "deep.txt", "bottom").unwrap();
        tree.create_folder(&NodeId::root(), "Empty").unwrap();
        tree.create_file(&NodeId::root(), "top.txt", "line 1\nline 2").unwrap();
        tree
    }

    #[test]
    fn encode_produces_current_shape() {
        let mut tree = TreeStore::new();
        let docs = tree.create_folder(&NodeId::root(), "Docs").unwrap();
        tree.create_file(&docs, "a.txt", "hi").unwrap();
        let value = serde_json::to_value(encode(&tree)).unwrap();
        let root = &value["root"];
        assert_eq!(root["type"], "folder");
        assert_eq!(root["name"], "Root");
        assert_eq!(root["id"], "root");
        let entry = &root["data"][0];
        assert_eq!(entry["type"], "folder");
        assert_eq!(entry["name"], "Docs");
        assert_eq!(entry["data"][0]["type"], "file");
        assert_eq!(entry["data"][0]["data"], "hi");
        assert!(entry["createdAt"].is_u64());
        assert!(entry["modifiedAt"].is_u64());
    }

    #[test]
    fn round_trip_preserves_tree() {
        let tree = deep_tree();
        let json = to_json(&tree).unwrap();
        let decoded = decode(&json).unwrap();
        assert_eq!(decoded.tree.root(), tree.root());
        assert_eq!(decoded.shape, StorageShape::Current);
        assert!(decoded.repairs.is_empty());
        assert!(!decoded.needs_rewrite());
    }

    #[test]
    fn decoded_tree_does_not_reissue_loaded_ids() {
        let tree = deep_tree();
        let mut decoded = decode(&to_json(&tree).unwrap()).unwrap().tree;
        let fresh = decoded.create_folder(&NodeId::root(), "New").unwrap();
        assert!(!tree.contains(&fresh));
        assert!(validate(&decoded).is_empty());
    }

    #[test]
    fn duplicate_ids_are_regenerated() {
        let doc = json!({"root": {"type": "folder", "name": "Root", "id": "root", "data": [
            {"type": "file", "name": "a", "id": "dup", "data": "1"},
            {"type": "file", "name": "b", "id": "dup", "data": "2"},
            {"type": "file", "name": "c", "id": "", "data": "3"},
            {"type": "file", "name": "d", "data": "4"},
            {"type": "file", "name": "e", "id": "root", "data": "5"},
        ]}});
        let decoded = decode_value(&doc).unwrap();
        let children = decoded.tree.root().children();
        assert_eq!(children[0].id().as_str(), "dup");
        assert_ne!(children[1].id().as_str(), "dup");
        assert!(children[1].id().as_str().starts_with("file-"));
        assert_eq!(decoded.repairs.len(), 4);
        assert!(decoded.needs_rewrite());
        assert!(validate(&decoded.tree).is_empty());
    }

    #[test]
    fn malformed_entries_are_repaired() {
        let doc = json!({"root": {"type": "folder", "id": "root", "data": [
            {"type": "folder", "name": "  ", "id": "x", "data": "oops"},
            {"type": "file", "name": "f", "id": "y", "data": ["nope"]},
            {"name": "guess", "id": "z", "data": []},
            42,
        ]}});
        let decoded = decode_value(&doc).unwrap();
        let children = decoded.tree.root().children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].name(), UNTITLED);
        assert!(children[0].is_folder());
        assert_eq!(children[1].content(), Some(""));
        assert!(children[2].is_folder());
        assert!(decoded.repairs.contains(&Repair::PayloadReset { id: "x".into() }));
        assert!(decoded.repairs.contains(&Repair::PayloadReset { id: "y".into() }));
        assert!(decoded.repairs.contains(&Repair::EntryDropped {
            parent: NodeId::root()
        }));
    }

    #[test]
    fn root_id_is_forced_to_sentinel() {
        let doc = json!({"root": {"type": "folder", "name": "Home", "id": "top", "data": []}});
        let decoded = decode_value(&doc).unwrap();
        assert!(decoded.tree.root().id().is_root());
        assert_eq!(decoded.tree.root().name(), "Home");
        assert_eq!(
            decoded.repairs,
            [Repair::RootIdReset { old: "top".into() }]
        );
    }

    #[test]
    fn legacy_shape_is_migrated() {
        let doc = json!({"root": {"id": "root", "name": "Root", "type": "folder", "children": [
            {"id": "documents", "name": "Documents", "icon": "folder", "type": "folder",
             "parent": "root", "children": [
                {"id": "doc1", "name": "todo.txt", "type": "file", "parent": "documents",
                 "content": "milk", "createdAt": "2024-01-01T00:00:00.000Z"}
            ]},
            {"id": "readme", "name": "README.txt", "type": "file", "parent": "root",
             "content": "Welcome"},
        ]}});
        let decoded = decode_value(&doc).unwrap();
        assert_eq!(decoded.shape, StorageShape::Legacy);
        assert!(decoded.needs_rewrite());
        let tree = &decoded.tree;
        let todo = tree.find_by_id(&"doc1".into()).unwrap();
        assert_eq!(todo.node.content(), Some("milk"));
        assert_eq!(todo.parent.unwrap().id().as_str(), "documents");
        assert_eq!(tree.get(&"readme".into()).unwrap().content(), Some("Welcome"));

        // Re-encoding yields the current shape.
        let again = decode(&to_json(tree).unwrap()).unwrap();
        assert_eq!(again.shape, StorageShape::Current);
        assert_eq!(again.tree.root(), tree.root());
    }

    #[test]
    fn non_numeric_timestamps_are_repaired() {
        let doc = json!({"root": {"type": "folder", "name": "Root", "id": "root",
            "createdAt": 1, "modifiedAt": 2, "data": [
            {"type": "file", "name": "a.txt", "id": "a", "data": "hi",
             "createdAt": "2024-01-01T00:00:00Z", "modifiedAt": "bad"},
            {"type": "file", "name": "b.txt", "id": "b", "data": "ok",
             "createdAt": 10, "modifiedAt": 20},
        ]}});
        let decoded = decode_value(&doc).unwrap();
        assert_eq!(decoded.shape, StorageShape::Current);
        assert_eq!(
            decoded.repairs,
            [
                Repair::TimestampDefaulted { id: "a".into(), field: "createdAt" },
                Repair::TimestampDefaulted { id: "a".into(), field: "modifiedAt" },
            ]
        );
        assert!(decoded.needs_rewrite());
        let b = decoded.tree.get(&"b".into()).unwrap();
        assert_eq!((b.created_at(), b.modified_at()), (10, 20));
        let a = decoded.tree.get(&"a".into()).unwrap();
        assert!(a.created_at() > 20);
    }

    #[test]
    fn deep_nesting_round_trips() {
        // Test threads get a small default stack; the walk recurses per level.
        std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(|| {
                let mut tree = TreeStore::new();
                let mut parent = NodeId::root();
                for depth in 0..300 {
                    parent = tree.create_folder(&parent, &format!("L{depth}")).unwrap();
                }
                tree.create_file(&parent, "bottom.txt", "deep").unwrap();

                let decoded = decode(&to_json(&tree).unwrap()).unwrap();
                assert_eq!(decoded.tree.root(), tree.root());
                assert!(decoded.repairs.is_empty());
                assert!(decoded.tree.contains(&parent));
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn loaded_timestamps_order_later_edits() {
        let ahead = unix_time_ms_now() + 10_000;
        let doc = json!({"root": {"type": "folder", "name": "Root", "id": "root", "data": [
            {"type": "file", "name": "f", "id": "f", "data": "", "createdAt": ahead, "modifiedAt": ahead},
        ]}});
        let mut tree = decode_value(&doc).unwrap().tree;
        tree.set_content(&"f".into(), "edited").unwrap();
        assert!(tree.get(&"f".into()).unwrap().modified_at() > ahead);
    }

    #[test]
    fn trailing_garbage_is_corrupt() {
        assert!(matches!(
            decode(r#"{"root": {"id": "root", "data": []}} extra"#),
            Err(FsError::CorruptPersistence(_))
        ));
    }

    #[test]
    fn bare_legacy_root_is_accepted() {
        let doc = json!({"id": "root", "name": "Root", "type": "folder", "children": [
            {"id": "pictures", "name": "Pictures", "type": "folder", "children": []}
        ]});
        let decoded = decode_value(&doc).unwrap();
        assert_eq!(decoded.shape, StorageShape::Legacy);
        assert!(decoded.tree.contains(&"pictures".into()));
    }

    #[test]
    fn unusable_documents_are_corrupt() {
        for raw in [
            "not json",
            "[]",
            "{}",
            r#"{"root": 5}"#,
            r#"{"root": {"id": "root"}}"#,
            r#"{"root": {"id": "root", "data": "text"}}"#,
        ] {
            assert!(
                matches!(decode(raw), Err(FsError::CorruptPersistence(_))),
                "{raw} should be corrupt"
            );
        }
    }

    #[test]
    fn repair_display() {
        let r = Repair::IdRegenerated {
            old: None,
            new: "file-1-abcdef".into(),
        };
        assert_eq!(r.to_string(), "minted missing id file-1-abcdef");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_random_trees(
                shape in proptest::collection::vec((any::<usize>(), any::<bool>(), "[a-z]{1,8}", ".{0,16}"), 0..40),
            ) {
                let mut tree = TreeStore::new();
                let mut folders = vec![NodeId::root()];
                for (parent, is_folder, name, content) in &shape {
                    let parent = folders[parent % folders.len()].clone();
                    if *is_folder {
                        folders.push(tree.create_folder(&parent, name).unwrap());
                    } else {
                        tree.create_file(&parent, name, content).unwrap();
                    }
                }
                let decoded = decode(&to_json(&tree).unwrap()).unwrap();
                prop_assert_eq!(decoded.tree.root(), tree.root());
                prop_assert!(decoded.repairs.is_empty());
            }

            #[test]
            fn decode_never_panics(raw in ".{0,200}") {
                let _ = decode(&raw);
            }
        }
    }
}
