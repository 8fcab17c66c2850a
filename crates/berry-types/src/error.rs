//! Error types for BerryOS.

use std::io;

/// Outcome of a rejected file-system operation.
///
/// Every tree-store and clipboard operation reports failure through one of
/// these kinds. The tree is never left partially mutated when one is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("not a folder: {0}")]
    InvalidParent(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("name cannot be empty")]
    EmptyName,

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("the root folder cannot be modified")]
    RootImmutable,

    #[error("cannot move {id} into its own subtree ({dest})")]
    MoveIntoDescendant { id: String, dest: String },

    #[error("nothing to paste")]
    ClipboardEmpty,

    #[error("stored file system is corrupt: {0}")]
    CorruptPersistence(String),
}

impl FsError {
    /// Errors the UI should swallow without a notification.
    ///
    /// An empty name usually comes from blur-to-cancel during rename.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::EmptyName)
    }
}

/// Errors produced by the BerryOS crates.
#[derive(Debug, thiserror::Error)]
pub enum BerryError {
    #[error("file system error: {0}")]
    Fs(#[from] FsError),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BerryError>;
