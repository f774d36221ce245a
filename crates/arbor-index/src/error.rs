//! Error types for the index crate.

use std::path::PathBuf;

use arbor_store::StoreError;
use arbor_treewalk::TreeWalkError;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index file is malformed.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// The index file declares a version this crate cannot read.
    #[error("unsupported index version {0}")]
    UnsupportedVersion(u32),

    /// An entry sets the extended-flags bit, which version 2 does not allow.
    #[error("entry {path:?} uses extended flags")]
    ExtendedFlags { path: String },

    /// Two entries share the same path and stage.
    #[error("duplicate index entry {path:?} at stage {stage}")]
    DuplicateEntry { path: String, stage: u8 },

    /// The operation needs a fully merged index.
    #[error("index has unmerged paths: {}", .0.join(", "))]
    UnmergedPaths(Vec<String>),

    /// Checkout would overwrite uncommitted changes at these paths.
    #[error("checkout conflicts with local changes: {}", .0.join(", "))]
    CheckoutConflict(Vec<String>),

    /// A path cannot be stored in the index.
    #[error("invalid index path {0:?}")]
    InvalidPath(String),

    /// Another writer holds the index lock.
    #[error("index is locked: {0}")]
    Locked(PathBuf),

    /// Object database failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tree walk failure.
    #[error(transparent)]
    TreeWalk(#[from] TreeWalkError),

    /// I/O failure reading or writing the index file.
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
