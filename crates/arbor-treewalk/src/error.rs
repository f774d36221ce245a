//! Error types for the tree walker.

use arbor_store::StoreError;

/// Errors that can occur while walking trees.
#[derive(Debug, thiserror::Error)]
pub enum TreeWalkError {
    /// Reading or decoding a tree failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The progress monitor asked for the walk to stop.
    #[error("tree walk cancelled")]
    Cancelled,

    /// A path filter was given an unusable path.
    #[error("invalid filter path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// `enter_subtree` was called while the current entry is not a tree.
    #[error("current entry is not a subtree")]
    NotASubtree,
}

impl TreeWalkError {
    /// Returns `true` if the walk stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TreeWalkError::Cancelled)
    }
}

/// Convenience alias for tree walk results.
pub type TreeWalkResult<T> = Result<T, TreeWalkError>;
