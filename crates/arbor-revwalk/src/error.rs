//! Error types for revision walks.

use arbor_store::StoreError;
use arbor_treewalk::TreeWalkError;

/// Errors that can occur while walking history.
///
/// Failures met while pulling the next commit are wrapped in
/// [`WalkError::Traversal`]; the underlying store error is available through
/// `source()` or [`WalkError::into_store_error`].
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// Loading or decoding a commit or tree failed mid-walk.
    #[error("revision walk failed: {0}")]
    Traversal(#[source] StoreError),

    /// The progress monitor asked for the walk to stop.
    #[error("revision walk cancelled")]
    Cancelled,

    /// The tree filter could not be applied.
    #[error("tree filter failed: {0}")]
    TreeFilter(#[source] TreeWalkError),
}

impl WalkError {
    /// The store error behind a traversal failure, if there is one.
    pub fn into_store_error(self) -> Option<StoreError> {
        match self {
            WalkError::Traversal(e) => Some(e),
            WalkError::TreeFilter(TreeWalkError::Store(e)) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the walk stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WalkError::Cancelled)
    }
}

impl From<StoreError> for WalkError {
    fn from(e: StoreError) -> Self {
        WalkError::Traversal(e)
    }
}

impl From<TreeWalkError> for WalkError {
    fn from(e: TreeWalkError) -> Self {
        match e {
            TreeWalkError::Cancelled => WalkError::Cancelled,
            TreeWalkError::Store(e) => WalkError::Traversal(e),
            other => WalkError::TreeFilter(other),
        }
    }
}

/// Convenience alias for revision walk results.
pub type WalkResult<T> = Result<T, WalkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::ObjectId;
    use std::error::Error;

    #[test]
    fn traversal_exposes_cause() {
        let id = ObjectId::from_raw([9; 20]);
        let err = WalkError::from(StoreError::MissingObject(id));
        assert!(err.source().is_some());
        match err.into_store_error() {
            Some(StoreError::MissingObject(missing)) => assert_eq!(missing, id),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn tree_walk_cancellation_maps_to_cancelled() {
        assert!(WalkError::from(TreeWalkError::Cancelled).is_cancelled());
        assert!(WalkError::Cancelled.into_store_error().is_none());
    }
}
