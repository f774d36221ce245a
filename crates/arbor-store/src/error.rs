use arbor_refs::RefError;
use arbor_types::{ObjectId, ObjectType, TypeError};

/// Errors from object store and object database operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced object is not in the store.
    #[error("missing object: {0}")]
    MissingObject(ObjectId),

    /// The object exists but has a different type than required.
    #[error("object {id} is a {actual}, not a {expected}")]
    IncorrectType {
        id: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    /// The object's bytes are not a valid canonical encoding, or do not
    /// hash to the id they were stored under.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A revision expression could not be parsed.
    #[error("invalid revision {expr:?}: {reason}")]
    RevisionSyntax { expr: String, reason: String },

    /// Reference lookup failed.
    #[error(transparent)]
    Refs(#[from] RefError),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for the missing-object case.
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::MissingObject(_))
    }

    /// Returns `true` for the corrupt-object case.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::CorruptObject { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A malformed canonical encoding, before it is attributed to an object id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Attribute this failure to the object `id`.
    pub fn into_corrupt(self, id: ObjectId) -> StoreError {
        StoreError::CorruptObject {
            id,
            reason: self.reason,
        }
    }
}

impl From<TypeError> for ParseError {
    fn from(e: TypeError) -> Self {
        ParseError::new(e.to_string())
    }
}
