//! Error types for reference operations.

use arbor_types::ObjectId;
use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The ref name violates the naming rules.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Another writer holds the ref's lock file.
    #[error("cannot lock ref {name}: lock file already exists")]
    LockFailure { name: String },

    /// The ref did not hold the value the update expected.
    ///
    /// A zero id stands for "did not exist".
    #[error("ref update rejected for {name}: expected {expected}, found {actual}")]
    Rejected {
        name: String,
        expected: ObjectId,
        actual: ObjectId,
    },

    /// Symbolic refs point at each other too deeply (or in a cycle).
    #[error("symbolic ref chain too deep at {name}")]
    SymbolicLoop { name: String },

    /// A ref file exists but its content cannot be parsed.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
