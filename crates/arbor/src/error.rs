use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("repository already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("store error: {0}")]
    Store(#[from] arbor_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] arbor_refs::RefError),

    #[error("walk error: {0}")]
    Walk(#[from] arbor_revwalk::WalkError),

    #[error("tree walk error: {0}")]
    TreeWalk(#[from] arbor_treewalk::TreeWalkError),

    #[error("index error: {0}")]
    Index(#[from] arbor_index::IndexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
