//! High-level API for Arbor repositories.
//!
//! [`Repository`] opens a git directory, loads its `arbor.toml`
//! configuration, and wires the loose object store and file ref store into
//! one [`ObjectDatabase`]. Walks, diffs, index access, and commits all go
//! through that handle. This is the main entry point for applications
//! embedding Arbor.

pub mod config;
pub mod error;
pub mod repository;

pub use config::{CoreConfig, IndexConfig, RepositoryConfig, WalkConfig, CONFIG_FILE};
pub use error::{RepoError, RepoResult};
pub use repository::{LogEntry, LogOptions, Repository, DEFAULT_BRANCH};

// Re-export key types
pub use arbor_index::{CheckoutPlan, DirCache, DirCacheEntry, Stage};
pub use arbor_refs::{Ref, RefStore};
pub use arbor_revwalk::{RevCommit, RevFilter, RevSort, RevWalk};
pub use arbor_store::{Commit, ObjectDatabase, PersonIdent, Tag, Tree, TreeEntry};
pub use arbor_treewalk::{DiffEntry, TreeWalk};
pub use arbor_types::{FileMode, ObjectId, ObjectType};
