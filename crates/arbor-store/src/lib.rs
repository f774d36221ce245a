//! Git-compatible object storage for Arbor.
//!
//! Every commit, tree, tag, and blob is an immutable object identified by
//! the SHA-1 of its canonical `"<type> <len>\0<payload>"` encoding, the same
//! scheme git uses for `.git/objects/`.
//!
//! # Object Types
//!
//! - [`Commit`] : tree, ordered parents, author, committer, message
//! - [`Tree`] : entries sorted in git order
//! - [`Tag`] : annotated pointer to another object
//! - [`Blob`] : opaque file content
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] : `ObjectIdMap`-backed store for tests and embedding
//! - [`LooseObjectStore`] : zlib-deflated files in git's fan-out layout
//!
//! [`ObjectDatabase`] layers typed access, peeling, and revision-expression
//! resolution over a store and a ref store.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; writing identical content again
//!    returns the same id and changes nothing.
//! 2. Write-then-link: objects are complete in the store before any ref
//!    points at them.
//! 3. Concurrent reads are always safe.
//! 4. Malformed bytes surface as [`StoreError::CorruptObject`] and are never
//!    retried or partially returned.

pub mod commit;
pub mod database;
pub mod error;
pub mod hasher;
pub mod ident;
pub mod loose;
pub mod memory;
pub mod object;
pub mod revparse;
pub mod tag;
pub mod traits;
pub mod tree;

pub use commit::Commit;
pub use database::ObjectDatabase;
pub use error::{ParseError, StoreError, StoreResult};
pub use hasher::ObjectHasher;
pub use ident::PersonIdent;
pub use loose::LooseObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, RawObject};
pub use tag::Tag;
pub use traits::ObjectStore;
pub use tree::{git_name_cmp, Tree, TreeEntry};
