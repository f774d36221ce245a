//! Reference management for Arbor.
//!
//! References are the human-readable entry points into the commit graph:
//! branches, tags, remote-tracking refs, and `HEAD`. A reference either
//! points directly at an object id or symbolically at another reference.
//!
//! # Architecture
//!
//! - **Direct refs** hold an [`ObjectId`](arbor_types::ObjectId).
//! - **Symbolic refs** hold the name of another ref (`HEAD` usually points
//!   at `refs/heads/<branch>`). Reading follows the chain to a bounded depth.
//! - **Updates** are compare-and-swap: a [`RefUpdate`] names the value the
//!   caller expects to replace, and the store rejects the update if the ref
//!   moved in the meantime. Updates through a symbolic ref move its target.
//!
//! # Modules
//!
//! - [`error`] : error types for ref operations
//! - [`types`] : [`Ref`], [`RefUpdate`], [`UpdateOutcome`]
//! - [`traits`] : the [`RefStore`] trait
//! - [`names`] : ref name validation (git check-ref-format rules)
//! - [`memory`] : in-memory [`InMemoryRefStore`]
//! - [`file`] : on-disk [`FileRefStore`] using loose ref files and `packed-refs`

pub mod error;
pub mod file;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use file::FileRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_branch_name, validate_ref_name};
pub use traits::{RefStore, MAX_SYMBOLIC_DEPTH};
pub use types::{Ref, RefUpdate, UpdateOutcome, HEAD, R_HEADS, R_REFS, R_REMOTES, R_TAGS};
