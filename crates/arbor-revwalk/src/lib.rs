//! Commit history traversal for Arbor.
//!
//! A [`RevWalk`] pulls commits out of an
//! [`ObjectDatabase`](arbor_store::ObjectDatabase) one at a time. It parses
//! commits lazily, interns one [`RevCommit`] handle per id, and tracks
//! per-commit [`Flags`] to exclude uninteresting ancestry and to order output.
//! Trees and tags are not interned; the walk reads them from the database
//! only to peel start points and to evaluate tree filters.
//!
//! # Key Types
//!
//! - [`RevWalk`] : the walker, also an `Iterator` of `WalkResult<RevCommit>`
//! - [`RevCommit`] : walk-local commit handle
//! - [`RevSort`] : topological, commit-time, and reverse orderings
//! - [`RevFilter`] : commit predicates (merges, dates, author, message)
//! - [`WalkError`] : traversal failure wrapping the underlying cause

pub mod commit;
pub mod error;
pub mod filter;
pub mod flags;
pub mod merge_base;
mod queue;
pub mod walk;

#[cfg(test)]
mod testutil;

pub use commit::{RevCommit, RevSort};
pub use error::{WalkError, WalkResult};
pub use filter::RevFilter;
pub use flags::Flags;
pub use walk::RevWalk;
