//! Synchronized walking over one or more Arbor trees.
//!
//! A [`TreeWalk`] advances several trees in lock-step, one path at a time,
//! and exposes each tree's mode and id at that path. Filters decide which
//! paths the caller sees and whether the walk must descend into subtrees.
//!
//! # Key Types
//!
//! - [`TreeWalk`] : the lock-step walker
//! - [`TreeFilter`] / [`StopWalk`] : the filter interface and its early-stop signal
//! - [`AndFilter`] / [`OrFilter`] / [`NotFilter`] / [`AllFilter`] : filter algebra
//! - [`AnyDiffFilter`] : entries that differ between trees
//! - [`PathFilter`] / [`PathFilterGroup`] / [`PathSuffixFilter`] : path selection
//! - [`DiffEntry`] / [`diff_trees`] : tree-to-tree change lists

pub mod diff;
pub mod error;
pub mod filter;
pub mod path;
pub mod walk;

#[cfg(test)]
mod testutil;

pub use diff::{diff_trees, DiffEntry};
pub use error::{TreeWalkError, TreeWalkResult};
pub use filter::{AllFilter, AndFilter, AnyDiffFilter, NotFilter, OrFilter, StopWalk, TreeFilter};
pub use path::{PathFilter, PathFilterGroup, PathSuffixFilter};
pub use walk::TreeWalk;
