//! The [`RefStore`] trait defining the reference storage interface.

use arbor_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::{Ref, RefUpdate, UpdateOutcome, HEAD, R_HEADS, R_TAGS};

/// Maximum number of symbolic hops followed when resolving a ref.
pub const MAX_SYMBOLIC_DEPTH: usize = 5;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). Every mutating
/// operation is atomic: it either fully applies or leaves the ref untouched.
/// The namespace follows git's layout:
///
/// - `HEAD`
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
/// - `refs/remotes/{remote}/*` for remote-tracking refs
pub trait RefStore: Send + Sync {
    /// Read a ref by its full name without following symbolic links.
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read(&self, name: &str) -> Result<Option<Ref>>;

    /// List refs whose full name starts with `prefix`, sorted by name.
    ///
    /// `HEAD` is not part of the listing.
    fn list(&self, prefix: &str) -> Result<Vec<Ref>>;

    /// Apply a compare-and-swap update.
    ///
    /// If `update.name` is symbolic, the ref at the end of its chain is the
    /// one moved. Fails with [`RefError::Rejected`] if the precondition does
    /// not hold.
    fn update(&self, update: &RefUpdate) -> Result<UpdateOutcome>;

    /// Delete a ref, optionally requiring it to hold `expected_old`.
    ///
    /// Returns `Ok(true)` if the ref existed and was deleted.
    fn delete(&self, name: &str, expected_old: Option<ObjectId>) -> Result<bool>;

    /// Create or replace `name` as a symbolic ref pointing at `target`.
    fn link(&self, name: &str, target: &str) -> Result<()>;

    /// Follow symbolic refs from `name` to the name of the final ref.
    ///
    /// The final ref need not exist (an unborn branch).
    fn leaf_name(&self, name: &str) -> Result<String> {
        let mut current = name.to_string();
        for _ in 0..=MAX_SYMBOLIC_DEPTH {
            match self.read(&current)? {
                Some(Ref::Symbolic { target, .. }) => current = target,
                _ => return Ok(current),
            }
        }
        Err(RefError::SymbolicLoop {
            name: name.to_string(),
        })
    }

    /// Follow symbolic refs from `name` to an object id.
    ///
    /// Returns `Ok(None)` if the ref, or the ref at the end of its chain,
    /// does not exist.
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        let leaf = self.leaf_name(name)?;
        Ok(self.read(&leaf)?.and_then(|r| r.object_id()))
    }

    /// Read `HEAD`.
    fn head(&self) -> Result<Option<Ref>> {
        self.read(HEAD)
    }

    /// List all branch refs.
    fn branches(&self) -> Result<Vec<Ref>> {
        self.list(R_HEADS)
    }

    /// List all tag refs.
    fn tags(&self) -> Result<Vec<Ref>> {
        self.list(R_TAGS)
    }
}
