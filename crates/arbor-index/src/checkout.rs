//! Plan switching the index from one tree to another.
//!
//! HEAD and the target tree are walked together; only paths that differ
//! between them need work. Such a path is safe to change when its index
//! entry still matches HEAD, or already matches the target. Otherwise the
//! index holds a change that checkout would discard, and the path is a
//! conflict.

use arbor_store::ObjectDatabase;
use arbor_treewalk::{AnyDiffFilter, TreeWalk};
use arbor_types::{FileMode, ObjectId};
use tracing::{debug, warn};

use crate::dircache::{DirCache, DirCacheBuilder};
use crate::entry::DirCacheEntry;
use crate::error::{IndexError, IndexResult};

/// A path to write with new content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutUpdate {
    pub path: String,
    pub mode: FileMode,
    pub id: ObjectId,
}

/// The changes needed to move from HEAD to the target tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub updates: Vec<CheckoutUpdate>,
    pub removals: Vec<String>,
}

impl CheckoutPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.removals.is_empty()
    }

    /// Apply the plan to `current`, producing the index after checkout.
    ///
    /// Updated paths get fresh entries with no cached stat data.
    pub fn apply(&self, current: &DirCache) -> IndexResult<DirCache> {
        let touched = |path: &[u8]| {
            self.removals.iter().any(|p| p.as_bytes() == path)
                || self.updates.iter().any(|u| u.path.as_bytes() == path)
        };
        let mut builder = DirCacheBuilder::new();
        for entry in current.entries().iter().filter(|e| !touched(e.path())) {
            builder.add(entry.clone());
        }
        for update in &self.updates {
            builder.add(DirCacheEntry::with_object(update.path.as_str(), update.mode, update.id)?);
        }
        builder.finish()
    }
}

/// Checkout conflict detection.
pub struct Checkout;

impl Checkout {
    /// Compute the plan for replacing `head_tree` with `merge_tree`.
    ///
    /// `head_tree` is `None` on an unborn branch. Fails with
    /// [`IndexError::CheckoutConflict`] listing every path whose index
    /// entry has uncommitted changes or is unmerged.
    pub fn plan(
        odb: &ObjectDatabase,
        dircache: &DirCache,
        head_tree: Option<ObjectId>,
        merge_tree: ObjectId,
    ) -> IndexResult<CheckoutPlan> {
        let mut walk = TreeWalk::new(odb);
        match head_tree {
            Some(id) => walk.add_tree(id)?,
            None => walk.add_empty_tree(),
        };
        walk.add_tree(merge_tree)?;
        walk.set_recursive(true);
        walk.set_filter(AnyDiffFilter);

        let mut plan = CheckoutPlan::default();
        let mut conflicts = Vec::new();
        while walk.next()? {
            let path = walk.path();
            let staged = dircache.entries_for_path(path);
            if staged.iter().any(DirCacheEntry::is_unmerged) {
                conflicts.push(walk.path_string());
                continue;
            }
            let index = staged.first().map(|e| (e.mode, e.id));
            let head = side(&walk, 0);
            let target = side(&walk, 1);
            if index == target {
                continue;
            }
            if index != head {
                conflicts.push(walk.path_string());
                continue;
            }
            match target {
                Some((mode, id)) => plan.updates.push(CheckoutUpdate {
                    path: walk.path_string(),
                    mode,
                    id,
                }),
                None => plan.removals.push(walk.path_string()),
            }
        }

        if !conflicts.is_empty() {
            warn!(count = conflicts.len(), "checkout would overwrite local changes");
            return Err(IndexError::CheckoutConflict(conflicts));
        }
        debug!(
            updates = plan.updates.len(),
            removals = plan.removals.len(),
            "checkout planned"
        );
        Ok(plan)
    }
}

fn side(walk: &TreeWalk, tree: usize) -> Option<(FileMode, ObjectId)> {
    let mode = walk.file_mode(tree);
    (!mode.is_missing()).then(|| (mode, walk.object_id(tree)))
}
