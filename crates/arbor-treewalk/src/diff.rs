//! Tree-level diff: compare two trees and list the changed paths.
//!
//! Built on a two-tree [`TreeWalk`] with [`AnyDiffFilter`], so identical
//! subtrees are skipped without being read. Paths are full and `/`-separated.

use std::collections::HashSet;

use arbor_store::ObjectDatabase;
use arbor_types::{FileMode, ObjectId};
use serde::Serialize;
use tracing::debug;

use crate::error::TreeWalkResult;
use crate::filter::{AndFilter, AnyDiffFilter, TreeFilter};
use crate::walk::TreeWalk;

/// A single change between two trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum DiffEntry {
    Added {
        path: String,
        new_id: ObjectId,
        mode: FileMode,
    },
    Deleted {
        path: String,
        old_id: ObjectId,
        mode: FileMode,
    },
    /// Same path, different content.
    Modified {
        path: String,
        old_id: ObjectId,
        new_id: ObjectId,
        old_mode: FileMode,
        new_mode: FileMode,
    },
    /// Same content moved to a new path.
    Renamed {
        old_path: String,
        new_path: String,
        id: ObjectId,
        mode: FileMode,
    },
    /// Same content, different mode.
    ModeChanged {
        path: String,
        id: ObjectId,
        old_mode: FileMode,
        new_mode: FileMode,
    },
}

impl DiffEntry {
    /// The path in the new tree, or the old path for deletions.
    pub fn path(&self) -> &str {
        match self {
            DiffEntry::Added { path, .. }
            | DiffEntry::Deleted { path, .. }
            | DiffEntry::Modified { path, .. }
            | DiffEntry::ModeChanged { path, .. } => path,
            DiffEntry::Renamed { new_path, .. } => new_path,
        }
    }

    /// One-letter status code as printed by `diff-tree`.
    pub fn status(&self) -> char {
        match self {
            DiffEntry::Added { .. } => 'A',
            DiffEntry::Deleted { .. } => 'D',
            DiffEntry::Modified { .. } => 'M',
            DiffEntry::Renamed { .. } => 'R',
            DiffEntry::ModeChanged { .. } => 'T',
        }
    }
}

/// Compare `old` against `new`.
///
/// `None` on either side stands for an empty tree. An optional `filter`
/// restricts which paths are compared.
pub fn diff_trees(
    odb: &ObjectDatabase,
    old: Option<ObjectId>,
    new: Option<ObjectId>,
    filter: Option<Box<dyn TreeFilter>>,
) -> TreeWalkResult<Vec<DiffEntry>> {
    let mut walk = TreeWalk::new(odb);
    for side in [old, new] {
        match side {
            Some(id) => walk.add_tree(id)?,
            None => walk.add_empty_tree(),
        };
    }
    walk.set_recursive(true);
    match filter {
        Some(filter) => {
            let both: Vec<Box<dyn TreeFilter>> = vec![Box::new(AnyDiffFilter), filter];
            walk.set_filter(AndFilter::new(both));
        }
        None => walk.set_filter(AnyDiffFilter),
    }

    let mut changes = Vec::new();
    let mut deleted: Vec<(String, ObjectId, FileMode)> = Vec::new();
    let mut added: Vec<(String, ObjectId, FileMode)> = Vec::new();

    while walk.next()? {
        let path = walk.path_string();
        let (old_mode, new_mode) = (walk.file_mode(0), walk.file_mode(1));
        let (old_id, new_id) = (walk.object_id(0), walk.object_id(1));
        if old_mode.is_missing() {
            added.push((path, new_id, new_mode));
        } else if new_mode.is_missing() {
            deleted.push((path, old_id, old_mode));
        } else if old_id != new_id {
            changes.push(DiffEntry::Modified {
                path,
                old_id,
                new_id,
                old_mode,
                new_mode,
            });
        } else {
            changes.push(DiffEntry::ModeChanged {
                path,
                id: old_id,
                old_mode,
                new_mode,
            });
        }
    }

    // Rename detection: pair deleted and added entries with the same id.
    let mut matched_deletes = HashSet::new();
    let mut matched_adds = HashSet::new();
    for (di, (old_path, old_id, _)) in deleted.iter().enumerate() {
        let hit = added
            .iter()
            .enumerate()
            .find(|(ai, (_, new_id, _))| new_id == old_id && !matched_adds.contains(ai));
        if let Some((ai, (new_path, _, mode))) = hit {
            changes.push(DiffEntry::Renamed {
                old_path: old_path.clone(),
                new_path: new_path.clone(),
                id: *old_id,
                mode: *mode,
            });
            matched_deletes.insert(di);
            matched_adds.insert(ai);
        }
    }

    for (di, (path, old_id, mode)) in deleted.into_iter().enumerate() {
        if !matched_deletes.contains(&di) {
            changes.push(DiffEntry::Deleted { path, old_id, mode });
        }
    }
    for (ai, (path, new_id, mode)) in added.into_iter().enumerate() {
        if !matched_adds.contains(&ai) {
            changes.push(DiffEntry::Added { path, new_id, mode });
        }
    }

    debug!(changes = changes.len(), renames = matched_adds.len(), "trees compared");
    Ok(changes)
}
