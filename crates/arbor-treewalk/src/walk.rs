//! Lock-step iteration over one or more trees.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use arbor_store::{git_name_cmp, ObjectDatabase, TreeEntry};
use arbor_types::{FileMode, ObjectId, ProgressMonitor};
use tracing::trace;

use crate::error::{TreeWalkError, TreeWalkResult};
use crate::filter::{AllFilter, TreeFilter};
use crate::path::PathFilterGroup;

/// Position inside one tree of one directory level.
struct Cursor {
    entries: Vec<TreeEntry>,
    pos: usize,
}

impl Cursor {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<&TreeEntry> {
        self.entries.get(self.pos)
    }
}

/// One directory level: a cursor per tree.
struct Level {
    /// Path of the directory including its trailing `/`; empty at the root.
    prefix: Vec<u8>,
    cursors: Vec<Cursor>,
}

/// The entry the walk is positioned on.
struct Row {
    path: Vec<u8>,
    name_start: usize,
    depth: usize,
    modes: Vec<FileMode>,
    ids: Vec<ObjectId>,
}

/// Walks `k` trees side by side, one path at a time.
///
/// Every step picks the smallest current name across all trees in tree
/// order and reports, for each tree, the mode and id it holds at that path.
/// Trees without the path report [`FileMode::MISSING`] and the zero id.
///
/// The walk descends into subtrees when it is recursive or when the active
/// filter asks for recursion. In that mode subtree rows themselves are not
/// returned, only their contents.
pub struct TreeWalk {
    odb: ObjectDatabase,
    roots: Vec<Option<ObjectId>>,
    stack: Vec<Level>,
    row: Option<Row>,
    filter: Box<dyn TreeFilter>,
    recursive: bool,
    monitor: Option<Arc<dyn ProgressMonitor>>,
    started: bool,
    finished: bool,
}

impl TreeWalk {
    pub fn new(odb: &ObjectDatabase) -> Self {
        Self {
            odb: odb.clone(),
            roots: Vec::new(),
            stack: Vec::new(),
            row: None,
            filter: Box::new(AllFilter),
            recursive: false,
            monitor: None,
            started: false,
            finished: false,
        }
    }

    /// Locate `path` in `tree` and return a walk positioned on it.
    ///
    /// Returns `Ok(None)` when the path does not exist.
    pub fn for_path(odb: &ObjectDatabase, path: &str, tree: ObjectId) -> TreeWalkResult<Option<Self>> {
        let filter = PathFilterGroup::create([path])?;
        let target = filter.paths()[0].path().to_vec();
        let mut walk = TreeWalk::new(odb);
        walk.set_recursive(false);
        walk.set_filter(filter);
        walk.add_tree(tree)?;
        while walk.next()? {
            if walk.path() == target.as_slice() {
                return Ok(Some(walk));
            }
            if walk.is_subtree() {
                walk.enter_subtree()?;
            }
        }
        Ok(None)
    }

    /// Add a tree to walk. Returns its index.
    pub fn add_tree(&mut self, id: ObjectId) -> TreeWalkResult<usize> {
        // Fail early on ids that are not trees.
        self.odb.map_tree(&id)?;
        self.roots.push(Some(id));
        self.invalidate();
        Ok(self.roots.len() - 1)
    }

    /// Add an empty tree, useful to diff against nothing.
    pub fn add_empty_tree(&mut self) -> usize {
        self.roots.push(None);
        self.invalidate();
        self.roots.len() - 1
    }

    /// Replace the walked trees and restart from the top.
    pub fn reset(&mut self, trees: &[ObjectId]) -> TreeWalkResult<()> {
        self.roots.clear();
        for id in trees {
            self.add_tree(*id)?;
        }
        Ok(())
    }

    /// Number of trees in the walk.
    pub fn tree_count(&self) -> usize {
        self.roots.len()
    }

    pub fn set_recursive(&mut self, recursive: bool) {
        self.recursive = recursive;
    }

    /// Returns `true` if the walk descends into subtrees on its own.
    pub fn is_recursive(&self) -> bool {
        self.recursive || self.filter.should_be_recursive()
    }

    pub fn set_filter(&mut self, filter: impl TreeFilter + 'static) {
        self.filter = Box::new(filter);
    }

    pub fn set_boxed_filter(&mut self, filter: Box<dyn TreeFilter>) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &dyn TreeFilter {
        self.filter.as_ref()
    }

    /// Poll `monitor` for cancellation once per visited entry.
    pub fn set_progress_monitor(&mut self, monitor: Arc<dyn ProgressMonitor>) {
        self.monitor = Some(monitor);
    }

    fn invalidate(&mut self) {
        self.stack.clear();
        self.row = None;
        self.started = false;
        self.finished = false;
    }

    fn start(&mut self) -> TreeWalkResult<()> {
        let mut cursors = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            cursors.push(match root {
                Some(id) => Cursor {
                    entries: self.odb.map_tree(id)?.entries().to_vec(),
                    pos: 0,
                },
                None => Cursor::empty(),
            });
        }
        self.stack.push(Level {
            prefix: Vec::new(),
            cursors,
        });
        self.started = true;
        Ok(())
    }

    /// Advance to the next entry that passes the filter.
    ///
    /// Returns `Ok(false)` once all trees are exhausted or a filter stops
    /// the walk.
    pub fn next(&mut self) -> TreeWalkResult<bool> {
        if !self.started {
            self.start()?;
        }
        if self.finished {
            return Ok(false);
        }
        loop {
            if let Some(monitor) = &self.monitor {
                if monitor.is_cancelled() {
                    return Err(TreeWalkError::Cancelled);
                }
            }
            if !self.advance_row() {
                self.finish();
                return Ok(false);
            }
            if let Some(monitor) = &self.monitor {
                monitor.update(1);
            }

            match self.filter.include(self) {
                Err(_) => {
                    trace!(path = %self.path_string(), "tree walk stopped by filter");
                    self.finish();
                    return Ok(false);
                }
                Ok(false) => continue,
                Ok(true) => {}
            }
            if self.is_recursive() && self.is_subtree() {
                self.enter_subtree()?;
                continue;
            }
            return Ok(true);
        }
    }

    /// Move to the smallest pending name, popping exhausted levels.
    fn advance_row(&mut self) -> bool {
        loop {
            let depth = match self.stack.len() {
                0 => return false,
                n => n - 1,
            };
            let level = &mut self.stack[depth];

            let mut min: Option<(&[u8], bool)> = None;
            for entry in level.cursors.iter().filter_map(Cursor::current) {
                let smaller = match min {
                    None => true,
                    Some((name, tree)) => {
                        git_name_cmp(&entry.name, entry.is_tree(), name, tree) == Ordering::Less
                    }
                };
                if smaller {
                    min = Some((&entry.name, entry.is_tree()));
                }
            }
            let Some((name, tree)) = min else {
                self.stack.pop();
                continue;
            };
            let (name, tree) = (name.to_vec(), tree);

            let mut modes = Vec::with_capacity(level.cursors.len());
            let mut ids = Vec::with_capacity(level.cursors.len());
            for cursor in &mut level.cursors {
                match cursor.current() {
                    Some(e) if git_name_cmp(&e.name, e.is_tree(), &name, tree) == Ordering::Equal => {
                        modes.push(e.mode);
                        ids.push(e.id);
                        cursor.pos += 1;
                    }
                    _ => {
                        modes.push(FileMode::MISSING);
                        ids.push(ObjectId::zero());
                    }
                }
            }

            let mut path = level.prefix.clone();
            let name_start = path.len();
            path.extend_from_slice(&name);
            self.row = Some(Row {
                path,
                name_start,
                depth,
                modes,
                ids,
            });
            return true;
        }
    }

    fn finish(&mut self) {
        self.stack.clear();
        self.row = None;
        self.finished = true;
    }

    /// Descend into the current entry, which must be a subtree.
    ///
    /// The next call to [`next`](Self::next) returns the first child.
    pub fn enter_subtree(&mut self) -> TreeWalkResult<()> {
        let row = match &self.row {
            Some(row) if row.modes.iter().any(|m| m.is_tree()) => row,
            _ => return Err(TreeWalkError::NotASubtree),
        };
        let mut cursors = Vec::with_capacity(row.modes.len());
        for (mode, id) in row.modes.iter().zip(&row.ids) {
            cursors.push(if mode.is_tree() {
                Cursor {
                    entries: self.odb.map_tree(id)?.entries().to_vec(),
                    pos: 0,
                }
            } else {
                Cursor::empty()
            });
        }
        let mut prefix = row.path.clone();
        prefix.push(b'/');
        self.stack.push(Level { prefix, cursors });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Current row
    // -----------------------------------------------------------------------

    /// Full path of the current entry, `/`-separated.
    pub fn path(&self) -> &[u8] {
        self.row.as_ref().map_or(&[], |r| r.path.as_slice())
    }

    pub fn path_string(&self) -> String {
        String::from_utf8_lossy(self.path()).into_owned()
    }

    /// Last component of the current path.
    pub fn name(&self) -> &[u8] {
        self.row.as_ref().map_or(&[], |r| &r.path[r.name_start..])
    }

    /// Number of directories above the current entry.
    pub fn depth(&self) -> usize {
        self.row.as_ref().map_or(0, |r| r.depth)
    }

    pub fn raw_mode(&self, tree: usize) -> u32 {
        self.file_mode(tree).bits()
    }

    /// Mode of the current entry in tree `tree`; `MISSING` if absent.
    pub fn file_mode(&self, tree: usize) -> FileMode {
        self.row
            .as_ref()
            .and_then(|r| r.modes.get(tree).copied())
            .unwrap_or(FileMode::MISSING)
    }

    /// Id of the current entry in tree `tree`; zero if absent.
    pub fn object_id(&self, tree: usize) -> ObjectId {
        self.row
            .as_ref()
            .and_then(|r| r.ids.get(tree).copied())
            .unwrap_or_else(ObjectId::zero)
    }

    pub fn id_equal(&self, a: usize, b: usize) -> bool {
        self.object_id(a) == self.object_id(b)
    }

    /// Returns `true` if any tree holds a subtree at the current path.
    pub fn is_subtree(&self) -> bool {
        self.row
            .as_ref()
            .is_some_and(|r| r.modes.iter().any(|m| m.is_tree()))
    }

    /// Compare the current path with a filter path.
    ///
    /// `Equal` means one is a directory prefix of the other, so the filter
    /// path is this entry, below it, or above it. `Greater` means the walk
    /// has moved past the filter path for good. `Less` means it has not
    /// reached it yet or the relation cannot be decided.
    pub fn is_path_prefix(&self, pattern: &[u8]) -> Ordering {
        let current = self.path();
        let n = current.len().min(pattern.len());
        for i in 0..n {
            match current[i].cmp(&pattern[i]) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        if n < current.len() {
            return if current[n] == b'/' {
                Ordering::Equal
            } else {
                Ordering::Less
            };
        }
        if n < pattern.len() {
            return if pattern[n] == b'/' && self.is_subtree() {
                Ordering::Equal
            } else {
                Ordering::Less
            };
        }
        Ordering::Equal
    }
}

impl fmt::Debug for TreeWalk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeWalk")
            .field("trees", &self.roots.len())
            .field("recursive", &self.is_recursive())
            .field("filter", &self.filter)
            .field("path", &self.path_string())
            .finish()
    }
}
