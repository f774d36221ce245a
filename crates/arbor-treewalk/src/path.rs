//! Path-based tree filters.

use std::cmp::Ordering;

use crate::error::{TreeWalkError, TreeWalkResult};
use crate::filter::{StopWalk, TreeFilter};
use crate::walk::TreeWalk;

fn normalize(path: &str) -> TreeWalkResult<Vec<u8>> {
    let invalid = |reason: &str| TreeWalkError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("path is empty"));
    }
    if trimmed.starts_with('/') {
        return Err(invalid("path is absolute"));
    }
    if trimmed
        .split('/')
        .any(|c| c.is_empty() || c == "." || c == "..")
    {
        return Err(invalid("path has an empty, '.' or '..' component"));
    }
    Ok(trimmed.as_bytes().to_vec())
}

/// Includes one path, the directories leading to it, and everything below it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PathFilter {
    path: Vec<u8>,
}

impl PathFilter {
    /// Create a filter for a `/`-separated repository path.
    pub fn create(path: &str) -> TreeWalkResult<Self> {
        Ok(Self {
            path: normalize(path)?,
        })
    }

    pub fn path(&self) -> &[u8] {
        &self.path
    }

    /// Returns `true` if the walk is on this path or below it.
    pub fn is_done(&self, walk: &TreeWalk) -> bool {
        let current = walk.path();
        current.starts_with(&self.path)
            && (current.len() == self.path.len() || current[self.path.len()] == b'/')
    }
}

impl TreeFilter for PathFilter {
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk> {
        Ok(walk.is_path_prefix(&self.path) == Ordering::Equal)
    }

    fn should_be_recursive(&self) -> bool {
        self.path.contains(&b'/')
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(self.clone())
    }
}

/// Includes any of a set of paths.
///
/// Candidates are kept in walk order, each placed where it would sort as a
/// directory, since a candidate may name either kind of entry. The filter
/// stops the whole walk once the current path sorts after every candidate
/// and everything below it.
#[derive(Clone, Debug)]
pub struct PathFilterGroup {
    paths: Vec<PathFilter>,
}

impl PathFilterGroup {
    /// Create a group from one or more paths.
    pub fn create<I, S>(paths: I) -> TreeWalkResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filters = paths
            .into_iter()
            .map(|p| PathFilter::create(p.as_ref()))
            .collect::<TreeWalkResult<Vec<_>>>()?;
        if filters.is_empty() {
            return Err(TreeWalkError::InvalidPath {
                path: String::new(),
                reason: "at least one path is required".into(),
            });
        }
        filters.sort_by(|a, b| as_tree(a.path()).cmp(as_tree(b.path())));
        filters.dedup();
        Ok(Self { paths: filters })
    }

    /// Candidate paths in walk order.
    pub fn paths(&self) -> &[PathFilter] {
        &self.paths
    }
}

impl TreeFilter for PathFilterGroup {
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk> {
        let mut past_all = true;
        for candidate in &self.paths {
            if walk.is_path_prefix(candidate.path()) == Ordering::Equal {
                return Ok(true);
            }
            past_all &= is_past(walk, candidate.path());
        }
        if past_all {
            return Err(StopWalk);
        }
        Ok(false)
    }

    fn should_be_recursive(&self) -> bool {
        self.paths.iter().any(|p| p.should_be_recursive())
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(self.clone())
    }
}

/// `path` as it sorts in a tree when it names a directory.
fn as_tree(path: &[u8]) -> impl Iterator<Item = &u8> + Clone {
    path.iter().chain(std::iter::once(&b'/'))
}

/// Returns `true` once the walk has moved beyond `candidate` and anything
/// that could live below it.
fn is_past(walk: &TreeWalk, candidate: &[u8]) -> bool {
    let current = walk.path();
    let below = current.len() > candidate.len()
        && current.starts_with(candidate)
        && current[candidate.len()] == b'/';
    let slash: &[u8] = if walk.is_subtree() { b"/" } else { b"" };
    !below && current.iter().chain(slash).cmp(as_tree(candidate)) == Ordering::Greater
}

/// Includes files whose path ends with a suffix, such as `.rs`.
///
/// Subtrees are always included so the walk can reach their files.
#[derive(Clone, Debug)]
pub struct PathSuffixFilter {
    suffix: Vec<u8>,
}

impl PathSuffixFilter {
    pub fn create(suffix: &str) -> TreeWalkResult<Self> {
        if suffix.is_empty() {
            return Err(TreeWalkError::InvalidPath {
                path: String::new(),
                reason: "suffix is empty".into(),
            });
        }
        Ok(Self {
            suffix: suffix.as_bytes().to_vec(),
        })
    }
}

impl TreeFilter for PathSuffixFilter {
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk> {
        Ok(walk.is_subtree() || walk.path().ends_with(&self.suffix))
    }

    fn should_be_recursive(&self) -> bool {
        true
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(self.clone())
    }
}
