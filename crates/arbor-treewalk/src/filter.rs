//! Tree filters: decide which walk entries a caller sees.
//!
//! Filters are evaluated once per entry, subtrees included. Excluding a
//! subtree skips everything beneath it, so filters that select deep paths
//! must include the directories leading to them.

use std::fmt;

use crate::walk::TreeWalk;

/// Signal from a filter that no later entry can match.
///
/// The walk ends as if all trees were exhausted. Only filters that know the
/// walk order (such as a sorted path group) may raise it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopWalk;

impl fmt::Display for StopWalk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tree walk stopped by filter")
    }
}

impl std::error::Error for StopWalk {}

/// Selects entries of a [`TreeWalk`].
pub trait TreeFilter: fmt::Debug + Send + Sync {
    /// Decide whether the walk's current entry is included.
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk>;

    /// Returns `true` if this filter needs to see entries inside subtrees
    /// even when the walk itself is not recursive.
    fn should_be_recursive(&self) -> bool;

    /// An independent copy of this filter.
    fn box_clone(&self) -> Box<dyn TreeFilter>;
}

impl Clone for Box<dyn TreeFilter> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Includes every entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllFilter;

impl TreeFilter for AllFilter {
    fn include(&self, _walk: &TreeWalk) -> Result<bool, StopWalk> {
        Ok(true)
    }

    fn should_be_recursive(&self) -> bool {
        false
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(*self)
    }
}

/// Includes an entry when any tree differs from tree 0 in mode or id.
///
/// A walk over a single tree includes everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyDiffFilter;

impl TreeFilter for AnyDiffFilter {
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk> {
        let n = walk.tree_count();
        if n <= 1 {
            return Ok(true);
        }
        let mode = walk.raw_mode(0);
        Ok((1..n).any(|i| walk.raw_mode(i) != mode || !walk.id_equal(0, i)))
    }

    fn should_be_recursive(&self) -> bool {
        false
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(*self)
    }
}

/// Includes an entry only if every subfilter does.
///
/// Subfilters run in order and evaluation stops at the first rejection, so
/// put cheap, selective filters first.
#[derive(Clone, Debug)]
pub struct AndFilter {
    filters: Vec<Box<dyn TreeFilter>>,
}

impl AndFilter {
    pub fn new(filters: Vec<Box<dyn TreeFilter>>) -> Self {
        Self { filters }
    }

    pub fn pair(a: impl TreeFilter + 'static, b: impl TreeFilter + 'static) -> Self {
        let filters: Vec<Box<dyn TreeFilter>> = vec![Box::new(a), Box::new(b)];
        Self::new(filters)
    }
}

impl TreeFilter for AndFilter {
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk> {
        for filter in &self.filters {
            if !filter.include(walk)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn should_be_recursive(&self) -> bool {
        self.filters.iter().any(|f| f.should_be_recursive())
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(self.clone())
    }
}

/// Includes an entry if any subfilter does.
#[derive(Clone, Debug)]
pub struct OrFilter {
    filters: Vec<Box<dyn TreeFilter>>,
}

impl OrFilter {
    pub fn new(filters: Vec<Box<dyn TreeFilter>>) -> Self {
        Self { filters }
    }
}

impl TreeFilter for OrFilter {
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk> {
        for filter in &self.filters {
            if filter.include(walk)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn should_be_recursive(&self) -> bool {
        self.filters.iter().any(|f| f.should_be_recursive())
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(self.clone())
    }
}

/// Inverts another filter.
#[derive(Clone, Debug)]
pub struct NotFilter {
    inner: Box<dyn TreeFilter>,
}

impl NotFilter {
    pub fn new(inner: impl TreeFilter + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl TreeFilter for NotFilter {
    fn include(&self, walk: &TreeWalk) -> Result<bool, StopWalk> {
        Ok(!self.inner.include(walk)?)
    }

    fn should_be_recursive(&self) -> bool {
        self.inner.should_be_recursive()
    }

    fn box_clone(&self) -> Box<dyn TreeFilter> {
        Box::new(self.clone())
    }
}
