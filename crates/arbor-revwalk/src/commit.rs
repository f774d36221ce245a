//! Walker-local commit handles and sort orders.

use std::fmt;

use arbor_store::Commit;
use arbor_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::flags::Flags;

/// Handle to a commit interned in one [`RevWalk`](crate::RevWalk).
///
/// A walk hands out exactly one handle per id, so handles compare equal
/// only when they name the same commit in the same walk. Handles are not
/// meaningful across walks or after [`RevWalk::dispose`](crate::RevWalk::dispose).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevCommit {
    pub(crate) index: usize,
    id: ObjectId,
}

impl RevCommit {
    pub(crate) fn new(index: usize, id: ObjectId) -> Self {
        Self { index, id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for RevCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevCommit({})", self.id.short_hex())
    }
}

impl fmt::Display for RevCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

/// Arena slot behind a [`RevCommit`].
#[derive(Debug)]
pub(crate) struct CommitNode {
    pub id: ObjectId,
    pub flags: Flags,
    pub commit_time: i64,
    pub parents: Vec<RevCommit>,
    pub headers: Option<Commit>,
    /// Children still to be emitted, for topological ordering.
    pub in_degree: u32,
}

impl CommitNode {
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            flags: Flags::NONE,
            commit_time: 0,
            parents: Vec::new(),
            headers: None,
            in_degree: 0,
        }
    }
}

/// Output orderings. Several may be combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevSort {
    /// Discovery order, which is newest-first among pending commits.
    None,
    /// Never emit a commit before all of its emitted children.
    Topo,
    /// Newest commit time first.
    CommitTime,
    /// Emit the whole sequence backwards.
    Reverse,
}

impl RevSort {
    /// Parse a name as used in configuration and on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(RevSort::None),
            "topo" => Some(RevSort::Topo),
            "commit-time" | "date" => Some(RevSort::CommitTime),
            "reverse" => Some(RevSort::Reverse),
            _ => None,
        }
    }
}

/// The set of active orderings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SortSet {
    pub topo: bool,
    pub commit_time: bool,
    pub reverse: bool,
}

impl SortSet {
    pub fn add(&mut self, sort: RevSort) {
        match sort {
            RevSort::None => *self = SortSet::default(),
            RevSort::Topo => self.topo = true,
            RevSort::CommitTime => self.commit_time = true,
            RevSort::Reverse => self.reverse = true,
        }
    }

    pub fn contains(&self, sort: RevSort) -> bool {
        match sort {
            RevSort::None => *self == SortSet::default(),
            RevSort::Topo => self.topo,
            RevSort::CommitTime => self.commit_time,
            RevSort::Reverse => self.reverse,
        }
    }

    /// Returns `true` if output needs the whole history up front.
    pub fn buffers(&self) -> bool {
        self.topo || self.reverse
    }
}
