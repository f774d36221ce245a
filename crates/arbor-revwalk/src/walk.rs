//! The revision walker.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use arbor_store::{Commit, ObjectDatabase};
use arbor_treewalk::{AndFilter, AnyDiffFilter, TreeFilter, TreeWalk};
use arbor_types::{ObjectId, ObjectIdMap, ObjectType, ProgressMonitor};
use tracing::{debug, trace};

use crate::commit::{CommitNode, RevCommit, RevSort, SortSet};
use crate::error::{WalkError, WalkResult};
use crate::filter::RevFilter;
use crate::flags::Flags;
use crate::queue::DateQueue;

/// Extra commits to pop once everything pending is uninteresting, in case
/// skewed commit times hide an interesting commit further down.
const OVER_SCAN: u32 = 5;

/// Lazy, flag-driven walk over the commit graph.
///
/// Commits are interned: [`lookup_commit`](Self::lookup_commit) returns the
/// same [`RevCommit`] for an id for the lifetime of the walk, and all
/// per-commit state (flags, parsed headers, parents) lives in the walk.
/// Parents are only parsed when their child is taken off the pending queue.
///
/// Only commits are interned. Trees and tags are read through the
/// [`ObjectDatabase`] when needed (peeling a start point, applying a tree
/// filter) and get no walk-local handle or flags.
///
/// A walk is single-threaded. Give each worker its own walk over a shared
/// [`ObjectDatabase`].
pub struct RevWalk {
    odb: ObjectDatabase,
    nodes: Vec<CommitNode>,
    index: ObjectIdMap<usize>,
    roots: Vec<RevCommit>,
    pending: DateQueue,
    buffer: Option<VecDeque<RevCommit>>,
    sorts: SortSet,
    rev_filter: RevFilter,
    tree_filter: Option<Box<dyn TreeFilter>>,
    max_count: Option<usize>,
    emitted: usize,
    over_scan: u32,
    last_time: i64,
    monitor: Option<Arc<dyn ProgressMonitor>>,
}

impl RevWalk {
    pub fn new(odb: &ObjectDatabase) -> Self {
        Self {
            odb: odb.clone(),
            nodes: Vec::new(),
            index: ObjectIdMap::new(),
            roots: Vec::new(),
            pending: DateQueue::new(),
            buffer: None,
            sorts: SortSet::default(),
            rev_filter: RevFilter::All,
            tree_filter: None,
            max_count: None,
            emitted: 0,
            over_scan: OVER_SCAN,
            last_time: i64::MAX,
            monitor: None,
        }
    }

    pub fn object_database(&self) -> &ObjectDatabase {
        &self.odb
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Replace the active orderings with `sort`.
    pub fn set_sort(&mut self, sort: RevSort) {
        self.sorts = SortSet::default();
        self.sorts.add(sort);
    }

    /// Add `sort` to the active orderings. `RevSort::None` clears them.
    pub fn add_sort(&mut self, sort: RevSort) {
        self.sorts.add(sort);
    }

    pub fn has_sort(&self, sort: RevSort) -> bool {
        self.sorts.contains(sort)
    }

    pub fn set_rev_filter(&mut self, filter: RevFilter) {
        self.rev_filter = filter;
    }

    /// Only emit commits that change paths selected by `filter`.
    ///
    /// A root commit is emitted if its tree has a selected entry. Any other
    /// commit is emitted if its tree differs under the filter from every
    /// parent's tree.
    pub fn set_tree_filter(&mut self, filter: impl TreeFilter + 'static) {
        self.tree_filter = Some(Box::new(filter));
    }

    pub fn set_boxed_tree_filter(&mut self, filter: Option<Box<dyn TreeFilter>>) {
        self.tree_filter = filter;
    }

    /// Stop after `max` commits; `None` removes the limit.
    pub fn set_max_count(&mut self, max: Option<usize>) {
        self.max_count = max;
    }

    /// Poll `monitor` for cancellation once per dequeued commit.
    pub fn set_progress_monitor(&mut self, monitor: Arc<dyn ProgressMonitor>) {
        self.monitor = Some(monitor);
    }

    // -----------------------------------------------------------------------
    // Interning and parsing
    // -----------------------------------------------------------------------

    /// The walk's handle for `id`, created unparsed if new.
    pub fn lookup_commit(&mut self, id: ObjectId) -> RevCommit {
        if let Some(&index) = self.index.get(&id) {
            return RevCommit::new(index, id);
        }
        let index = self.nodes.len();
        self.nodes.push(CommitNode::new(id));
        self.index.insert(id, index);
        RevCommit::new(index, id)
    }

    /// Look up and parse the commit `id` names. Annotated tags are peeled.
    pub fn parse_commit(&mut self, id: ObjectId) -> WalkResult<RevCommit> {
        let id = self.odb.peel_to(&id, ObjectType::Commit)?;
        let commit = self.lookup_commit(id);
        self.parse_headers(commit)?;
        Ok(commit)
    }

    /// Load the headers of `commit` if not done already.
    pub fn parse_headers(&mut self, commit: RevCommit) -> WalkResult<()> {
        if self.nodes[commit.index].flags.contains(Flags::PARSED) {
            return Ok(());
        }
        let headers = self.odb.map_commit(&commit.id())?;
        let parents: Vec<RevCommit> = headers
            .parents
            .iter()
            .map(|p| self.lookup_commit(*p))
            .collect();
        let node = &mut self.nodes[commit.index];
        node.commit_time = headers.committer.when;
        node.parents = parents;
        node.headers = Some(headers);
        node.flags.insert(Flags::PARSED);
        Ok(())
    }

    /// Parsed headers of `commit`, if it has been parsed.
    pub fn commit(&self, commit: RevCommit) -> Option<&Commit> {
        self.nodes[commit.index].headers.as_ref()
    }

    /// Parents of a parsed commit; empty if unparsed.
    pub fn parents(&self, commit: RevCommit) -> &[RevCommit] {
        &self.nodes[commit.index].parents
    }

    pub fn commit_time(&self, commit: RevCommit) -> i64 {
        self.nodes[commit.index].commit_time
    }

    pub fn flags(&self, commit: RevCommit) -> Flags {
        self.nodes[commit.index].flags
    }

    pub fn has_flag(&self, commit: RevCommit, flag: Flags) -> bool {
        self.nodes[commit.index].flags.contains(flag)
    }

    /// Number of commits interned so far.
    pub fn interned(&self) -> usize {
        self.nodes.len()
    }

    // -----------------------------------------------------------------------
    // Roots
    // -----------------------------------------------------------------------

    /// Start the walk from `commit`.
    pub fn mark_start(&mut self, commit: RevCommit) -> WalkResult<()> {
        self.parse_headers(commit)?;
        let node = &mut self.nodes[commit.index];
        if node.flags.contains(Flags::SEEN) {
            return Ok(());
        }
        node.flags.insert(Flags::SEEN);
        let time = node.commit_time;
        self.roots.push(commit);
        self.pending.push(commit, time);
        Ok(())
    }

    /// Exclude `commit` and everything reachable from it.
    pub fn mark_uninteresting(&mut self, commit: RevCommit) -> WalkResult<()> {
        self.parse_headers(commit)?;
        self.nodes[commit.index].flags.insert(Flags::UNINTERESTING);
        self.carry_uninteresting(commit);
        self.mark_start(commit)
    }

    /// Push UNINTERESTING to the parents of `commit`, and on through any
    /// parent already parsed. Stops wherever the flag is already set.
    fn carry_uninteresting(&mut self, commit: RevCommit) {
        let mut stack = vec![commit];
        while let Some(c) = stack.pop() {
            for i in 0..self.nodes[c.index].parents.len() {
                let p = self.nodes[c.index].parents[i];
                let parent = &mut self.nodes[p.index];
                if parent.flags.contains(Flags::UNINTERESTING) {
                    continue;
                }
                parent.flags.insert(Flags::UNINTERESTING);
                if parent.flags.contains(Flags::PARSED) {
                    stack.push(p);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Iteration
    // -----------------------------------------------------------------------

    /// Produce the next commit in the configured order.
    pub fn next_commit(&mut self) -> WalkResult<Option<RevCommit>> {
        if self.max_count.is_some_and(|max| self.emitted >= max) {
            return Ok(None);
        }
        let next = if self.sorts.buffers() {
            if self.buffer.is_none() {
                let buffered = self.materialize()?;
                self.buffer = Some(buffered);
            }
            self.buffer.as_mut().and_then(VecDeque::pop_front)
        } else {
            self.next_pending()?
        };
        if next.is_some() {
            self.emitted += 1;
        }
        Ok(next)
    }

    pub(crate) fn check_cancelled(&self) -> WalkResult<()> {
        match &self.monitor {
            Some(monitor) if monitor.is_cancelled() => Err(WalkError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Pull the next interesting, accepted commit off the date queue.
    fn next_pending(&mut self) -> WalkResult<Option<RevCommit>> {
        loop {
            self.check_cancelled()?;
            let Some(c) = self.pending.pop() else {
                return Ok(None);
            };

            let parents = self.nodes[c.index].parents.clone();
            for p in parents {
                if self.nodes[p.index].flags.contains(Flags::SEEN) {
                    continue;
                }
                self.parse_headers(p)?;
                let parent = &mut self.nodes[p.index];
                parent.flags.insert(Flags::SEEN);
                let time = parent.commit_time;
                self.pending.push(p, time);
            }
            if let Some(monitor) = &self.monitor {
                monitor.update(1);
            }

            if self.nodes[c.index].flags.contains(Flags::UNINTERESTING) {
                self.carry_uninteresting(c);
                let all_uninteresting = self
                    .pending
                    .iter()
                    .all(|q| self.nodes[q.index].flags.contains(Flags::UNINTERESTING));
                if !all_uninteresting {
                    self.over_scan = OVER_SCAN;
                } else if self.pending.peek_time().is_some_and(|t| t >= self.last_time) {
                    self.over_scan = OVER_SCAN;
                } else {
                    self.over_scan -= 1;
                    if self.over_scan == 0 {
                        trace!(commit = %c.id(), "only uninteresting commits left; stopping");
                        self.pending.clear();
                        return Ok(None);
                    }
                }
                continue;
            }

            if !self.include(c)? {
                continue;
            }
            self.last_time = self.nodes[c.index].commit_time;
            return Ok(Some(c));
        }
    }

    fn include(&mut self, commit: RevCommit) -> WalkResult<bool> {
        let accepted = self
            .commit(commit)
            .is_some_and(|headers| self.rev_filter.include(headers));
        if !accepted {
            return Ok(false);
        }
        self.tree_filter_includes(commit)
    }

    fn tree_of(&self, commit: RevCommit) -> ObjectId {
        self.commit(commit).map_or_else(ObjectId::zero, |c| c.tree)
    }

    fn tree_filter_includes(&mut self, commit: RevCommit) -> WalkResult<bool> {
        let Some(filter) = self.tree_filter.clone() else {
            return Ok(true);
        };
        let tree = self.tree_of(commit);
        let parents = self.nodes[commit.index].parents.clone();

        if parents.is_empty() {
            let mut walk = TreeWalk::new(&self.odb);
            walk.add_tree(tree)?;
            walk.set_recursive(true);
            walk.set_boxed_filter(filter);
            return Ok(walk.next()?);
        }

        for parent in parents {
            self.parse_headers(parent)?;
            let parent_tree = self.tree_of(parent);
            if parent_tree == tree {
                return Ok(false);
            }
            let mut walk = TreeWalk::new(&self.odb);
            walk.add_tree(parent_tree)?;
            walk.add_tree(tree)?;
            walk.set_recursive(true);
            let both: Vec<Box<dyn TreeFilter>> = vec![Box::new(AnyDiffFilter), filter.clone()];
            walk.set_filter(AndFilter::new(both));
            if !walk.next()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Drain the pending queue and apply buffered orderings.
    fn materialize(&mut self) -> WalkResult<VecDeque<RevCommit>> {
        let mut all = Vec::new();
        while let Some(c) = self.next_pending()? {
            all.push(c);
        }
        if self.sorts.topo {
            all = self.topo_order(all);
        }
        if let Some(max) = self.max_count {
            all.truncate(max);
        }
        if self.sorts.reverse {
            all.reverse();
        }
        debug!(commits = all.len(), topo = self.sorts.topo, reverse = self.sorts.reverse, "history buffered");
        Ok(all.into())
    }

    /// Order `commits` so no commit precedes one of its children.
    ///
    /// A commit becomes ready once all of its children in `commits` have
    /// been emitted. Ready commits come out newest first when commit-time
    /// ordering is active, otherwise depth first along the most recently
    /// released parent.
    fn topo_order(&mut self, commits: Vec<RevCommit>) -> Vec<RevCommit> {
        for c in &commits {
            let node = &mut self.nodes[c.index];
            node.flags.insert(Flags::TOPO_DELAY);
            node.in_degree = 0;
        }
        for c in &commits {
            for i in 0..self.nodes[c.index].parents.len() {
                let p = self.nodes[c.index].parents[i];
                let parent = &mut self.nodes[p.index];
                if parent.flags.contains(Flags::TOPO_DELAY) {
                    parent.in_degree += 1;
                }
            }
        }

        let mut out = Vec::with_capacity(commits.len());
        let roots = commits.iter().filter(|c| self.nodes[c.index].in_degree == 0);
        if self.sorts.commit_time {
            let mut ready = DateQueue::new();
            for c in roots {
                ready.push(*c, self.nodes[c.index].commit_time);
            }
            while let Some(c) = ready.pop() {
                out.push(c);
                for p in self.release(c) {
                    ready.push(p, self.nodes[p.index].commit_time);
                }
            }
        } else {
            let mut ready: Vec<RevCommit> = roots.copied().collect();
            ready.reverse();
            while let Some(c) = ready.pop() {
                out.push(c);
                ready.extend(self.release(c).into_iter().rev());
            }
        }
        out
    }

    /// Mark `commit` emitted and return the parents this makes ready.
    fn release(&mut self, commit: RevCommit) -> Vec<RevCommit> {
        self.nodes[commit.index].flags.remove(Flags::TOPO_DELAY);
        let mut ready = Vec::new();
        for i in 0..self.nodes[commit.index].parents.len() {
            let p = self.nodes[commit.index].parents[i];
            let parent = &mut self.nodes[p.index];
            if parent.flags.contains(Flags::TOPO_DELAY) {
                parent.in_degree -= 1;
                if parent.in_degree == 0 {
                    ready.push(p);
                }
            }
        }
        ready
    }

    // -----------------------------------------------------------------------
    // Reuse
    // -----------------------------------------------------------------------

    /// Forget roots, queues, and traversal flags. Interned and parsed
    /// commits, sort orders, and filters are kept.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.flags.remove(Flags::TRAVERSAL);
            node.flags.remove(Flags::MERGE);
            node.in_degree = 0;
        }
        self.roots.clear();
        self.pending.clear();
        self.buffer = None;
        self.emitted = 0;
        self.over_scan = OVER_SCAN;
        self.last_time = i64::MAX;
        debug!(interned = self.nodes.len(), "revision walk reset");
    }

    /// Reset and also drop every interned commit.
    ///
    /// Handles obtained before this call must not be used again.
    pub fn dispose(&mut self) {
        self.reset();
        self.nodes.clear();
        self.index.clear();
    }

    /// Roots marked since the last reset.
    pub fn roots(&self) -> &[RevCommit] {
        &self.roots
    }

    pub(crate) fn set_flags(&mut self, commit: RevCommit, flags: Flags) {
        self.nodes[commit.index].flags = flags;
    }

    pub(crate) fn clear_flags(&mut self, flags: Flags) {
        for node in &mut self.nodes {
            node.flags.remove(flags);
        }
    }
}

impl Iterator for RevWalk {
    type Item = WalkResult<RevCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_commit().transpose()
    }
}

impl fmt::Debug for RevWalk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevWalk")
            .field("interned", &self.nodes.len())
            .field("roots", &self.roots)
            .field("sorts", &self.sorts)
            .field("rev_filter", &self.rev_filter)
            .field("tree_filter", &self.tree_filter)
            .field("max_count", &self.max_count)
            .finish_non_exhaustive()
    }
}
