//! Common-ancestor queries over a [`RevWalk`].

use std::collections::{HashSet, VecDeque};

use crate::commit::RevCommit;
use crate::error::WalkResult;
use crate::flags::Flags;
use crate::queue::DateQueue;
use crate::walk::RevWalk;

impl RevWalk {
    /// Best common ancestors of `a` and `b`.
    ///
    /// A common ancestor is best when no other common ancestor descends
    /// from it. Criss-cross histories can have several. The walk's own
    /// traversal flags are left untouched.
    pub fn merge_base(&mut self, a: RevCommit, b: RevCommit) -> WalkResult<Vec<RevCommit>> {
        self.parse_headers(a)?;
        self.parse_headers(b)?;
        if a == b {
            return Ok(vec![a]);
        }

        let painted = self.paint_down_to_common(a, b);
        self.clear_flags(Flags::MERGE);
        let candidates = painted?;
        if candidates.len() <= 1 {
            return Ok(candidates);
        }

        let mut bases = Vec::with_capacity(candidates.len());
        for (i, &candidate) in candidates.iter().enumerate() {
            let mut redundant = false;
            for (j, &other) in candidates.iter().enumerate() {
                if i != j && self.is_merged_into(candidate, other)? {
                    redundant = true;
                    break;
                }
            }
            if !redundant {
                bases.push(candidate);
            }
        }
        Ok(bases)
    }

    /// Walk down from both commits newest first, painting each commit with
    /// the side(s) that reach it. Commits reached from both sides are
    /// candidates; their ancestors are painted stale and dropped.
    fn paint_down_to_common(&mut self, a: RevCommit, b: RevCommit) -> WalkResult<Vec<RevCommit>> {
        let both = Flags::MERGE_PARENT1 | Flags::MERGE_PARENT2;
        let mut queue = DateQueue::new();
        for (commit, side) in [(a, Flags::MERGE_PARENT1), (b, Flags::MERGE_PARENT2)] {
            let mut flags = self.flags(commit);
            flags.insert(side);
            self.set_flags(commit, flags);
            queue.push(commit, self.commit_time(commit));
        }

        let mut results = Vec::new();
        while queue
            .iter()
            .any(|c| !self.has_flag(c, Flags::MERGE_STALE))
        {
            self.check_cancelled()?;
            let Some(commit) = queue.pop() else {
                break;
            };
            let mut paint = self
                .flags(commit)
                .intersection(both | Flags::MERGE_STALE);
            if paint.contains(both) {
                if !self.has_flag(commit, Flags::MERGE_RESULT) {
                    let mut flags = self.flags(commit);
                    flags.insert(Flags::MERGE_RESULT);
                    self.set_flags(commit, flags);
                    results.push(commit);
                }
                paint.insert(Flags::MERGE_STALE);
            }
            let parents = self.parents(commit).to_vec();
            for parent in parents {
                self.parse_headers(parent)?;
                let mut flags = self.flags(parent);
                if flags.contains(paint) {
                    continue;
                }
                flags.insert(paint);
                self.set_flags(parent, flags);
                queue.push(parent, self.commit_time(parent));
            }
        }

        Ok(results
            .into_iter()
            .filter(|c| !self.has_flag(*c, Flags::MERGE_STALE))
            .collect())
    }

    /// Returns `true` if `base` is `tip` or one of its ancestors.
    pub fn is_merged_into(&mut self, base: RevCommit, tip: RevCommit) -> WalkResult<bool> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(tip);
        queue.push_back(tip);

        while let Some(current) = queue.pop_front() {
            if current == base {
                return Ok(true);
            }
            self.check_cancelled()?;
            self.parse_headers(current)?;
            for &parent in self.parents(current) {
                if visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(false)
    }
}
