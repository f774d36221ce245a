//! Pending-commit queues.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::commit::RevCommit;

#[derive(Debug)]
struct Entry {
    time: i64,
    seq: u64,
    commit: RevCommit,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Newest first; among equal times, the earlier insertion first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Max-heap of commits keyed by commit time.
///
/// Commits with equal times come out in the order they were added.
#[derive(Debug, Default)]
pub(crate) struct DateQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

impl DateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, commit: RevCommit, time: i64) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Entry { time, seq, commit });
    }

    pub fn pop(&mut self) -> Option<RevCommit> {
        self.heap.pop().map(|e| e.commit)
    }

    /// Commit time of the next commit to come out.
    pub fn peek_time(&self) -> Option<i64> {
        self.heap.peek().map(|e| e.time)
    }

    pub fn iter(&self) -> impl Iterator<Item = RevCommit> + '_ {
        self.heap.iter().map(|e| e.commit)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::ObjectId;

    fn rc(i: usize) -> RevCommit {
        RevCommit::new(i, ObjectId::from_raw([i as u8; 20]))
    }

    #[test]
    fn newest_first_then_insertion_order() {
        let mut q = DateQueue::new();
        q.push(rc(0), 10);
        q.push(rc(1), 30);
        q.push(rc(2), 20);
        q.push(rc(3), 30);
        assert_eq!(q.peek_time(), Some(30));
        let order: Vec<usize> = std::iter::from_fn(|| q.pop()).map(|c| c.index).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
        assert!(q.is_empty());
    }
}
