//! Progress reporting and cooperative cancellation for long-running visits.
//!
//! Walkers are synchronous and carry no cancellation channel of their own.
//! Callers that need to abort a full-history or full-tree visit hand the
//! walker a [`ProgressMonitor`]; the walker polls it between steps and fails
//! with a cancellation-specific error once it reports cancelled.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Pollable progress sink.
pub trait ProgressMonitor: Send + Sync {
    /// Record `completed` additional units of work.
    fn update(&self, completed: u64);

    /// Returns `true` once the caller wants the operation aborted.
    fn is_cancelled(&self) -> bool;
}

/// Monitor that ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressMonitor;

impl ProgressMonitor for NullProgressMonitor {
    fn update(&self, _completed: u64) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Monitor backed by atomics: counts work and cancels on request.
///
/// Share it behind an `Arc` between the walking thread and the thread that
/// decides to cancel.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    completed: AtomicU64,
}

impl CancelFlag {
    /// Create a monitor that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Units of work recorded so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressMonitor for CancelFlag {
    fn update(&self, completed: u64) {
        self.completed.fetch_add(completed, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_monitor_never_cancels() {
        let monitor = NullProgressMonitor;
        monitor.update(10);
        assert!(!monitor.is_cancelled());
    }

    #[test]
    fn cancel_flag_counts_and_cancels() {
        let flag = CancelFlag::new();
        flag.update(3);
        flag.update(4);
        assert_eq!(flag.completed(), 7);
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }
}
