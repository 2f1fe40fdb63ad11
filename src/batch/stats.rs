//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the pipeline counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Non-empty windows handed to the dispatcher.
    pub windows_dispatched: u64,
    /// Windows of one entry sent on the single-call path.
    pub single_dispatches: u64,
    /// Windows sent as one combined multipart request.
    pub batched_dispatches: u64,
    /// Requests carried inside combined requests.
    pub requests_batched: u64,
    /// Requests that skipped the window (predicate or already batched).
    pub bypassed: u64,
    /// Windows failed as a whole (transport or codec failure).
    pub shared_failures: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Outcomes whose caller had already gone away.
    pub undelivered: u64,
}

impl BatchStats {
    pub fn average_batch_size(&self) -> f64 {
        if self.batched_dispatches == 0 {
            0.0
        } else {
            self.requests_batched as f64 / self.batched_dispatches as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct AtomicBatchStats {
    pub windows_dispatched: AtomicU64,
    pub single_dispatches: AtomicU64,
    pub batched_dispatches: AtomicU64,
    pub requests_batched: AtomicU64,
    pub bypassed: AtomicU64,
    pub shared_failures: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub undelivered: AtomicU64,
}

impl AtomicBatchStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn to_stats(&self) -> BatchStats {
        BatchStats {
            windows_dispatched: self.windows_dispatched.load(Ordering::Relaxed),
            single_dispatches: self.single_dispatches.load(Ordering::Relaxed),
            batched_dispatches: self.batched_dispatches.load(Ordering::Relaxed),
            requests_batched: self.requests_batched.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            shared_failures: self.shared_failures.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            undelivered: self.undelivered.load(Ordering::Relaxed),
        }
    }
}
