//! Demultiplexer: routes a window's outcomes back to its callers.

use tracing::debug;

use super::sink::PendingEntry;
use super::stats::AtomicBatchStats;
use crate::types::HttpResponse;
use crate::{Error, Result};

/// Outcome of one dispatched window.
#[derive(Debug)]
pub enum Outcomes {
    /// Same failure for every entry.
    Shared(Error),
    /// One outcome per entry, matched by index.
    PerEntry(Vec<Result<HttpResponse>>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub undelivered: usize,
}

/// Resolve every entry's sink exactly once.
pub fn resolve(entries: Vec<PendingEntry>, outcomes: Outcomes, trace_pairs: bool) -> ResolveSummary {
    let count = entries.len();
    let per_entry: Vec<Result<HttpResponse>> = match outcomes {
        Outcomes::Shared(err) => vec![Err(err); count],
        Outcomes::PerEntry(list) if list.len() == count => list,
        Outcomes::PerEntry(list) => {
            debug_assert_eq!(list.len(), count, "one outcome per entry");
            let err = Error::PartCountMismatch {
                expected: count,
                actual: list.len(),
            };
            vec![Err(err); count]
        }
    };

    let mut summary = ResolveSummary::default();
    for (entry, outcome) in entries.into_iter().zip(per_entry) {
        let ok = outcome.is_ok();
        if trace_pairs {
            match &outcome {
                Ok(resp) => debug!(
                    position = entry.position,
                    method = %entry.request.method(),
                    url = %entry.request.url(),
                    status = resp.status,
                    outcome = "success",
                    "batch entry resolved"
                ),
                Err(err) => debug!(
                    position = entry.position,
                    method = %entry.request.method(),
                    url = %entry.request.url(),
                    error = %err,
                    outcome = "failure",
                    "batch entry resolved"
                ),
            }
        }
        if ok {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
        if !entry.sink.resolve(outcome) {
            debug!(position = entry.position, "caller dropped before resolution");
            summary.undelivered += 1;
        }
    }
    summary
}

impl ResolveSummary {
    pub(crate) fn record(&self, stats: &AtomicBatchStats) {
        AtomicBatchStats::add(&stats.succeeded, self.succeeded);
        AtomicBatchStats::add(&stats.failed, self.failed);
        AtomicBatchStats::add(&stats.undelivered, self.undelivered);
    }
}
