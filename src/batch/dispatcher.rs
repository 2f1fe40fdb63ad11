//! Dispatch core: sends one closed window and resolves its entries.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::config::BatchConfig;
use super::demux::{self, Outcomes, ResolveSummary};
use super::interpreter::ResponseInterpreter;
use super::sink::PendingEntry;
use super::stats::AtomicBatchStats;
use crate::codec;
use crate::transport::{Transport, TransportError};

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    interpreter: Arc<dyn ResponseInterpreter>,
    config: BatchConfig,
    stats: Arc<AtomicBatchStats>,
}

impl Dispatcher {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        interpreter: Arc<dyn ResponseInterpreter>,
        config: BatchConfig,
        stats: Arc<AtomicBatchStats>,
    ) -> Self {
        Self {
            transport,
            interpreter,
            config,
            stats,
        }
    }

    /// Send a closed window: one entry goes out as-is, more go out combined.
    /// Exactly one network call per non-empty window.
    pub async fn dispatch(&self, entries: Vec<PendingEntry>) -> ResolveSummary {
        if entries.is_empty() {
            return ResolveSummary::default();
        }
        AtomicBatchStats::incr(&self.stats.windows_dispatched);

        if entries.len() == 1 {
            AtomicBatchStats::incr(&self.stats.single_dispatches);
            return self.dispatch_single(entries).await;
        }
        AtomicBatchStats::incr(&self.stats.batched_dispatches);
        AtomicBatchStats::add(&self.stats.requests_batched, entries.len());
        self.dispatch_batched(entries).await
    }

    /// Single-call path, also used for requests that bypass the window.
    pub(crate) async fn dispatch_single(&self, entries: Vec<PendingEntry>) -> ResolveSummary {
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in &entries {
            let outcome = self
                .transport
                .execute_single(&entry.request)
                .await
                .and_then(|resp| self.interpreter.interpret(resp, &entry.request));
            outcomes.push(outcome);
        }
        let summary = demux::resolve(entries, Outcomes::PerEntry(outcomes), self.config.debug);
        summary.record(&self.stats);
        summary
    }

    async fn dispatch_batched(&self, entries: Vec<PendingEntry>) -> ResolveSummary {
        let started = Instant::now();
        let outcomes = self.execute_batched(&entries).await;
        if let Outcomes::Shared(err) = &outcomes {
            AtomicBatchStats::incr(&self.stats.shared_failures);
            warn!(entries = entries.len(), error = %err, "batch failed for every entry");
        }
        debug!(
            entries = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "combined request finished"
        );
        let summary = demux::resolve(entries, outcomes, self.config.debug);
        summary.record(&self.stats);
        summary
    }

    async fn execute_batched(&self, entries: &[PendingEntry]) -> Outcomes {
        let batch = codec::encode_batch(entries.iter().map(|e| &e.request));

        let reply = match self.transport.execute_combined(&batch).await {
            Ok(reply) => reply,
            Err(err) => return Outcomes::Shared(err),
        };
        if self.config.debug {
            debug!(
                boundary = %batch.boundary(),
                status = reply.status,
                content_type = reply.content_type().unwrap_or_default(),
                "combined reply received"
            );
        }
        if !reply.is_success() {
            return Outcomes::Shared(
                TransportError::Status {
                    status: reply.status,
                    status_text: reply.status_text,
                }
                .into(),
            );
        }

        let parts = match codec::decode(&reply, entries.len()) {
            Ok(parts) => parts,
            Err(err) => return Outcomes::Shared(err),
        };
        if self.config.strict_content_ids {
            if let Err(err) = codec::validate_content_ids(&parts) {
                return Outcomes::Shared(err);
            }
        }

        Outcomes::PerEntry(
            parts
                .into_iter()
                .zip(entries)
                .map(|(part, entry)| self.interpreter.interpret(part.response, &entry.request))
                .collect(),
        )
    }
}
