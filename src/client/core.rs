use std::sync::Arc;

use tracing::debug;

use super::builder::BatchClientBuilder;
use super::predicate::{is_already_batched, BatchPredicate};
use crate::batch::scheduler::WindowScheduler;
use crate::batch::{
    channel, AtomicBatchStats, BatchConfig, BatchStats, Dispatcher, PendingEntry, PendingResponse,
};
use crate::types::{HttpResponse, LogicalRequest};
use crate::Result;

/// Client that transparently batches the requests sent through it.
///
/// Cheap to clone; clones share one window and one set of counters.
#[derive(Clone)]
pub struct BatchClient {
    pub(crate) config: BatchConfig,
    pub(crate) scheduler: Arc<WindowScheduler>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) predicate: Arc<dyn BatchPredicate>,
    pub(crate) stats: Arc<AtomicBatchStats>,
}

impl BatchClient {
    pub fn builder() -> BatchClientBuilder {
        BatchClientBuilder::new()
    }

    /// Send a request and wait for its own reply.
    pub async fn send(&self, request: LogicalRequest) -> Result<HttpResponse> {
        self.submit(request).await
    }

    /// Queue a request without waiting. The returned future resolves once the
    /// request's window has been dispatched.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: LogicalRequest) -> PendingResponse {
        let (sink, pending) = channel();
        if self.should_batch(&request) {
            self.scheduler.enqueue(request, sink);
            return pending;
        }

        debug!(method = %request.method(), url = %request.url(), "request bypasses batching");
        AtomicBatchStats::incr(&self.stats.bypassed);
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            dispatcher
                .dispatch_single(vec![PendingEntry::new(0, request, sink)])
                .await;
        });
        pending
    }

    /// Whether `request` would enter the batch pipeline.
    pub fn should_batch(&self, request: &LogicalRequest) -> bool {
        !is_already_batched(request) && self.predicate.should_batch(request)
    }

    /// Close the open window now instead of waiting for its triggers.
    pub fn flush(&self) {
        self.scheduler.flush();
    }

    /// Requests waiting in the open window.
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn stats(&self) -> BatchStats {
        self.stats.to_stats()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}
