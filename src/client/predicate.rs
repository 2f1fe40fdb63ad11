//! Opt-out predicate deciding which requests enter the batch pipeline.

use crate::codec::is_batch_content_type;
use crate::types::LogicalRequest;

pub trait BatchPredicate: Send + Sync {
    fn should_batch(&self, request: &LogicalRequest) -> bool;
}

/// Batch every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchAll;

impl BatchPredicate for BatchAll {
    fn should_batch(&self, _request: &LogicalRequest) -> bool {
        true
    }
}

impl<F> BatchPredicate for F
where
    F: Fn(&LogicalRequest) -> bool + Send + Sync,
{
    fn should_batch(&self, request: &LogicalRequest) -> bool {
        self(request)
    }
}

/// A request that already carries a multipart batch body. Such requests never
/// re-enter the pipeline, whatever the predicate says.
pub fn is_already_batched(request: &LogicalRequest) -> bool {
    request
        .content_type()
        .map_or(false, is_batch_content_type)
}
