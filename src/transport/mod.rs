//! Transport collaborator: performs the network I/O for single and combined calls.

pub mod http;

pub use http::{BatchMethod, HttpTransport, HttpTransportConfig, DEFAULT_BATCH_PATH};

use async_trait::async_trait;

use crate::codec::EncodedBatch;
use crate::types::{HttpResponse, LogicalRequest};
use crate::Result;

/// Request-execution primitive used by the dispatcher.
///
/// Implementations do not retry; an `Err` is delivered to the affected
/// caller(s) as-is.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request exactly as the caller built it.
    async fn execute_single(&self, request: &LogicalRequest) -> Result<HttpResponse>;

    /// Send one combined multipart request and return the outer reply.
    async fn execute_combined(&self, batch: &EncodedBatch) -> Result<HttpResponse>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Batch endpoint replied HTTP {status} {status_text}")]
    Status { status: u16, status_text: String },

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Other(_) => None,
        }
    }
}
