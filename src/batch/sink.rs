//! Result sinks: the one-shot link between a window entry and its caller.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::ready;
use tokio::sync::oneshot;

use crate::types::{HttpResponse, LogicalRequest};
use crate::{Error, ErrorContext, Result};

/// Sending half. Resolving consumes it, so a sink can be resolved once.
#[derive(Debug)]
pub struct ResultSink {
    tx: oneshot::Sender<Result<HttpResponse>>,
}

/// Receiving half; resolves when the caller's window has been dispatched.
#[derive(Debug)]
#[must_use = "a PendingResponse does nothing unless awaited"]
pub struct PendingResponse {
    rx: oneshot::Receiver<Result<HttpResponse>>,
}

pub fn channel() -> (ResultSink, PendingResponse) {
    let (tx, rx) = oneshot::channel();
    (ResultSink { tx }, PendingResponse { rx })
}

impl ResultSink {
    /// Deliver the terminal outcome. Returns false when the caller has gone away.
    pub fn resolve(self, outcome: Result<HttpResponse>) -> bool {
        self.tx.send(outcome).is_ok()
    }

    pub fn succeed(self, response: HttpResponse) -> bool {
        self.resolve(Ok(response))
    }

    pub fn fail(self, error: Error) -> bool {
        self.resolve(Err(error))
    }

    /// The caller dropped its `PendingResponse`.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Future for PendingResponse {
    type Output = Result<HttpResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(outcome) => Poll::Ready(outcome),
            Err(_) => Poll::Ready(Err(Error::runtime_with_context(
                "result sink dropped without resolution",
                ErrorContext::new().with_source("batch_sink"),
            ))),
        }
    }
}

/// A request waiting in a window, with its position and result sink.
#[derive(Debug)]
pub struct PendingEntry {
    pub position: usize,
    pub request: LogicalRequest,
    pub sink: ResultSink,
}

impl PendingEntry {
    pub fn new(position: usize, request: LogicalRequest, sink: ResultSink) -> Self {
        Self {
            position,
            request,
            sink,
        }
    }
}
