//! Window scheduler: owns the open window and drives its timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::time::Instant as TokioInstant;
use tracing::debug;

use super::config::BatchConfig;
use super::dispatcher::Dispatcher;
use super::sink::{PendingEntry, ResultSink};
use super::window::{BatchWindow, ClosedWindow, PushOutcome};
use crate::types::LogicalRequest;

/// Enqueue and close both run under one lock, so every entry lands in exactly
/// one window.
pub(crate) struct WindowScheduler {
    window: Mutex<BatchWindow<PendingEntry>>,
    dispatcher: Arc<Dispatcher>,
}

impl WindowScheduler {
    pub fn new(config: &BatchConfig, dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self {
            window: Mutex::new(BatchWindow::new(config)),
            dispatcher,
        })
    }

    // The window stays consistent across a panic elsewhere, so a poisoned lock is reused.
    fn lock(&self) -> MutexGuard<'_, BatchWindow<PendingEntry>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called from within a Tokio runtime.
    pub fn enqueue(self: &Arc<Self>, request: LogicalRequest, sink: ResultSink) {
        let outcome = {
            let mut window = self.lock();
            let position = window.len();
            // Read from the runtime clock so deadlines line up with tokio timers.
            window.push(PendingEntry::new(position, request, sink), TokioInstant::now().into_std())
        };
        match outcome {
            PushOutcome::Opened {
                generation,
                deadline,
            } => self.arm_timer(generation, deadline),
            PushOutcome::Queued { .. } => {}
            PushOutcome::Closed(closed) => self.spawn_dispatch(closed),
        }
    }

    /// Close the open window now, if it holds anything.
    pub fn flush(&self) {
        let closed = self.lock().flush();
        if let Some(closed) = closed {
            self.spawn_dispatch(closed);
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// The timer counts from the window's open time, not from when the task first runs.
    fn arm_timer(self: &Arc<Self>, generation: u64, deadline: Instant) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(TokioInstant::from_std(deadline)).await;
            let closed = this.lock().close_expired(generation);
            if let Some(closed) = closed {
                this.spawn_dispatch(closed);
            }
        });
    }

    fn spawn_dispatch(&self, closed: ClosedWindow<PendingEntry>) {
        debug!(
            generation = closed.generation,
            trigger = ?closed.trigger,
            entries = closed.len(),
            open_ms = TokioInstant::from_std(closed.opened_at).elapsed().as_millis() as u64,
            "batch window closed"
        );
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            dispatcher.dispatch(closed.entries).await;
        });
    }
}
