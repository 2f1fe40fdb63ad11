//! Batch window state machine.
//!
//! A window opens on its first entry and closes exactly once, on whichever
//! comes first: the entry count reaching `max_size` (when non-zero), or the
//! timer armed at open time firing. Time is passed in by the caller so the
//! triggers can be exercised without a runtime.

use std::time::{Duration, Instant};

use super::config::BatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTrigger {
    Size,
    Timer,
    Flush,
}

/// Entries handed off by a window that just closed.
#[derive(Debug)]
pub struct ClosedWindow<T> {
    pub generation: u64,
    pub opened_at: Instant,
    pub trigger: CloseTrigger,
    pub entries: Vec<T>,
}

impl<T> ClosedWindow<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub enum PushOutcome<T> {
    /// First entry of a new window; arm a timer for `generation` that fires at `deadline`.
    Opened { generation: u64, deadline: Instant },
    Queued { position: usize },
    /// The push filled the window.
    Closed(ClosedWindow<T>),
}

#[derive(Debug)]
pub struct BatchWindow<T> {
    max_size: usize,
    max_time_span: Duration,
    entries: Vec<T>,
    opened_at: Option<Instant>,
    generation: u64,
}

impl<T> BatchWindow<T> {
    pub fn new(config: &BatchConfig) -> Self {
        Self::with_limits(config.max_size, config.max_time_span)
    }

    pub fn with_limits(max_size: usize, max_time_span: Duration) -> Self {
        Self {
            max_size,
            max_time_span,
            entries: Vec::new(),
            opened_at: None,
            generation: 0,
        }
    }

    pub fn push(&mut self, item: T, now: Instant) -> PushOutcome<T> {
        let opening = self.entries.is_empty();
        if opening {
            self.opened_at = Some(now);
        }
        self.entries.push(item);

        if self.max_size > 0 && self.entries.len() >= self.max_size {
            return PushOutcome::Closed(self.close(CloseTrigger::Size));
        }
        if opening {
            PushOutcome::Opened {
                generation: self.generation,
                deadline: now + self.max_time_span,
            }
        } else {
            PushOutcome::Queued {
                position: self.entries.len() - 1,
            }
        }
    }

    /// Timer for `generation` fired. Stale generations and empty windows yield nothing.
    pub fn close_expired(&mut self, generation: u64) -> Option<ClosedWindow<T>> {
        if generation != self.generation || self.entries.is_empty() {
            return None;
        }
        Some(self.close(CloseTrigger::Timer))
    }

    /// Close now, regardless of triggers.
    pub fn flush(&mut self) -> Option<ClosedWindow<T>> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.close(CloseTrigger::Flush))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.opened_at.map(|t| t + self.max_time_span)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn close(&mut self, trigger: CloseTrigger) -> ClosedWindow<T> {
        let closed = ClosedWindow {
            generation: self.generation,
            opened_at: self.opened_at.take().unwrap_or_else(Instant::now),
            trigger,
            entries: std::mem::take(&mut self.entries),
        };
        self.generation = self.generation.wrapping_add(1);
        closed
    }
}
