//! # Request Batching Module
//!
//! Collects requests into time/size-bounded windows and ships each closed
//! window as one combined call.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchConfig`] | Window policy: max time span, max size, tracing, Content-ID strictness |
//! | [`BatchWindow`] | Dual-trigger window state machine |
//! | `Dispatcher` | Single-call fast path or combined multipart path per closed window |
//! | [`demux`] | Routes per-entry outcomes, or one shared failure, to result sinks |
//! | [`ResultSink`] / [`PendingResponse`] | One-shot link between a window entry and its caller |
//! | [`ResponseInterpreter`] | Hook that classifies each reply before it reaches its caller |
//!
//! ## Window triggers
//!
//! - **Size**: the entry count reaches `max_size` (disabled when `max_size` is 0)
//! - **Timer**: `max_time_span` has elapsed since the first entry arrived
//!
//! ```rust
//! use http_batch_rs::batch::{BatchWindow, PushOutcome};
//! use std::time::{Duration, Instant};
//!
//! let mut window = BatchWindow::with_limits(2, Duration::from_millis(100));
//! let now = Instant::now();
//! assert!(matches!(window.push("a", now), PushOutcome::Opened { .. }));
//! match window.push("b", now) {
//!     PushOutcome::Closed(closed) => assert_eq!(closed.entries, vec!["a", "b"]),
//!     _ => unreachable!(),
//! }
//! ```

mod config;
pub mod demux;
mod dispatcher;
mod interpreter;
pub(crate) mod scheduler;
mod sink;
mod stats;
mod window;

pub use config::BatchConfig;
pub use demux::{Outcomes, ResolveSummary};
pub use interpreter::{IdentityInterpreter, ResponseInterpreter, StatusInterpreter};
pub use sink::{channel, PendingEntry, PendingResponse, ResultSink};
pub use stats::BatchStats;
pub use window::{BatchWindow, ClosedWindow, CloseTrigger, PushOutcome};

pub(crate) use dispatcher::Dispatcher;
pub(crate) use stats::AtomicBatchStats;
