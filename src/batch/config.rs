//! Batch window policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Window policy for one batching pipeline.
///
/// Passed explicitly into the client; there is no process-wide default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Longest a window stays open after its first request. Zero closes it on
    /// the next timer tick.
    #[serde(rename = "max_time_span_ms", with = "duration_ms")]
    pub max_time_span: Duration,
    /// Entry count that closes a window at once. Zero leaves only the timer.
    pub max_size: usize,
    /// Trace every request/response pair with its outcome classification.
    pub debug: bool,
    /// Reject replies whose part `Content-ID`s do not match their positions.
    pub strict_content_ids: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_time_span: Duration::from_millis(250),
            max_size: 20,
            debug: false,
            strict_content_ids: false,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_time_span(mut self, span: Duration) -> Self {
        self.max_time_span = span;
        self
    }

    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_strict_content_ids(mut self, strict: bool) -> Self {
        self.strict_content_ids = strict;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
