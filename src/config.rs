//! Client configuration loading.
//!
//! A [`ClientConfig`] bundles the window policy and the HTTP transport
//! settings. It can be built in code, parsed from YAML, and then adjusted
//! from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HTTP_BATCH_TIME_SPAN_MS` | `batch.max_time_span` |
//! | `HTTP_BATCH_MAX_SIZE` | `batch.max_size` |
//! | `HTTP_BATCH_DEBUG` | `batch.debug` (`1`/`true`) |
//! | `HTTP_BATCH_URL` | `transport.batch_url` |
//! | `HTTP_BATCH_TIMEOUT_SECS` | `transport.timeout_ms` (given in seconds) |
//!
//! ```rust
//! use http_batch_rs::config::ClientConfig;
//!
//! let config = ClientConfig::from_yaml_str(
//!     "batch:\n  max_time_span_ms: 50\n  max_size: 10\ntransport:\n  batch_url: https://api.example.com/api/$batch\n",
//! )
//! .unwrap();
//! assert_eq!(config.batch.max_size, 10);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::batch::BatchConfig;
use crate::transport::HttpTransportConfig;
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub batch: BatchConfig,
    pub transport: HttpTransportConfig,
}

impl ClientConfig {
    pub fn new(batch: BatchConfig, transport: HttpTransportConfig) -> Self {
        Self { batch, transport }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            Error::configuration_with_context(
                "invalid client configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "cannot read config file");
            Error::from(e)
        })?;
        Self::from_yaml_str(&content)
    }

    /// Apply `HTTP_BATCH_*` overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Unparsable values are ignored with a warning.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parsed::<u64>(&lookup, "HTTP_BATCH_TIME_SPAN_MS") {
            self.batch.max_time_span = Duration::from_millis(ms);
        }
        if let Some(size) = parsed::<usize>(&lookup, "HTTP_BATCH_MAX_SIZE") {
            self.batch.max_size = size;
        }
        if let Some(flag) = lookup("HTTP_BATCH_DEBUG") {
            self.batch.debug = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(url) = lookup("HTTP_BATCH_URL") {
            self.transport.batch_url = url;
        }
        if let Some(secs) = parsed::<u64>(&lookup, "HTTP_BATCH_TIMEOUT_SECS") {
            self.transport = self.transport.with_timeout(Duration::from_secs(secs));
        }
        self
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}
