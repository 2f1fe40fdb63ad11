use std::sync::Arc;
use std::time::Duration;

use super::core::BatchClient;
use super::predicate::{BatchAll, BatchPredicate};
use crate::batch::scheduler::WindowScheduler;
use crate::batch::{
    AtomicBatchStats, BatchConfig, Dispatcher, IdentityInterpreter, ResponseInterpreter,
};
use crate::config::ClientConfig;
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};
use crate::{Error, ErrorContext, Result};

/// Builder for [`BatchClient`].
///
/// A transport is required: either an explicit [`Transport`] or an
/// [`HttpTransportConfig`] from which an [`HttpTransport`] is built.
pub struct BatchClientBuilder {
    config: BatchConfig,
    transport: Option<Arc<dyn Transport>>,
    http: Option<HttpTransportConfig>,
    interpreter: Arc<dyn ResponseInterpreter>,
    predicate: Arc<dyn BatchPredicate>,
}

impl BatchClientBuilder {
    pub fn new() -> Self {
        Self {
            config: BatchConfig::default(),
            transport: None,
            http: None,
            interpreter: Arc::new(IdentityInterpreter),
            predicate: Arc::new(BatchAll),
        }
    }

    /// Start from a loaded [`ClientConfig`].
    pub fn from_config(config: ClientConfig) -> Self {
        Self::new().config(config.batch).http(config.transport)
    }

    pub fn config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_time_span(mut self, span: Duration) -> Self {
        self.config.max_time_span = span;
        self
    }

    /// Zero disables the size trigger.
    pub fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = size;
        self
    }

    pub fn debug(mut self, enable: bool) -> Self {
        self.config.debug = enable;
        self
    }

    pub fn strict_content_ids(mut self, enable: bool) -> Self {
        self.config.strict_content_ids = enable;
        self
    }

    /// Use a custom transport. Takes precedence over [`Self::http`].
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build an [`HttpTransport`] from this config.
    pub fn http(mut self, config: HttpTransportConfig) -> Self {
        self.http = Some(config);
        self
    }

    pub fn interpreter<I: ResponseInterpreter + 'static>(mut self, interpreter: I) -> Self {
        self.interpreter = Arc::new(interpreter);
        self
    }

    pub fn predicate<P: BatchPredicate + 'static>(mut self, predicate: P) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn build(self) -> Result<BatchClient> {
        let transport: Arc<dyn Transport> = match (self.transport, self.http) {
            (Some(transport), _) => transport,
            (None, Some(http)) => Arc::new(HttpTransport::new(http)?),
            (None, None) => {
                return Err(Error::configuration_with_context(
                    "no transport configured",
                    ErrorContext::new()
                        .with_details("call .transport(..) or .http(HttpTransportConfig::new(..))")
                        .with_source("client_builder"),
                ))
            }
        };

        let stats = Arc::new(AtomicBatchStats::default());
        let dispatcher = Arc::new(Dispatcher::new(
            transport,
            self.interpreter,
            self.config.clone(),
            Arc::clone(&stats),
        ));
        let scheduler = WindowScheduler::new(&self.config, Arc::clone(&dispatcher));

        Ok(BatchClient {
            config: self.config,
            scheduler,
            dispatcher,
            predicate: self.predicate,
            stats,
        })
    }
}

impl Default for BatchClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
