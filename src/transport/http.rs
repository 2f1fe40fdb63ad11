use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Proxy};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{Transport, TransportError};
use crate::codec::EncodedBatch;
use crate::types::{Headers, HttpResponse, LogicalRequest};
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_BATCH_PATH: &str = "/api/$batch";

/// Verb used for the combined request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchMethod {
    #[default]
    Post,
    Put,
    Patch,
}

impl BatchMethod {
    pub fn as_method(&self) -> Method {
        match self {
            BatchMethod::Post => Method::POST,
            BatchMethod::Put => Method::PUT,
            BatchMethod::Patch => Method::PATCH,
        }
    }
}

/// Where and how combined requests are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    pub batch_url: String,
    #[serde(default)]
    pub batch_method: BatchMethod,
    /// Added to every combined request.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Query parameters added to every combined request.
    #[serde(default)]
    pub default_query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl HttpTransportConfig {
    pub fn new(batch_url: impl Into<String>) -> Self {
        Self {
            batch_url: batch_url.into(),
            batch_method: BatchMethod::default(),
            default_headers: BTreeMap::new(),
            default_query: BTreeMap::new(),
            bearer_token: None,
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Batch endpoint at [`DEFAULT_BATCH_PATH`] under `origin`.
    pub fn for_origin(origin: &str) -> Self {
        Self::new(format!("{}{}", origin.trim_end_matches('/'), DEFAULT_BATCH_PATH))
    }

    pub fn with_method(mut self, method: BatchMethod) -> Self {
        self.batch_method = method;
        self
    }

    pub fn with_default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_default_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_query.insert(key.into(), value.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Kept at millisecond precision; anything shorter than 1 ms becomes 1 ms.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn batch_url(&self) -> Result<Url> {
        Url::parse(&self.batch_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid batch URL '{}'", self.batch_url),
                ErrorContext::new()
                    .with_field_path("transport.batch_url")
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    batch_url: Url,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let batch_url = config.batch_url()?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(
                env::var("HTTP_BATCH_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("HTTP_BATCH_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )));

        if let Ok(proxy_url) = env::var("HTTP_BATCH_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(TransportError::Http)?;

        Ok(Self {
            client,
            batch_url,
            config,
        })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    async fn into_response(resp: reqwest::Response) -> Result<HttpResponse> {
        let status = resp.status();
        let headers = Headers::from(resp.headers());
        let body = resp.bytes().await.map_err(TransportError::Http)?;
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: if body.is_empty() { None } else { Some(body) },
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute_single(&self, request: &LogicalRequest) -> Result<HttpResponse> {
        let mut req = self
            .client
            .request(request.method().clone(), request.url().clone());
        for (key, values) in request.headers().iter() {
            for value in values {
                req = req.header(key, value.as_str());
            }
        }
        if let Some(content_type) = request.inferred_content_type() {
            req = req.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body() {
            req = req.body(body.to_bytes());
        }

        let resp = req.send().await.map_err(TransportError::Http)?;
        Self::into_response(resp).await
    }

    async fn execute_combined(&self, batch: &EncodedBatch) -> Result<HttpResponse> {
        let mut req = self
            .client
            .request(self.config.batch_method.as_method(), self.batch_url.clone())
            .header(CONTENT_TYPE, batch.content_type());
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !self.config.default_query.is_empty() {
            req = req.query(&self.config.default_query);
        }
        if let Some(token) = &self.config.bearer_token {
            req = req.bearer_auth(token);
        }

        debug!(
            url = %self.batch_url,
            parts = batch.part_count(),
            bytes = batch.body().len(),
            "sending combined request"
        );
        let resp = req
            .body(batch.body().clone())
            .send()
            .await
            .map_err(TransportError::Http)?;
        Self::into_response(resp).await
    }
}
