//! Caller-level HTTP request.

use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use super::headers::Headers;
use crate::{Error, ErrorContext, Result};

pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Request body.
///
/// The variant is the body's "shape": it decides which content type is
/// inferred when the request does not carry one.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    /// Opaque bytes; no content type is inferred.
    Bytes(Bytes),
}

fn check_header(key: &str, value: &str) -> Result<()> {
    let invalid = |what: &str, details: String| {
        Error::validation_with_context(
            format!("invalid header {} for '{}'", what, key.escape_debug()),
            ErrorContext::new()
                .with_field_path(format!("request.headers.{}", key.escape_debug()))
                .with_details(details)
                .with_source("logical_request"),
        )
    };
    HeaderName::from_bytes(key.as_bytes()).map_err(|e| invalid("name", e.to_string()))?;
    HeaderValue::from_str(value).map_err(|e| invalid("value", e.to_string()))?;
    Ok(())
}

impl Body {
    pub fn inferred_content_type(&self) -> Option<&'static str> {
        match self {
            Body::Text(_) => Some(CONTENT_TYPE_TEXT),
            Body::Json(_) => Some(CONTENT_TYPE_JSON),
            Body::Form(_) => Some(CONTENT_TYPE_FORM),
            Body::Bytes(_) => None,
        }
    }

    /// Wire form of the body.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Body::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
            Body::Json(v) => Bytes::from(v.to_string()),
            Body::Form(pairs) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter())
                    .finish();
                Bytes::from(encoded)
            }
            Body::Bytes(b) => b.clone(),
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Body {
    fn from(v: serde_json::Value) -> Self {
        Body::Json(v)
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(b))
    }
}

/// One HTTP request as the caller sees it.
///
/// The target must be an absolute URL with a host; that is checked at
/// construction so encoding can never meet a request it cannot render.
#[derive(Debug, Clone)]
pub struct LogicalRequest {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Body>,
}

impl LogicalRequest {
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| {
            Error::validation_with_context(
                format!("invalid request URL '{}'", url),
                ErrorContext::new()
                    .with_field_path("request.url")
                    .with_details(e.to_string())
                    .with_source("logical_request"),
            )
        })?;
        Self::from_url(method, parsed)
    }

    pub fn from_url(method: Method, url: Url) -> Result<Self> {
        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::validation_with_context(
                format!("request URL '{}' has no host", url),
                ErrorContext::new()
                    .with_field_path("request.url")
                    .with_source("logical_request"),
            ));
        }
        Ok(Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    pub fn post(url: &str) -> Result<Self> {
        Self::new(Method::POST, url)
    }

    pub fn put(url: &str) -> Result<Self> {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: &str) -> Result<Self> {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: &str) -> Result<Self> {
        Self::new(Method::DELETE, url)
    }

    /// Add a header. Names and values must be valid HTTP header text, so
    /// nothing a caller passes can break the header block it is written into.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let (key, value) = (key.into(), value.into());
        check_header(&key, &value)?;
        self.headers.append(key, value);
        Ok(self)
    }

    pub fn with_headers(mut self, headers: &Headers) -> Result<Self> {
        for (key, values) in headers.iter() {
            for value in values {
                check_header(key, value)?;
            }
        }
        self.headers.extend_from(headers);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.with_body(Body::Json(value))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Explicit content type, if the caller set one.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }

    /// Content type derived from the body when none was set explicitly.
    pub fn inferred_content_type(&self) -> Option<&'static str> {
        if self.content_type().is_some() {
            return None;
        }
        self.body.as_ref().and_then(Body::inferred_content_type)
    }

    /// `host[:port]`, the port only when it differs from the scheme default.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    pub fn path_and_query(&self) -> String {
        let path = self.url.path();
        let mut out = String::with_capacity(path.len() + 1);
        if !path.starts_with('/') {
            out.push('/');
        }
        out.push_str(path);
        if let Some(query) = self.url.query() {
            out.push('?');
            out.push_str(query);
        }
        out
    }
}
