//! Single HTTP reply.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::headers::Headers;
use crate::codec::strip_xssi_prefix;
use crate::{Error, ErrorContext, Result};

/// Status line, headers and body of one HTTP reply.
///
/// Produced by the transport for single calls and for the combined outer
/// call, and reconstructed per part by the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl HttpResponse {
    /// Response with the canonical reason phrase for `status`.
    pub fn new(status: u16) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }

    /// Body as UTF-8 text (lossy); empty when there is no body.
    pub fn text(&self) -> String {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Parse the body as JSON, tolerating an XSSI guard prefix.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.as_ref().ok_or_else(|| {
            Error::validation_with_context(
                "response has no body to parse",
                ErrorContext::new()
                    .with_details(format!("HTTP {}", self.status))
                    .with_source("http_response"),
            )
        })?;
        let text = String::from_utf8_lossy(body);
        Ok(serde_json::from_str(strip_xssi_prefix(&text))?)
    }
}
