//! # Wire Codec
//!
//! Pure conversion between N logical requests and one `multipart/mixed` body,
//! and between one multipart reply and N part responses. No state, no I/O;
//! every function here is safe to call from any thread.
//!
//! ## Request layout
//!
//! ```text
//! --<boundary>
//! Content-Type: application/http; msgtype=request
//! Content-ID: <b29c5de2-0db4-490b-b421-6a51b598bd22+0>
//!
//! GET /v1/items?page=2 HTTP/1.1
//! Host: api.example.com
//! Accept: application/json, text/plain, */*
//!
//! --<boundary>--
//! ```
//!
//! Parts are correlated with requests by position. The `Content-ID` is
//! carried for diagnostics and can optionally be checked with
//! [`validate_content_ids`].
//!
//! ## Example
//!
//! ```rust
//! use http_batch_rs::codec::{decode, encode, Boundary};
//! use http_batch_rs::types::{HttpResponse, LogicalRequest};
//!
//! let requests = vec![
//!     LogicalRequest::get("https://api.example.com/a").unwrap(),
//!     LogicalRequest::get("https://api.example.com/b").unwrap(),
//! ];
//! let boundary = Boundary::new("batch_fixture").unwrap();
//! let batch = encode(&requests, &boundary).unwrap();
//! assert_eq!(batch.part_count(), 2);
//!
//! let reply = HttpResponse::new(200)
//!     .with_header("Content-Type", "multipart/batch; boundary=resp")
//!     .with_body(
//!         "--resp\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 200 OK\r\n\r\n{}\r\n\
//!          --resp\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 404 Not Found\r\n\r\n\r\n\
//!          --resp--\r\n",
//!     );
//! let parts = decode(&reply, 2).unwrap();
//! assert_eq!(parts[1].response.status, 404);
//! ```

mod decode;
mod encode;

pub use decode::{
    boundary_from_content_type, decode, decode_parts, validate_content_ids, DecodedPart,
};
pub use encode::{encode, encode_batch, EncodedBatch};

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use uuid::Uuid;

use crate::{Error, ErrorContext, Result};

/// Stable prefix of every outgoing part's `Content-ID`.
pub const CONTENT_ID_PREFIX: &str = "b29c5de2-0db4-490b-b421-6a51b598bd22";
pub const CONTENT_TYPE_HTTP: &str = "application/http; msgtype=request";
pub const CONTENT_TYPE_MIXED: &str = "multipart/mixed";
pub const CONTENT_TYPE_BATCH: &str = "multipart/batch";
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";
pub const HTTP_VERSION_1_1: &str = "HTTP/1.1";
pub(crate) const CRLF: &str = "\r\n";

/// `)]}'` / `)]}"` guard, optionally followed by a comma, then a line break.
static XSSI_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\)\]\}['"],?\r?\n"#).expect("static XSSI regex"));

/// Remove an XSSI guard from the very start of `body`, if there is one.
pub fn strip_xssi_prefix(body: &str) -> &str {
    &body[xssi_prefix_len(body.as_bytes())..]
}

/// Length of the XSSI guard at the start of `body`, 0 when there is none.
pub(crate) fn xssi_prefix_len(body: &[u8]) -> usize {
    XSSI_PREFIX.find(body).map_or(0, |m| m.end())
}

/// Whether a content-type value announces a multipart batch payload.
pub fn is_batch_content_type(value: &str) -> bool {
    let media_type = value.split(';').next().unwrap_or_default().trim();
    media_type.eq_ignore_ascii_case(CONTENT_TYPE_MIXED)
        || media_type.eq_ignore_ascii_case(CONTENT_TYPE_BATCH)
}

/// Multipart boundary token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Use a fixed token; it must be 1-70 RFC 2046 boundary characters.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let valid_chars = token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c));
        if token.is_empty() || token.len() > 70 || !valid_chars || token.ends_with(' ') {
            return Err(Error::validation_with_context(
                format!("invalid multipart boundary '{}'", token),
                ErrorContext::new()
                    .with_field_path("boundary")
                    .with_details("expected 1-70 RFC 2046 bchars, not ending in a space")
                    .with_source("codec"),
            ));
        }
        Ok(Self(token))
    }

    /// Fresh per-batch token.
    pub fn generate() -> Self {
        Self(format!("batch_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `--<boundary>`
    pub fn delimiter(&self) -> String {
        format!("--{}", self.0)
    }

    /// `--<boundary>--`
    pub fn close_delimiter(&self) -> String {
        format!("--{}--", self.0)
    }

    /// True when no body contains the token.
    pub(crate) fn is_safe_for<'a, I>(&self, bodies: I) -> bool
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let needle = self.0.as_bytes();
        bodies
            .into_iter()
            .all(|b| !b.windows(needle.len()).any(|w| w == needle))
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
