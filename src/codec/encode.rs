//! Multipart request encoder.

use std::fmt::Write as _;

use bytes::{Bytes, BytesMut};

use super::{Boundary, CONTENT_ID_PREFIX, CONTENT_TYPE_HTTP, CONTENT_TYPE_MIXED, CRLF, DEFAULT_ACCEPT, HTTP_VERSION_1_1};
use crate::types::LogicalRequest;
use crate::{Error, ErrorContext, Result};

/// One combined request body plus what is needed to send and decode it.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    boundary: Boundary,
    body: Bytes,
    part_count: usize,
}

impl EncodedBatch {
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn part_count(&self) -> usize {
        self.part_count
    }

    /// Value for the outer request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", CONTENT_TYPE_MIXED, self.boundary)
    }
}

struct PreparedPart {
    head: String,
    body: Option<Bytes>,
}

fn prepare(request: &LogicalRequest) -> PreparedPart {
    let mut head = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        head,
        "{} {} {}{CRLF}",
        request.method().as_str(),
        request.path_and_query(),
        HTTP_VERSION_1_1
    );
    let _ = write!(head, "Host: {}{CRLF}", request.authority());
    let accept = request
        .headers()
        .joined("Accept")
        .unwrap_or_else(|| DEFAULT_ACCEPT.to_string());
    let _ = write!(head, "Accept: {}{CRLF}", accept);

    for (key, values) in request.headers().iter() {
        if key.eq_ignore_ascii_case("host") || key.eq_ignore_ascii_case("accept") {
            continue;
        }
        let _ = write!(head, "{}: {}{CRLF}", key, values.join(","));
    }
    // Inferred on the rendered copy only; the caller's request is untouched.
    if let Some(content_type) = request.inferred_content_type() {
        let _ = write!(head, "Content-Type: {}{CRLF}", content_type);
    }

    PreparedPart {
        head,
        body: request.body().map(|b| b.to_bytes()),
    }
}

fn render(parts: &[PreparedPart], boundary: &Boundary) -> Bytes {
    let delimiter = boundary.delimiter();
    let mut out = BytesMut::new();
    for (index, part) in parts.iter().enumerate() {
        let part_header = format!(
            "{delimiter}{CRLF}Content-Type: {CONTENT_TYPE_HTTP}{CRLF}Content-ID: <{CONTENT_ID_PREFIX}+{index}>{CRLF}{CRLF}"
        );
        out.extend_from_slice(part_header.as_bytes());
        out.extend_from_slice(part.head.as_bytes());
        out.extend_from_slice(CRLF.as_bytes());
        if let Some(body) = &part.body {
            out.extend_from_slice(body);
            out.extend_from_slice(CRLF.as_bytes());
        }
        out.extend_from_slice(CRLF.as_bytes());
    }
    out.extend_from_slice(boundary.close_delimiter().as_bytes());
    out.extend_from_slice(CRLF.as_bytes());
    out.freeze()
}

/// Encode `requests` in order with a caller-chosen boundary.
///
/// Fails when a body contains the boundary token.
pub fn encode<'a, I>(requests: I, boundary: &Boundary) -> Result<EncodedBatch>
where
    I: IntoIterator<Item = &'a LogicalRequest>,
{
    let parts: Vec<PreparedPart> = requests.into_iter().map(prepare).collect();
    let bodies = parts.iter().filter_map(|p| p.body.as_deref());
    if !boundary.is_safe_for(bodies) {
        let index = parts
            .iter()
            .position(|p| p.body.as_deref().is_some_and(|b| !boundary.is_safe_for([b])))
            .unwrap_or_default();
        return Err(Error::validation_with_context(
            format!("boundary '{}' occurs in a request body", boundary),
            ErrorContext::new()
                .with_field_path(format!("requests[{}].body", index))
                .with_details("choose another boundary or use encode_batch")
                .with_source("codec_encode"),
        ));
    }
    Ok(EncodedBatch {
        body: render(&parts, boundary),
        boundary: boundary.clone(),
        part_count: parts.len(),
    })
}

/// Encode `requests` in order with a generated boundary that no body contains.
pub fn encode_batch<'a, I>(requests: I) -> EncodedBatch
where
    I: IntoIterator<Item = &'a LogicalRequest>,
{
    let parts: Vec<PreparedPart> = requests.into_iter().map(prepare).collect();
    let boundary = loop {
        let candidate = Boundary::generate();
        let bodies = parts.iter().filter_map(|p| p.body.as_deref());
        if candidate.is_safe_for(bodies) {
            break candidate;
        }
    };
    EncodedBatch {
        body: render(&parts, &boundary),
        boundary,
        part_count: parts.len(),
    }
}
