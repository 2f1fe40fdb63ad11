//! Multipart response decoder.

use std::ops::Range;

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{is_batch_content_type, xssi_prefix_len, CONTENT_TYPE_MIXED};
use crate::types::{Headers, HttpResponse};
use crate::{Error, ErrorContext, Result};

static BOUNDARY_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i);\s*boundary\s*=\s*(?:"([^"]+)"|([^;\s"]+))"#).expect("static boundary regex")
});

/// One embedded reply recovered from a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPart {
    /// `Content-ID` announced by the part, angle brackets included.
    pub content_id: Option<String>,
    pub response: HttpResponse,
}

fn mismatch(message: impl Into<String>, field: impl Into<String>) -> Error {
    Error::protocol_with_context(
        message,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("codec_decode"),
    )
}

/// Boundary parameter of a batch content-type value, quotes stripped.
pub fn boundary_from_content_type(value: &str) -> Option<&str> {
    if !is_batch_content_type(value) {
        return None;
    }
    BOUNDARY_PARAM
        .captures(value)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str())
}

/// Decode a combined reply and check it holds exactly `expected_count` parts.
pub fn decode(response: &HttpResponse, expected_count: usize) -> Result<Vec<DecodedPart>> {
    let parts = decode_parts(response)?;
    if parts.len() != expected_count {
        return Err(Error::PartCountMismatch {
            expected: expected_count,
            actual: parts.len(),
        });
    }
    Ok(parts)
}

/// Decode every part of a combined reply, in order.
pub fn decode_parts(response: &HttpResponse) -> Result<Vec<DecodedPart>> {
    let content_type = response.content_type().ok_or_else(|| {
        mismatch(
            format!(
                "a batched response must carry a Content-Type: {}; boundary=... header",
                CONTENT_TYPE_MIXED
            ),
            "content-type",
        )
    })?;
    if !is_batch_content_type(content_type) {
        return Err(mismatch(
            format!("'{}' is not a multipart batch content type", content_type),
            "content-type",
        ));
    }
    let boundary = boundary_from_content_type(content_type).ok_or_else(|| {
        mismatch(
            format!("no boundary parameter in '{}'", content_type),
            "content-type",
        )
    })?;

    let body = response.body.clone().unwrap_or_default();
    split_fragments(&body, boundary.as_bytes())
        .into_iter()
        .enumerate()
        .map(|(index, fragment)| parse_fragment(&body, fragment, index))
        .collect()
}

/// Check each part's `Content-ID` (when present) names its own position.
pub fn validate_content_ids(parts: &[DecodedPart]) -> Result<()> {
    for (index, part) in parts.iter().enumerate() {
        let Some(id) = part.content_id.as_deref() else {
            continue;
        };
        let bare = id.trim_start_matches('<').trim_end_matches('>');
        let position = bare.rsplit_once('+').map(|(_, n)| n);
        if position != Some(index.to_string().as_str()) {
            return Err(mismatch(
                format!("part {} carries Content-ID '{}'", index, id),
                format!("part[{}].content-id", index),
            ));
        }
    }
    Ok(())
}

fn is_line_break(b: &u8) -> bool {
    *b == b'\r' || *b == b'\n'
}

fn trim_end_ascii(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., last] = line {
        if !last.is_ascii_whitespace() {
            break;
        }
        line = rest;
    }
    line
}

/// Byte ranges between delimiter lines, without preamble, epilogue or blank parts.
fn split_fragments(body: &[u8], boundary: &[u8]) -> Vec<Range<usize>> {
    let mut fragments = Vec::new();
    let mut current: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive(|b| *b == b'\n') {
        let line_start = offset;
        offset += line.len();

        // A delimiter only counts at the start of a line, so bodies that merely
        // mention the token are left alone.
        let Some(rest) = trim_end_ascii(line)
            .strip_prefix(b"--".as_slice())
            .and_then(|l| l.strip_prefix(boundary))
        else {
            continue;
        };
        let closing = rest == b"--";
        if !rest.is_empty() && !closing {
            continue;
        }
        if let Some(start) = current.take() {
            fragments.push(start..line_start);
        }
        if closing {
            break;
        }
        current = Some(offset);
    }
    if let Some(start) = current {
        fragments.push(start..body.len());
    }

    fragments.retain(|f| !body[f.clone()].iter().all(u8::is_ascii_whitespace));
    fragments
}

/// Split `range` at its first empty line: (before, after).
fn split_at_blank_line(body: &[u8], range: Range<usize>) -> (Range<usize>, Option<Range<usize>>) {
    let mut offset = range.start;
    for line in body[range.clone()].split_inclusive(|b| *b == b'\n') {
        let end = offset + line.len();
        if line.iter().all(is_line_break) {
            return (range.start..offset, Some(end..range.end));
        }
        offset = end;
    }
    (range, None)
}

fn parse_fragment(body: &Bytes, fragment: Range<usize>, index: usize) -> Result<DecodedPart> {
    let (part_head, message) = split_at_blank_line(body, fragment);
    let message = message.ok_or_else(|| {
        mismatch(
            format!("part {} has no embedded HTTP message", index),
            format!("part[{}]", index),
        )
    })?;

    let mut content_id = None;
    for line in String::from_utf8_lossy(&body[part_head]).lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.eq_ignore_ascii_case("content-type") {
            let media_type = value.split(';').next().unwrap_or_default().trim();
            if !media_type.eq_ignore_ascii_case("application/http") {
                return Err(mismatch(
                    format!("part {} has content type '{}'", index, value),
                    format!("part[{}].content-type", index),
                ));
            }
        } else if key.eq_ignore_ascii_case("content-id") {
            content_id = Some(value.to_string());
        }
    }

    let leading = body[message.clone()]
        .iter()
        .take_while(|b| is_line_break(b))
        .count();
    let (message_head, message_body) = split_at_blank_line(body, message.start + leading..message.end);
    let message_head = String::from_utf8_lossy(&body[message_head]);
    let mut lines = message_head.lines();
    let status_line = lines.next().unwrap_or_default();
    let mut tokens = status_line.split_whitespace();
    let _version = tokens.next();
    let status = tokens
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            mismatch(
                format!("part {} has malformed status line '{}'", index, status_line),
                format!("part[{}].status_line", index),
            )
        })?;
    let status_text = tokens.collect::<Vec<_>>().join(" ");

    let mut headers = Headers::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) => headers.append(key.trim(), value.trim()),
            None => debug!(part = index, line, "skipping header line without a colon"),
        }
    }

    let payload = message_body
        .map(|mut range| {
            range.start += xssi_prefix_len(&body[range.clone()]);
            let trailing = body[range.clone()]
                .iter()
                .rev()
                .take_while(|b| is_line_break(b))
                .count();
            range.end -= trailing;
            range
        })
        .filter(|range| !range.is_empty())
        .map(|range| body.slice(range));

    Ok(DecodedPart {
        content_id,
        response: HttpResponse {
            status,
            status_text,
            headers,
            body: payload,
        },
    })
}
