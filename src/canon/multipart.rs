//! RFC 2046 multipart/form-data body parsing and canonical reserialization.
//!
//! The parser works on the fully buffered body. Boundary occurrences are
//! located with `memchr::memmem`, so scanning stays linear even when the
//! boundary is attacker-shaped.

use memchr::memmem;

use crate::canon::disposition::{ContentDisposition, parse_multipart_content_disposition};
use crate::canon::error::CanonError;
use crate::canon::headers::parse_headers;
use crate::canon::media_type::{MediaType, parse_media_type};
use crate::mime::MimeRegistry;

/// One delimiter-separated chunk of a multipart body.
///
/// `data` must not contain `CRLF "--" boundary`; a subpart that did would
/// be ambiguous when reserialized, so construction fails instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSubpart {
    boundary: Vec<u8>,
    pub content_disposition: ContentDisposition,
    pub content_type: MediaType,
    data: Vec<u8>,
}

impl MultipartSubpart {
    pub fn new(
        boundary: Vec<u8>,
        content_disposition: ContentDisposition,
        content_type: MediaType,
        data: Vec<u8>,
    ) -> Result<Self, CanonError> {
        let mut delimiter = b"\r\n--".to_vec();
        delimiter.extend_from_slice(&boundary);
        if memmem::find(&data, &delimiter).is_some() {
            return Err(CanonError::EmbeddedBoundaryInSubpartData);
        }
        Ok(Self {
            boundary,
            content_disposition,
            content_type,
            data,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Canonical byte form of this subpart, headers in fixed order and
    /// casing regardless of how the original was written.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 64);
        out.extend_from_slice(b"--");
        out.extend_from_slice(&self.boundary);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(b"Content-Type: ");
        out.extend_from_slice(&self.content_type.serialize());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(b"Content-Disposition: ");
        out.extend_from_slice(&self.content_disposition.serialize());
        out.extend_from_slice(b"\r\n\r\n");
        out.extend_from_slice(&self.data);
        out
    }
}

/// RFC 5322 text: any byte except NUL, CR, LF, and anything past ASCII.
fn is_discard_text(byte: u8) -> bool {
    matches!(byte, 1..=9 | 11 | 12 | 14..=127)
}

/// Match the multipart body prefix: `[preamble CRLF] dash-boundary
/// transport-padding CRLF`, where the preamble is lines of `*text CRLF`.
/// Returns the number of bytes consumed.
///
/// Mirrors the greedy grammar: the longest run of preamble lines followed
/// by CRLF and the dash-boundary wins; failing every such split, the
/// dash-boundary must sit at offset zero.
fn parse_body_prefix(boundary: &[u8], data: &[u8]) -> Result<usize, CanonError> {
    // Line starts reachable through well-formed `*text CRLF` lines.
    let mut line_starts = vec![0];
    let mut pos = 0;
    loop {
        let text = data[pos..]
            .iter()
            .take_while(|byte| is_discard_text(**byte))
            .count();
        if !data[pos + text..].starts_with(b"\r\n") {
            break;
        }
        pos += text + 2;
        line_starts.push(pos);
    }

    for start in line_starts.into_iter().rev() {
        let Some(rest) = data[start..].strip_prefix(b"\r\n") else {
            continue;
        };
        if let Some(consumed) = match_dash_boundary_line(boundary, rest) {
            return Ok(start + 2 + consumed);
        }
    }
    match_dash_boundary_line(boundary, data).ok_or(CanonError::BadMultipartPrefix)
}

/// Match `dash-boundary transport-padding CRLF`, returning the consumed length.
fn match_dash_boundary_line(boundary: &[u8], data: &[u8]) -> Option<usize> {
    let rest = data.strip_prefix(b"--")?;
    let rest = rest.strip_prefix(boundary)?;
    let padding = rest
        .iter()
        .take_while(|byte| matches!(byte, b' ' | b'\t'))
        .count();
    if !rest[padding..].starts_with(b"\r\n") {
        return None;
    }
    Some(2 + boundary.len() + padding + 2)
}

/// Non-overlapping leftmost split on `needle`, like `bytes.split`.
fn split_on<'a>(data: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    for at in memmem::find_iter(data, needle) {
        parts.push(&data[start..at]);
        start = at + needle.len();
    }
    parts.push(&data[start..]);
    parts
}

/// Parse a multipart body into its ordered subparts.
pub fn parse_multipart_body(
    boundary: &[u8],
    data: &[u8],
    registry: &MimeRegistry,
) -> Result<Vec<MultipartSubpart>, CanonError> {
    let consumed = parse_body_prefix(boundary, data)?;
    let rest = &data[consumed..];

    let mut delimiter = b"\r\n--".to_vec();
    delimiter.extend_from_slice(boundary);

    let mut subparts = Vec::new();
    for (index, chunk) in split_on(rest, &delimiter).into_iter().enumerate() {
        // The first chunk's delimiter CRLF was eaten by the prefix match;
        // later chunks carry their own.
        let body = if index == 0 {
            chunk
        } else if chunk == b"--" {
            // Close-delimiter: stop, discarding any epilogue.
            break;
        } else {
            chunk
                .strip_prefix(b"\r\n")
                .ok_or(CanonError::MissingDelimiterCRLF)?
        };
        subparts.push(parse_subpart(boundary, body, registry)?);
    }
    Ok(subparts)
}

fn parse_subpart(
    boundary: &[u8],
    data: &[u8],
    registry: &MimeRegistry,
) -> Result<MultipartSubpart, CanonError> {
    let (headers, body) = parse_headers(data)?;

    let disposition_value = headers
        .get(&b"content-disposition"[..])
        .ok_or(CanonError::MissingContentDisposition)?;
    let content_disposition = parse_multipart_content_disposition(disposition_value)?;

    let content_type = match headers.get(&b"content-type"[..]) {
        Some(value) => parse_media_type(value, registry)?,
        None => MediaType::new(b"text".to_vec(), b"plain".to_vec(), Vec::new(), registry)?,
    };

    MultipartSubpart::new(
        boundary.to_vec(),
        content_disposition,
        content_type,
        body.to_vec(),
    )
}

/// Canonicalize a multipart body: parse, then emit every subpart in its
/// canonical serialization joined by CRLF, closed with
/// `CRLF "--" boundary "--"`. One deterministic byte sequence per parsed
/// structure, whatever the original quoting, padding, or preamble looked
/// like.
pub fn normalize_multipart_body(
    boundary: &[u8],
    data: &[u8],
    registry: &MimeRegistry,
) -> Result<Vec<u8>, CanonError> {
    let subparts = parse_multipart_body(boundary, data, registry)?;
    let mut out = Vec::with_capacity(data.len());
    for (index, subpart) in subparts.iter().enumerate() {
        if index > 0 {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(&subpart.serialize());
    }
    out.extend_from_slice(b"\r\n--");
    out.extend_from_slice(boundary);
    out.extend_from_slice(b"--");
    Ok(out)
}
