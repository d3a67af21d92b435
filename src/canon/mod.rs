//! Canonicalization core: strict RFC-grammar parsers for media types,
//! header blocks, and multipart/form-data bodies, plus the orchestrator
//! that rewrites a request into one unambiguous byte form.
//!
//! Everything here is a pure, synchronous transformation over fully
//! buffered byte slices. Ambiguous or malformed input is rejected, never
//! repaired; accepting an ambiguous form would reopen the
//! parser-differential attacks this proxy exists to close.

pub mod disposition;
pub mod error;
pub mod grammar;
pub mod headers;
pub mod media_type;
pub mod multipart;

pub use disposition::{ContentDisposition, parse_multipart_content_disposition};
pub use error::CanonError;
pub use headers::{parse_header, parse_headers};
pub use media_type::{MediaType, parse_media_type};
pub use multipart::{MultipartSubpart, normalize_multipart_body, parse_multipart_body};

use crate::mime::MimeRegistry;

/// Canonical rewrite of one request's content metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    /// Canonical `Content-Type` value.
    pub content_type: Vec<u8>,
    /// Canonical body for multipart requests; `None` means the original
    /// body is forwarded unchanged.
    pub body: Option<Vec<u8>>,
}

/// Normalize a request's `Content-Type` value and, for
/// `multipart/form-data`, its body.
///
/// The rebuilt `Content-Type` keeps only the `boundary` parameter; every
/// other parameter is dropped from the forwarded form. Any parse failure
/// rejects the whole request.
pub fn normalize_request(
    registry: &MimeRegistry,
    content_type: &[u8],
    body: Option<&[u8]>,
) -> Result<NormalizedRequest, CanonError> {
    if !content_type.is_ascii() {
        return Err(CanonError::NonAsciiHeaderValue);
    }
    let media_type = parse_media_type(content_type, registry)?;
    let canonical_type = media_type.retaining(&[b"boundary"]);

    if !media_type.is(b"multipart", b"form-data") {
        return Ok(NormalizedRequest {
            content_type: canonical_type.serialize(),
            body: None,
        });
    }

    let boundary = media_type
        .parameter(b"boundary")
        .ok_or(CanonError::MissingBoundaryParameter)?;
    if !boundary.is_ascii() {
        return Err(CanonError::NonAsciiBoundary);
    }
    let canonical_body = normalize_multipart_body(boundary, body.unwrap_or_default(), registry)?;
    Ok(NormalizedRequest {
        content_type: canonical_type.serialize(),
        body: Some(canonical_body),
    })
}
