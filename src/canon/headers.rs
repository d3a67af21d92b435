//! RFC 9112 field-line parsing for multipart subpart header blocks.

use std::collections::HashMap;

use crate::canon::error::CanonError;
use crate::canon::grammar::{is_field_vchar, is_ows, match_token, skip_ows};

/// Match one field-line (`field-name ":" OWS field-value OWS`) at the start
/// of the buffer. Returns the raw (name, value) spans and the rest; fails
/// with `MalformedHeaderLine` if the buffer does not begin with one.
pub fn parse_header(input: &[u8]) -> Result<((&[u8], &[u8]), &[u8]), CanonError> {
    let (name, rest) = match_token(input).ok_or(CanonError::MalformedHeaderLine)?;
    let rest = rest
        .strip_prefix(b":")
        .ok_or(CanonError::MalformedHeaderLine)?;
    let rest = skip_ows(rest);

    // field-value = *field-content; the run may contain interior SP/HTAB,
    // but cannot start or end with one. Trailing whitespace belongs to the
    // field-line's closing OWS and is consumed without being captured.
    let run = rest
        .iter()
        .take_while(|byte| is_field_vchar(**byte) || is_ows(**byte))
        .count();
    let value_end = rest[..run]
        .iter()
        .rposition(|byte| is_field_vchar(*byte))
        .map_or(0, |at| at + 1);

    Ok(((name, &rest[..value_end]), &rest[run..]))
}

/// Parse a header block: field-lines, each terminated by CRLF, followed by
/// the empty line ending the block.
///
/// Names and values are lowercased; a repeated name is `DuplicateHeader`,
/// never a merge. Returns the mapping and the bytes after the blank line
/// (the body).
pub fn parse_headers(input: &[u8]) -> Result<(HashMap<Vec<u8>, Vec<u8>>, &[u8]), CanonError> {
    let mut headers = HashMap::new();
    let mut rest = input;
    loop {
        let Ok(((name, value), after)) = parse_header(rest) else {
            break;
        };
        let name = name.to_ascii_lowercase();
        let value = value.to_ascii_lowercase();
        if headers.contains_key(&name) {
            return Err(CanonError::DuplicateHeader(
                String::from_utf8_lossy(&name).into_owned(),
            ));
        }
        headers.insert(name, value);
        rest = after
            .strip_prefix(b"\r\n")
            .ok_or(CanonError::MissingTerminatingCRLF)?;
    }
    let rest = rest
        .strip_prefix(b"\r\n")
        .ok_or(CanonError::MissingTerminatingCRLF)?;
    Ok((headers, rest))
}
