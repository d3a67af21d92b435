//! Byte-level matchers for the RFC 5234 / RFC 9110 constructs shared by the
//! media-type, disposition, and header parsers.
//!
//! Each matcher either fails or returns the exact consumed span together
//! with the rest of the input; nothing is trimmed beyond what the grammar
//! itself allows. Matching is case-sensitive; callers fold case where
//! RFC 9110/9112 mandates it. All scanning is a single forward pass, so
//! adversarial input cannot trigger super-linear work.

/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
pub fn is_tchar(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

/// VCHAR = %x21-7E
pub fn is_vchar(byte: u8) -> bool {
    matches!(byte, 0x21..=0x7e)
}

/// qdtext = HTAB / SP / %x21 / %x23-5B / %x5D-7E
///
/// obs-text is deliberately rejected; quoted strings stay ASCII.
pub fn is_qdtext(byte: u8) -> bool {
    matches!(byte, b'\t' | b' ' | 0x21 | 0x23..=0x5b | 0x5d..=0x7e)
}

/// field-vchar = VCHAR (obs-text deliberately rejected)
pub fn is_field_vchar(byte: u8) -> bool {
    is_vchar(byte)
}

/// OWS = *( SP / HTAB )
pub fn is_ows(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

/// Consume optional whitespace, returning the rest.
pub fn skip_ows(input: &[u8]) -> &[u8] {
    let end = input.iter().take_while(|byte| is_ows(**byte)).count();
    &input[end..]
}

/// token = 1*tchar
///
/// Returns the maximal token span and the rest, or `None` if the input
/// does not start with a tchar.
pub fn match_token(input: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = input.iter().take_while(|byte| is_tchar(**byte)).count();
    if end == 0 {
        return None;
    }
    Some(input.split_at(end))
}

/// quoted-string = DQUOTE *( qdtext / quoted-pair ) DQUOTE
/// quoted-pair   = "\" ( HTAB / SP / VCHAR )
///
/// The returned span includes the surrounding DQUOTEs; escape sequences
/// are matched but not decoded.
pub fn match_quoted_string(input: &[u8]) -> Option<(&[u8], &[u8])> {
    if input.first() != Some(&b'"') {
        return None;
    }
    let mut pos = 1;
    while pos < input.len() {
        match input[pos] {
            b'"' => return Some(input.split_at(pos + 1)),
            b'\\' => {
                let escaped = *input.get(pos + 1)?;
                if !(escaped == b'\t' || escaped == b' ' || is_vchar(escaped)) {
                    return None;
                }
                pos += 2;
            }
            byte if is_qdtext(byte) => pos += 1,
            _ => return None,
        }
    }
    None
}

/// parameter-value = token / quoted-string
pub fn match_parameter_value(input: &[u8]) -> Option<(&[u8], &[u8])> {
    if input.first() == Some(&b'"') {
        match_quoted_string(input)
    } else {
        match_token(input)
    }
}
