//! Media-type parsing and canonical serialization (RFC 9110 §8.3.1) with
//! RFC 2231 parameter continuations.

use crate::canon::error::CanonError;
use crate::canon::grammar::{match_parameter_value, match_token, skip_ows};
use crate::mime::MimeRegistry;

/// Largest continuation index accepted for `name*index` parameters.
/// Picked arbitrarily; increase if a legitimate client ever needs more.
const MAX_CONTINUATION_INDEX: u32 = 100;

/// Structured form of a `Content-Type` value.
///
/// `type_` and `subtype` are lowercase and validated against the injected
/// [`MimeRegistry`]; parameters keep their first-occurrence order and raw
/// case. Immutable after construction except for [`MediaType::retaining`],
/// which rebuilds a pruned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    type_: Vec<u8>,
    subtype: Vec<u8>,
    parameters: Vec<(Vec<u8>, Vec<u8>)>,
}

impl MediaType {
    pub fn new(
        type_: Vec<u8>,
        subtype: Vec<u8>,
        parameters: Vec<(Vec<u8>, Vec<u8>)>,
        registry: &MimeRegistry,
    ) -> Result<Self, CanonError> {
        if !registry.contains_type(&type_) {
            return Err(CanonError::UnrecognizedMimeType);
        }
        if !registry.contains_subtype(&type_, &subtype) {
            return Err(CanonError::UnrecognizedMimeSubtype);
        }
        Ok(Self {
            type_,
            subtype,
            parameters,
        })
    }

    pub fn type_(&self) -> &[u8] {
        &self.type_
    }

    pub fn subtype(&self) -> &[u8] {
        &self.subtype
    }

    pub fn parameters(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.parameters
    }

    pub fn parameter(&self, key: &[u8]) -> Option<&[u8]> {
        self.parameters
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_slice())
    }

    pub fn is(&self, type_: &[u8], subtype: &[u8]) -> bool {
        self.type_ == type_ && self.subtype == subtype
    }

    /// Copy of this media type keeping only the parameters named in `keys`,
    /// in their original order.
    pub fn retaining(&self, keys: &[&[u8]]) -> Self {
        let parameters = self
            .parameters
            .iter()
            .filter(|(name, _)| keys.contains(&name.as_slice()))
            .cloned()
            .collect();
        Self {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            parameters,
        }
    }

    /// Canonical byte form: `type "/" subtype *( "; " key "=" value )`,
    /// values written unquoted and unescaped.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.type_.len() + 1 + self.subtype.len());
        out.extend_from_slice(&self.type_);
        out.push(b'/');
        out.extend_from_slice(&self.subtype);
        for (key, value) in &self.parameters {
            out.extend_from_slice(b"; ");
            out.extend_from_slice(key);
            out.push(b'=');
            out.extend_from_slice(value);
        }
        out
    }
}

/// Parse the value of a `Content-Type` header.
///
/// The entire input must match `type "/" subtype *( OWS ";" OWS [param] )`;
/// trailing bytes are a parse failure, not a soft stop.
pub fn parse_media_type(input: &[u8], registry: &MimeRegistry) -> Result<MediaType, CanonError> {
    let (type_, rest) = match_token(input).ok_or(CanonError::MalformedMediaType)?;
    let rest = rest
        .strip_prefix(b"/")
        .ok_or(CanonError::MalformedMediaType)?;
    let (subtype, rest) = match_token(rest).ok_or(CanonError::MalformedMediaType)?;

    // Case-insensitivity per RFC 9110 §8.3.1; parameters keep raw case.
    MediaType::new(
        type_.to_ascii_lowercase(),
        subtype.to_ascii_lowercase(),
        parse_parameters(rest)?,
        registry,
    )
}

/// Parse a raw parameter list (`*( OWS ";" OWS [ name "=" value ] )`) and
/// fold RFC 2231 continuations into final values. Shared with the
/// Content-Disposition parser.
pub(crate) fn parse_parameters(input: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CanonError> {
    fold_continuations(parse_raw_parameters(input)?)
}

/// Extract raw (key, value) pairs left to right; values may still carry
/// their surrounding quotes. The whole input must be consumed.
fn parse_raw_parameters(mut input: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CanonError> {
    let mut raw = Vec::new();
    loop {
        if input.is_empty() {
            return Ok(raw);
        }
        // OWS is only valid as part of a `OWS ";" OWS` parameter prefix;
        // trailing whitespace with no `;` after it fails the parse.
        input = skip_ows(input);
        input = input
            .strip_prefix(b";")
            .ok_or(CanonError::MalformedMediaType)?;
        input = skip_ows(input);
        // The name "=" value pair is optional: `;` alone is valid.
        if matches!(input.first(), None | Some(b';')) {
            continue;
        }
        let (name, rest) = match_token(input).ok_or(CanonError::MalformedMediaType)?;
        let rest = rest
            .strip_prefix(b"=")
            .ok_or(CanonError::MalformedMediaType)?;
        let (value, rest) = match_parameter_value(rest).ok_or(CanonError::MalformedMediaType)?;
        raw.push((name.to_vec(), value.to_vec()));
        input = rest;
    }
}

/// Per-key accumulator while folding continuations: either one final value
/// or indexed fragments, each slot filled at most once.
enum ParamSlot {
    Single(Vec<u8>),
    Fragments(Vec<Option<Vec<u8>>>),
}

fn fold_continuations(
    raw: Vec<(Vec<u8>, Vec<u8>)>,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CanonError> {
    let mut slots: Vec<(Vec<u8>, ParamSlot)> = Vec::new();

    for (raw_key, mut raw_value) in raw {
        if raw_value.first() == Some(&b'"') {
            // Strip exactly the surrounding quotes; embedded quoted-pair
            // escapes stay as-is.
            raw_value.remove(0);
            raw_value.pop();
        }

        match split_continuation_key(&raw_key) {
            Some((base, index)) => {
                let position = slots.iter().position(|(key, _)| key == base);
                let fragments = match position {
                    Some(at) => match &mut slots[at].1 {
                        // A plain occurrence of the base key beats the
                        // index-size check.
                        ParamSlot::Single(_) => {
                            return Err(CanonError::DuplicateParameter(lossy(base)));
                        }
                        ParamSlot::Fragments(fragments) => fragments,
                    },
                    None => {
                        slots.push((base.to_vec(), ParamSlot::Fragments(Vec::new())));
                        match &mut slots.last_mut().expect("just pushed").1 {
                            ParamSlot::Fragments(fragments) => fragments,
                            ParamSlot::Single(_) => unreachable!(),
                        }
                    }
                };
                let index = index.ok_or(CanonError::ContinuationIndexTooLarge)? as usize;
                if fragments.len() <= index {
                    fragments.resize(index + 1, None);
                }
                if fragments[index].is_some() {
                    return Err(CanonError::RepeatedContinuationIndex);
                }
                fragments[index] = Some(raw_value);
            }
            None => {
                if slots.iter().any(|(key, _)| *key == raw_key) {
                    return Err(CanonError::DuplicateParameter(lossy(&raw_key)));
                }
                slots.push((raw_key, ParamSlot::Single(raw_value)));
            }
        }
    }

    let mut parameters = Vec::with_capacity(slots.len());
    for (key, slot) in slots {
        let value = match slot {
            ParamSlot::Single(value) => value,
            ParamSlot::Fragments(fragments) => {
                let mut joined = Vec::new();
                for fragment in fragments {
                    let Some(fragment) = fragment else {
                        return Err(CanonError::MissingContinuationIndex);
                    };
                    joined.extend_from_slice(&fragment);
                }
                joined
            }
        };
        parameters.push((key, value));
    }
    Ok(parameters)
}

/// Test a raw key for an RFC 2231 continuation suffix `*<digits>`.
///
/// Unlike strict RFC 2231 a leading zero digit is accepted on input (but
/// never emitted; canonical output joins the fragments). Returns the base
/// key plus the index, `Some((base, None))` when the index exceeds the
/// cap, or `None` for a plain key.
fn split_continuation_key(raw_key: &[u8]) -> Option<(&[u8], Option<u32>)> {
    let star = raw_key.iter().rposition(|byte| *byte == b'*')?;
    let (base, suffix) = (&raw_key[..star], &raw_key[star + 1..]);
    if suffix.is_empty() || !suffix.iter().all(u8::is_ascii_digit) {
        return None;
    }
    // Digit runs that overflow u32 are far beyond the cap anyway.
    let index = std::str::from_utf8(suffix)
        .ok()
        .and_then(|digits| digits.parse::<u32>().ok())
        .filter(|index| *index <= MAX_CONTINUATION_INDEX);
    Some((base, index))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
