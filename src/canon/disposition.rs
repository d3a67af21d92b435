//! `Content-Disposition` handling for multipart subparts.

use crate::canon::error::CanonError;
use crate::canon::media_type::parse_parameters;

/// The `name` / `filename` of one multipart subpart. Every other parameter
/// on the header is parsed (so its syntax is still enforced) and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDisposition {
    pub name: Option<Vec<u8>>,
    pub filename: Option<Vec<u8>>,
}

impl ContentDisposition {
    /// Canonical byte form: `form-data` with `name` / `filename` wrapped in
    /// literal quotes. Values are emitted without escaping; the accepted
    /// parameter-value grammar keeps bare quote bytes out of them.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = b"form-data".to_vec();
        if let Some(name) = &self.name {
            out.extend_from_slice(b"; name=\"");
            out.extend_from_slice(name);
            out.push(b'"');
        }
        if let Some(filename) = &self.filename {
            out.extend_from_slice(b"; filename=\"");
            out.extend_from_slice(filename);
            out.push(b'"');
        }
        out
    }
}

/// Parse a multipart subpart's `Content-Disposition` value. Only the
/// `form-data` disposition is recognized; its parameters use the same
/// grammar (continuations included) as media-type parameters.
pub fn parse_multipart_content_disposition(
    input: &[u8],
) -> Result<ContentDisposition, CanonError> {
    let rest = input
        .strip_prefix(b"form-data")
        .ok_or(CanonError::UnrecognizedContentDisposition)?;
    let mut parameters = parse_parameters(rest)?;

    let mut disposition = ContentDisposition::default();
    for (key, value) in parameters.drain(..) {
        match key.as_slice() {
            b"name" => disposition.name = Some(value),
            b"filename" => disposition.filename = Some(value),
            _ => {}
        }
    }
    Ok(disposition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_filename_are_extracted() {
        let disposition =
            parse_multipart_content_disposition(b"form-data; name=\"files\"; filename=\"a.txt\"")
                .expect("parses");
        assert_eq!(disposition.name.as_deref(), Some(&b"files"[..]));
        assert_eq!(disposition.filename.as_deref(), Some(&b"a.txt"[..]));
    }

    #[test]
    fn unquoted_values_are_accepted() {
        let disposition =
            parse_multipart_content_disposition(b"form-data; name=files; filename=ab.txt")
                .expect("parses");
        assert_eq!(disposition.name.as_deref(), Some(&b"files"[..]));
        assert_eq!(disposition.filename.as_deref(), Some(&b"ab.txt"[..]));
    }

    #[test]
    fn other_dispositions_are_rejected() {
        assert_eq!(
            parse_multipart_content_disposition(b"attachment; filename=a.txt").unwrap_err(),
            CanonError::UnrecognizedContentDisposition
        );
    }

    #[test]
    fn unknown_parameters_are_ignored_but_still_validated() {
        let disposition =
            parse_multipart_content_disposition(b"form-data; name=a; creation-date=today")
                .expect("parses");
        assert_eq!(disposition.name.as_deref(), Some(&b"a"[..]));
        assert_eq!(disposition.filename, None);

        assert_eq!(
            parse_multipart_content_disposition(b"form-data; name=a; name=b").unwrap_err(),
            CanonError::DuplicateParameter("name".into())
        );
        assert_eq!(
            parse_multipart_content_disposition(b"form-data junk").unwrap_err(),
            CanonError::MalformedMediaType
        );
        assert_eq!(
            parse_multipart_content_disposition(b"form-data ").unwrap_err(),
            CanonError::MalformedMediaType
        );
    }

    #[test]
    fn continuation_parameters_are_joined() {
        let disposition =
            parse_multipart_content_disposition(b"form-data; name*0=fi; name*1=le").expect("parses");
        assert_eq!(disposition.name.as_deref(), Some(&b"file"[..]));
    }

    #[test]
    fn serialize_emits_canonical_quoting() {
        let disposition = ContentDisposition {
            name: Some(b"files".to_vec()),
            filename: Some(b"file1.txt".to_vec()),
        };
        assert_eq!(
            disposition.serialize(),
            b"form-data; name=\"files\"; filename=\"file1.txt\""
        );

        let bare = ContentDisposition::default();
        assert_eq!(bare.serialize(), b"form-data");
    }
}
