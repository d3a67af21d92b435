//! Fixture corpus: real multipart/form-data bodies collected from public
//! documentation and test suites, run through the normalization
//! orchestrator end to end.

use formguard::canon::{CanonError, normalize_request, parse_multipart_body};
use formguard::mime::MimeRegistry;

fn registry() -> MimeRegistry {
    MimeRegistry::builtin()
}

/// Normalize, then re-parse the canonical output and check it is a fixed
/// point: normalizing the canonical form must reproduce it byte for byte.
fn assert_canonical_stable(content_type: &[u8], body: &[u8], expected_parts: usize) -> Vec<u8> {
    let registry = registry();
    let normalized =
        normalize_request(&registry, content_type, Some(body)).expect("fixture normalizes");
    let canonical_body = normalized.body.expect("multipart body");

    // Canonical form is `multipart/form-data; boundary=<value>`.
    let boundary = {
        let at = normalized
            .content_type
            .windows(9)
            .position(|window| window == b"boundary=")
            .expect("boundary parameter retained")
            + 9;
        normalized.content_type[at..].to_vec()
    };

    let subparts =
        parse_multipart_body(&boundary, &canonical_body, &registry).expect("canonical form parses");
    assert_eq!(subparts.len(), expected_parts);

    let renormalized = normalize_request(&registry, &normalized.content_type, Some(&canonical_body))
        .expect("canonical form normalizes");
    assert_eq!(renormalized.content_type, normalized.content_type);
    assert_eq!(renormalized.body.expect("multipart body"), canonical_body);
    canonical_body
}

#[test]
fn w3_html4_example_round_trips() {
    let body = b"--AaB03x\r\n\
        Content-Disposition: form-data; name=\"submit-name\"\r\n\
        \r\n\
        Larry\r\n\
        --AaB03x\r\n\
        Content-Disposition: form-data; name=\"files\"; filename=\"file1.txt\"\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        ... contents of file1.txt ...\r\n\
        --AaB03x--";
    let canonical =
        assert_canonical_stable(b"multipart/form-data; boundary=AaB03x", body, 2);

    let registry = registry();
    let subparts = parse_multipart_body(b"AaB03x", &canonical, &registry).expect("parses");
    assert_eq!(subparts[0].content_disposition.name.as_deref(), Some(&b"submit-name"[..]));
    assert_eq!(subparts[0].data(), b"Larry");
    assert_eq!(subparts[1].content_disposition.filename.as_deref(), Some(&b"file1.txt"[..]));
    assert_eq!(subparts[1].data(), b"... contents of file1.txt ...");
}

#[test]
fn quoted_boundary_fixtures_round_trip() {
    // From Tornado's httputil tests; the boundary arrives quoted, once
    // with quoted disposition values and once without.
    let body = b"--1234\r\n\
        Content-Disposition: form-data; name=\"files\"; filename=\"ab.txt\"\r\n\
        \r\n\
        Foo\r\n\
        --1234--";
    assert_canonical_stable(b"multipart/form-data; boundary=\"1234\"", body, 1);

    let body = b"--1234\r\n\
        Content-Disposition: form-data; name=files; filename=ab.txt\r\n\
        \r\n\
        Foo\r\n\
        --1234--";
    let canonical = assert_canonical_stable(b"multipart/form-data; boundary=\"1234\"", body, 1);
    let registry = registry();
    let subparts = parse_multipart_body(b"1234", &canonical, &registry).expect("parses");
    assert_eq!(subparts[0].content_disposition.filename.as_deref(), Some(&b"ab.txt"[..]));
}

#[test]
fn mdn_example_without_space_before_boundary_parameter() {
    let body = b"--boundary\r\n\
        Content-Disposition: form-data; name=\"field1\"\r\n\
        \r\n\
        value1\r\n\
        --boundary\r\n\
        Content-Disposition: form-data; name=\"field2\"; filename=\"example.txt\"\r\n\
        \r\n\
        value2\r\n\
        --boundary--";
    assert_canonical_stable(b"multipart/form-data;boundary=\"boundary\"", body, 2);
}

#[test]
fn rstudio_fixture_with_explicit_subpart_content_types() {
    let body = b"--boundary\r\n\
        Content-Disposition: form-data; name=\"field1\"\r\n\
        \r\n\
        value1\r\n\
        --boundary\r\n\
        Content-Disposition: form-data; name=\"field2\"; filename=\"example.txt\"\r\n\
        Content-Type: application/octet-stream\r\n\
        \r\n\
        fileBytes\r\n\
        --boundary--";
    let canonical =
        assert_canonical_stable(b"multipart/form-data; boundary=boundary", body, 2);
    let registry = registry();
    let subparts = parse_multipart_body(b"boundary", &canonical, &registry).expect("parses");
    assert!(subparts[1].content_type.is(b"application", b"octet-stream"));
}

#[test]
fn crlf_terminated_file_parts_are_absorbed_into_the_preamble() {
    // Firefox-style boundary. A non-final part whose data ends with CRLF
    // leaves `CRLF CRLF dash-boundary` in the raw body, and the greedy
    // preamble match claims everything up to the last such spot. Only the
    // final part survives, and the result is still a stable fixed point.
    let boundary: &[u8] = b"---------------------------9051914041544843365972754266";
    let mut body = Vec::new();
    for (disposition, content_type, data) in [
        ("form-data; name=\"text\"", None, &b"text default"[..]),
        (
            "form-data; name=\"file1\"; filename=\"a.txt\"",
            Some("text/plain"),
            b"Content of a.txt.\r\n",
        ),
        (
            "form-data; name=\"file2\"; filename=\"a.html\"",
            Some("text/html"),
            b"<!DOCTYPE html><title>Content of a.html.</title>\r\n",
        ),
    ] {
        body.extend_from_slice(b"--");
        body.extend_from_slice(boundary);
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"--");
    body.extend_from_slice(boundary);
    body.extend_from_slice(b"--");

    let content_type =
        [b"multipart/form-data; boundary=".as_slice(), boundary].concat();
    let canonical = assert_canonical_stable(&content_type, &body, 1);
    let registry = registry();
    let subparts = parse_multipart_body(boundary, &canonical, &registry).expect("parses");
    assert_eq!(
        subparts[0].data(),
        b"<!DOCTYPE html><title>Content of a.html.</title>\r\n"
    );
    assert!(subparts[0].content_type.is(b"text", b"html"));
}

#[test]
fn trailing_crlf_after_close_delimiter_is_rejected() {
    // multiparty's fixtures end `--boundary--\r\n`; the close chunk is no
    // longer exactly `--`, and the strict parser refuses the ambiguity.
    let body = b"------WebKitFormBoundaryvfUZhxgsZDO7FXLF\r\n\
        Content-Disposition: form-data; name=\"title\"\r\n\
        \r\n\
        foofoo\r\n\
        ------WebKitFormBoundaryvfUZhxgsZDO7FXLF--\r\n";
    assert_eq!(
        normalize_request(
            &registry(),
            b"multipart/form-data; boundary=----WebKitFormBoundaryvfUZhxgsZDO7FXLF",
            Some(body),
        )
        .unwrap_err(),
        CanonError::MissingDelimiterCRLF
    );
}

#[test]
fn unterminated_body_with_reversed_mime_type_is_rejected() {
    // multiparty's "plain/text" fixture: the subpart media type fails
    // registry validation before the missing close-delimiter even matters.
    let body = b"----WebKitFormBoundaryvfUZhxgsZDO7FXLF\r\n\
        Content-Disposition: form-data; name=\"upload\"; filename=\"blah1.txt\"\r\n\
        Content-Type: plain/text\r\n\
        \r\n\
        hi1\r\n";
    assert_eq!(
        normalize_request(
            &registry(),
            b"multipart/form-data; boundary=--WebKitFormBoundaryvfUZhxgsZDO7FXLF",
            Some(body),
        )
        .unwrap_err(),
        CanonError::UnrecognizedMimeType
    );
}

#[test]
fn canonical_output_is_deterministic_across_formatting_variants() {
    // Same logical content, three different on-wire spellings; all three
    // canonicalize to identical bytes.
    let registry = registry();
    let variants: [(&[u8], &[u8]); 3] = [
        (
            b"multipart/form-data; boundary=AaB03x",
            b"--AaB03x\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--AaB03x--",
        ),
        (
            b"MULTIPART/FORM-DATA; boundary=\"AaB03x\"",
            b"--AaB03x \t\r\nContent-Disposition: form-data; name=a\r\n\r\n1\r\n--AaB03x--",
        ),
        (
            b"multipart/form-data;boundary=AaB03x; charset=utf-8",
            b"a preamble\r\n\r\n--AaB03x\r\ncontent-disposition: form-data; name=\"a\"\r\n\r\n1\r\n--AaB03x--",
        ),
    ];
    let outputs: Vec<_> = variants
        .iter()
        .map(|(content_type, body)| {
            normalize_request(&registry, content_type, Some(body)).expect("normalizes")
        })
        .collect();
    for output in &outputs[1..] {
        assert_eq!(output.content_type, outputs[0].content_type);
        assert_eq!(output.body, outputs[0].body);
    }
}
