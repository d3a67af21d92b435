use thiserror::Error;

/// Validation failures raised while parsing or canonicalizing
/// attacker-influenced request bytes.
///
/// Every variant is a deterministic function of the input; none is
/// retryable. The proxy maps each of them to an HTTP 400 whose reason
/// phrase is [`CanonError::reason`], and never forwards the offending
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonError {
    #[error("media type does not parse")]
    MalformedMediaType,
    #[error("unrecognized MIME type")]
    UnrecognizedMimeType,
    #[error("unrecognized MIME subtype")]
    UnrecognizedMimeSubtype,
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),
    #[error("continuation index too large")]
    ContinuationIndexTooLarge,
    #[error("repeated continuation index")]
    RepeatedContinuationIndex,
    #[error("missing continuation index")]
    MissingContinuationIndex,
    #[error("malformed header line")]
    MalformedHeaderLine,
    #[error("duplicate header '{0}'")]
    DuplicateHeader(String),
    #[error("missing CRLF after header")]
    MissingTerminatingCRLF,
    #[error("unrecognized content disposition")]
    UnrecognizedContentDisposition,
    #[error("bad multipart body prefix")]
    BadMultipartPrefix,
    #[error("multipart chunk is missing its delimiter CRLF")]
    MissingDelimiterCRLF,
    #[error("multipart chunk is missing Content-Disposition")]
    MissingContentDisposition,
    #[error("boundary embedded in subpart data")]
    EmbeddedBoundaryInSubpartData,
    #[error("multipart media type is missing its boundary parameter")]
    MissingBoundaryParameter,
    #[error("boundary contains non-ASCII bytes")]
    NonAsciiBoundary,
    #[error("header value contains non-ASCII bytes")]
    NonAsciiHeaderValue,
}

impl CanonError {
    /// Short reason phrase used in the HTTP 400 status line.
    pub fn reason(&self) -> &'static str {
        match self {
            CanonError::MalformedMediaType => "Malformed Media Type",
            CanonError::UnrecognizedMimeType => "Unrecognized MIME Type",
            CanonError::UnrecognizedMimeSubtype => "Unrecognized MIME Subtype",
            CanonError::DuplicateParameter(_) => "Duplicate Parameter",
            CanonError::ContinuationIndexTooLarge => "Continuation Index Too Large",
            CanonError::RepeatedContinuationIndex => "Repeated Continuation Index",
            CanonError::MissingContinuationIndex => "Missing Continuation Index",
            CanonError::MalformedHeaderLine => "Malformed Header Line",
            CanonError::DuplicateHeader(_) => "Duplicate Header",
            CanonError::MissingTerminatingCRLF => "Missing Terminating CRLF",
            CanonError::UnrecognizedContentDisposition => "Unrecognized Content Disposition",
            CanonError::BadMultipartPrefix => "Bad Multipart Prefix",
            CanonError::MissingDelimiterCRLF => "Missing Delimiter CRLF",
            CanonError::MissingContentDisposition => "Missing Content Disposition",
            CanonError::EmbeddedBoundaryInSubpartData => "Embedded Boundary In Subpart Data",
            CanonError::MissingBoundaryParameter => "Missing Boundary Parameter",
            CanonError::NonAsciiBoundary => "Non-ASCII Boundary",
            CanonError::NonAsciiHeaderValue => "Non-ASCII Header Value",
        }
    }
}
