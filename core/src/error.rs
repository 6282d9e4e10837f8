//! Error types for the request/response contract.
//!
//! # Design
//! `NotFound` keeps its own variant because callers routinely tell "the
//! resource does not exist" apart from other unexpected statuses. Range and
//! parse failures are reported at build or parse time; the contract never
//! performs I/O, so there is no transport variant.

/// Errors returned by `WebClient`, `HttpRequest` and `HttpResponse`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    /// The server returned a status the caller did not accept.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A `Range` header can only carry one unit.
    #[error("range unit {requested:?} does not match existing unit {existing:?}")]
    RangeUnitMismatch { existing: String, requested: String },

    /// A header name or value would break the request framing.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The bytes end before the response head or declared body does.
    #[error("response incomplete")]
    Incomplete,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response body is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
