//! Typed failures surfaced by [`HttpHelper`](crate::executor::HttpHelper) calls.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Every way a single call can fail.
///
/// The executor never swallows one of these: each failure path logs a single
/// diagnostic line and then returns the error to the caller.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{method} request without body or parameters")]
    MissingBody { method: String },

    #[error("content type {content_type} requires key/value parameters, not a raw body")]
    IncompatibleBody { content_type: String },

    #[error("failed to encode request body: {0}")]
    Encoding(String),

    #[error("transport failure: {0}")]
    Io(String),

    #[error("secure transport failure: {0}")]
    SecurityTransport(String),

    #[error("failed to build basic authentication: {0}")]
    AuthFormat(String),

    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Payload-free classification of an [`HttpError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    MissingBody,
    IncompatibleBody,
    Encoding,
    Io,
    SecurityTransport,
    AuthFormat,
    InvalidHeader,
    Timeout,
}

impl HttpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            HttpError::MissingBody { .. } => ErrorKind::MissingBody,
            HttpError::IncompatibleBody { .. } => ErrorKind::IncompatibleBody,
            HttpError::Encoding(_) => ErrorKind::Encoding,
            HttpError::Io(_) => ErrorKind::Io,
            HttpError::SecurityTransport(_) => ErrorKind::SecurityTransport,
            HttpError::AuthFormat(_) => ErrorKind::AuthFormat,
            HttpError::InvalidHeader { .. } => ErrorKind::InvalidHeader,
            HttpError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::MissingBody => "missing_body",
            ErrorKind::IncompatibleBody => "incompatible_body",
            ErrorKind::Encoding => "encoding",
            ErrorKind::Io => "io",
            ErrorKind::SecurityTransport => "security_transport",
            ErrorKind::AuthFormat => "auth_format",
            ErrorKind::InvalidHeader => "invalid_header",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}
