//! The value a successful call hands back.

use bytes::Bytes;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::TextEncoding;
use crate::error::HttpError;

/// Terminal result of one call.
pub type CallOutcome = Result<Response, HttpError>;

/// Bytes returned by the server, owned by the call that produced them.
///
/// Any status code counts as a response; interpreting 4xx/5xx bodies is left
/// to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    bytes: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, bytes: Bytes) -> Self {
        Self { status, bytes }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Best-effort UTF-8 text; empty when the body is not valid UTF-8.
    pub fn text(&self) -> String {
        self.decode_text(TextEncoding::Utf8)
    }

    /// Text in `encoding`; empty when the body cannot be decoded.
    pub fn decode_text(&self, encoding: TextEncoding) -> String {
        encoding.decode(&self.bytes).unwrap_or_default()
    }

    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.bytes)
    }

    /// The body re-rendered as indented JSON.
    pub fn json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.json()?)
    }
}
