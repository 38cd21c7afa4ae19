//! Request body encoding for POST and PUT calls.

use bytes::Bytes;
use reqwest::Method;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::FORM_URLENCODED;
use crate::error::HttpError;

/// What a write call sends: a pre-serialized body or key/value parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Raw(String),
    Params(Map<String, Value>),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Raw(body) => body.is_empty(),
            Payload::Params(params) => params.is_empty(),
        }
    }
}

impl From<&str> for Payload {
    fn from(body: &str) -> Self {
        Payload::Raw(body.to_string())
    }
}

impl From<String> for Payload {
    fn from(body: String) -> Self {
        Payload::Raw(body)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(params: Map<String, Value>) -> Self {
        Payload::Params(params)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    /// Set explicitly for form bodies only.
    pub content_length: Option<usize>,
}

/// Whether `content_type` names the URL-encoded form type, ignoring parameters.
pub fn is_form_urlencoded(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_URLENCODED))
}

/// Encodes `payload` for a write call under `content_type`.
///
/// # Errors
///
/// - [`HttpError::MissingBody`] when the payload is empty.
/// - [`HttpError::IncompatibleBody`] when a raw body is sent as a form.
/// - [`HttpError::Encoding`] when parameters cannot be serialized as JSON.
pub fn encode_body(
    method: &Method,
    content_type: &str,
    payload: &Payload,
) -> Result<EncodedBody, HttpError> {
    if payload.is_empty() {
        return Err(HttpError::MissingBody {
            method: method.as_str().to_ascii_lowercase(),
        });
    }

    if is_form_urlencoded(content_type) {
        let Payload::Params(params) = payload else {
            return Err(HttpError::IncompatibleBody {
                content_type: content_type.to_string(),
            });
        };
        let form = form_encode(params);
        return Ok(EncodedBody {
            content_length: Some(form.len()),
            bytes: Bytes::from(form),
        });
    }

    let bytes = match payload {
        Payload::Raw(body) => Bytes::from(body.clone()),
        Payload::Params(params) => serde_json::to_vec(params)
            .map(Bytes::from)
            .map_err(|e| HttpError::Encoding(e.to_string()))?,
    };

    Ok(EncodedBody {
        bytes,
        content_length: None,
    })
}

/// Serializes `params` as `key=value` pairs joined by `&`.
///
/// String values are written as-is, everything else in its JSON text form.
pub fn form_encode(params: &Map<String, Value>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(key, value)| (key, value_text(value))))
        .finish()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
