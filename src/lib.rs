//! Blocking HTTP calls over an asynchronous transport.
//!
//! Configure a [`HttpHelper`] through [`RequestConfig`], then issue one of
//! `get`, `delete`, `post` or `update`; each call blocks until the transport
//! answers or the deadline passes and returns its own [`CallOutcome`].

pub mod body;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod output;
pub mod response;
pub mod trust;

pub use body::Payload;
pub use config::{RequestConfig, TextEncoding};
pub use error::{ErrorKind, HttpError};
pub use executor::HttpHelper;
pub use response::{CallOutcome, Response};
