use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Request, StatusCode};
use thiserror::Error;

use crate::trust::ClientIdentity;

/// TLS behaviour negotiated for one call before it reaches the transport.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Accept whatever certificate the peer presents.
    pub accept_invalid_certs: bool,
    /// Client identity offered during the handshake.
    pub identity: Option<ClientIdentity>,
}

/// What the transport hands back when the exchange completed.
///
/// `body` is `None` only when the transport produced no payload at all,
/// which the executor treats as a failure.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub status: StatusCode,
    pub body: Option<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The secure channel could not be established (handshake, certificate, identity).
    SecureConnection,
    TimedOut,
    Connect,
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The asynchronous transport a [`HttpHelper`](crate::executor::HttpHelper)
/// submits its assembled requests to.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request, tls: TlsOptions) -> Result<Delivery, TransportError>;
}
