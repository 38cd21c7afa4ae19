use std::error::Error as StdError;

use super::client::{Delivery, HttpClient, TlsOptions, TransportError, TransportErrorKind};
use async_trait::async_trait;

/// Substrings that mark a lower error in a reqwest source chain as a TLS
/// failure when no `native_tls::Error` is found by type.
const TLS_MARKERS: [&str; 4] = ["certificate", "handshake", "ssl", "tls"];

/// [`HttpClient`] backed by reqwest with native TLS.
///
/// A fresh `reqwest::Client` is built for every call so the negotiated
/// [`TlsOptions`] apply to that call only.
#[derive(Debug, Default)]
pub struct BasicClient;

impl BasicClient {
    pub fn new() -> Self {
        Self
    }

    fn client_for(tls: TlsOptions) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(tls.accept_invalid_certs)
            .danger_accept_invalid_hostnames(tls.accept_invalid_certs);

        if let Some(identity) = tls.identity {
            let identity = reqwest::Identity::from_pkcs12_der(identity.pkcs12(), identity.password())
                .map_err(|e| TransportError::new(TransportErrorKind::SecureConnection, e.to_string()))?;
            builder = builder.identity(identity);
        }

        builder.build().map_err(TransportError::from)
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request, tls: TlsOptions) -> Result<Delivery, TransportError> {
        let client = Self::client_for(tls)?;
        let resp = client.execute(req).await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        Ok(Delivery {
            status,
            body: Some(body),
        })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        let kind = if err.is_timeout() {
            TransportErrorKind::TimedOut
        } else if is_tls_failure(&err) {
            TransportErrorKind::SecureConnection
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, err.to_string())
    }
}

/// Looks below the top-level error for a TLS-layer cause.
///
/// The top-level reqwest message names the request URL, so only its sources
/// are inspected.
fn is_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = err.source();
    while let Some(e) = current {
        if is_native_tls(e) || mentions_tls(e) {
            return true;
        }
        current = e.source();
    }
    false
}

fn is_native_tls(err: &(dyn StdError + 'static)) -> bool {
    err.is::<native_tls::Error>()
        || err
            .downcast_ref::<std::io::Error>()
            .and_then(|io| io.get_ref())
            .is_some_and(|inner| inner.is::<native_tls::Error>())
}

fn mentions_tls(err: &(dyn StdError + 'static)) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    TLS_MARKERS.iter().any(|marker| message.contains(marker))
}
