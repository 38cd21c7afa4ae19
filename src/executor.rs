//! Blocking request execution over the asynchronous transport.
//!
//! [`HttpHelper`] assembles one request on the calling thread, hands it to
//! its own tokio runtime, and parks the caller on a one-shot channel until
//! the transport completes or the configured deadline passes. Each call
//! returns its own [`CallOutcome`], so one helper may serve several threads
//! at once.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, Request};
use tokio::runtime::Runtime;
use tracing::{debug, error};
use url::Url;

use crate::body::{Payload, encode_body};
use crate::config::RequestConfig;
use crate::diagnostics::{DeviceInfoProvider, HostDeviceInfo, diagnostic_params, merge_params};
use crate::error::HttpError;
use crate::fetch::query::append_query;
use crate::fetch::{BasicClient, HttpClient, TlsOptions, TransportError, TransportErrorKind};
use crate::response::{CallOutcome, Response};
use crate::trust::{CertificateStrategy, CertificateTrustPolicy, Challenge, DefaultStrategy, evaluate};

/// Blocking HTTP executor.
///
/// Must not be called or dropped from inside an async context: it owns a
/// runtime and blocks the calling thread.
pub struct HttpHelper<C: HttpClient + 'static = BasicClient> {
    config: RequestConfig,
    client: Arc<C>,
    strategy: Arc<dyn CertificateStrategy>,
    device: Arc<dyn DeviceInfoProvider>,
    runtime: Runtime,
}

impl HttpHelper<BasicClient> {
    /// Form-encoded requests with a 20 second timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_client(BasicClient::new(), RequestConfig::default())
    }

    /// Requests of `content_type` with a 60 second timeout.
    pub fn with_content_type(content_type: &str) -> Result<Self, HttpError> {
        Self::with_client(BasicClient::new(), RequestConfig::with_content_type(content_type))
    }
}

impl<C: HttpClient + 'static> HttpHelper<C> {
    pub fn with_client(client: C, config: RequestConfig) -> Result<Self, HttpError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("http-helper-transport")
            .enable_all()
            .build()
            .map_err(|e| HttpError::Io(format!("failed to start transport runtime: {e}")))?;

        Ok(Self {
            config,
            client: Arc::new(client),
            strategy: Arc::new(DefaultStrategy),
            device: Arc::new(HostDeviceInfo::default()),
            runtime,
        })
    }

    /// Mutable access to the configuration used by subsequent calls.
    pub fn config(&mut self) -> &mut RequestConfig {
        &mut self.config
    }

    pub fn settings(&self) -> &RequestConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn set_certificate_strategy(
        &mut self,
        strategy: impl CertificateStrategy + 'static,
    ) -> &mut Self {
        self.strategy = Arc::new(strategy);
        self
    }

    pub fn set_device_info(&mut self, provider: impl DeviceInfoProvider + 'static) -> &mut Self {
        self.device = Arc::new(provider);
        self
    }

    pub fn get(&self, url: &str, params: &BTreeMap<String, String>) -> CallOutcome {
        self.execute(Method::GET, url, params, None)
    }

    pub fn delete(&self, url: &str, params: &BTreeMap<String, String>) -> CallOutcome {
        self.execute(Method::DELETE, url, params, None)
    }

    pub fn post(&self, url: &str, payload: impl Into<Payload>) -> CallOutcome {
        self.execute(Method::POST, url, &BTreeMap::new(), Some(payload.into()))
    }

    /// PUT
    pub fn update(&self, url: &str, payload: impl Into<Payload>) -> CallOutcome {
        self.execute(Method::PUT, url, &BTreeMap::new(), Some(payload.into()))
    }

    #[tracing::instrument(skip(self, method, params, payload), fields(method = %method))]
    fn execute(
        &self,
        method: Method,
        url: &str,
        params: &BTreeMap<String, String>,
        payload: Option<Payload>,
    ) -> CallOutcome {
        let outcome = self
            .assemble(method, url, params, payload.as_ref())
            .and_then(|request| self.dispatch(request));

        match &outcome {
            Ok(response) => debug!(
                status = response.status().as_u16(),
                bytes = response.bytes().len(),
                "Call completed"
            ),
            Err(e) => error!(kind = %e.kind(), error = %e, "Call failed"),
        }
        outcome
    }

    fn assemble(
        &self,
        method: Method,
        url: &str,
        params: &BTreeMap<String, String>,
        payload: Option<&Payload>,
    ) -> Result<Request, HttpError> {
        let mut url = parse_url(url)?;

        if payload.is_none() {
            let diagnostics = self
                .config
                .add_default_params()
                .then(|| diagnostic_params(&self.device.device_info()));
            append_query(&mut url, &merge_params(params, diagnostics));
        }

        let mut req = Request::new(method, url);
        *req.timeout_mut() = Some(self.config.timeout());

        if let Some(credentials) = self.config.credentials().filter(|c| c.is_complete()) {
            req.headers_mut()
                .insert(AUTHORIZATION, credentials.header_value()?);
        }

        for (key, value) in self.config.headers() {
            let invalid = || HttpError::InvalidHeader { name: key.clone() };
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            req.headers_mut().insert(name, value);
        }

        if let Some(payload) = payload {
            let content_type = self.config.content_type();
            let encoded = encode_body(req.method(), content_type, payload)?;

            let headers = req.headers_mut();
            if !headers.contains_key(CONTENT_TYPE) {
                let value = HeaderValue::from_str(content_type).map_err(|_| HttpError::InvalidHeader {
                    name: CONTENT_TYPE.to_string(),
                })?;
                headers.insert(CONTENT_TYPE, value);
            }
            if let Some(length) = encoded.content_length {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
            }
            *req.body_mut() = Some(encoded.bytes.into());
        }

        debug!(url = %req.url(), headers = req.headers().len(), "Request assembled");
        Ok(req)
    }

    /// Runs `request` on the transport runtime and blocks until it finishes
    /// or the deadline passes.
    fn dispatch(&self, request: Request) -> CallOutcome {
        let (tx, rx) = mpsc::sync_channel::<CallOutcome>(1);
        let client = Arc::clone(&self.client);
        let strategy = Arc::clone(&self.strategy);
        let policy = self.config.trust().clone();
        let timeout = self.config.timeout();

        let task = self.runtime.spawn(async move {
            let outcome = transmit(client.as_ref(), strategy.as_ref(), &policy, timeout, request).await;
            // The caller may already have given up waiting.
            let _ = tx.send(outcome);
        });

        let deadline = self.config.deadline();
        match rx.recv_timeout(deadline) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                task.abort();
                Err(HttpError::Timeout(deadline))
            }
            Err(RecvTimeoutError::Disconnected) => Err(HttpError::Io(
                "transport task ended without a result".to_string(),
            )),
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, HttpError> {
    let invalid = |reason: String| HttpError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Answers the TLS challenge (if any), sends the request and classifies the result.
async fn transmit<C: HttpClient + ?Sized>(
    client: &C,
    strategy: &dyn CertificateStrategy,
    policy: &CertificateTrustPolicy,
    timeout: Duration,
    request: Request,
) -> CallOutcome {
    let tls = match Challenge::for_url(request.url()) {
        Some(challenge) => {
            let disposition = evaluate(&challenge, policy, strategy);
            debug!(host = %challenge.space.host, ?disposition, "Trust challenge answered");
            disposition.into_tls_options(&challenge.space)?
        }
        None => TlsOptions::default(),
    };

    let delivery = client
        .execute(request, tls)
        .await
        .map_err(|e| classify(e, timeout))?;

    match delivery.body {
        Some(bytes) => Ok(Response::new(delivery.status, bytes)),
        None => Err(HttpError::Io("transport completed without data".to_string())),
    }
}

fn classify(err: TransportError, timeout: Duration) -> HttpError {
    match err.kind {
        TransportErrorKind::SecureConnection => HttpError::SecurityTransport(err.message),
        TransportErrorKind::TimedOut => HttpError::Timeout(timeout),
        TransportErrorKind::Connect | TransportErrorKind::Other => HttpError::Io(err.message),
    }
}
