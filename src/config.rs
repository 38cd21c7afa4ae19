//! Per-executor request configuration.
//!
//! [`RequestConfig`] is plain data mutated through chained setters before a
//! call is issued. Nothing here validates or performs I/O; problems with the
//! values (bad header names, unusable credentials) surface when a call is
//! assembled.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::fetch::auth::Credentials;
use crate::trust::{CertificateMode, CertificateTrustPolicy};

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const APPLICATION_JSON: &str = "application/json";

/// Timeout used by [`RequestConfig::default`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
/// Timeout used when the caller picks the content type explicitly.
pub const EXPLICIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text encoding used when decoding response bodies to strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1
    Latin1,
}

impl TextEncoding {
    /// Decodes `bytes`, returning `None` when they are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            // Every byte maps to the code point of the same value.
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestConfig {
    content_type: String,
    timeout: Duration,
    wait_limit: Option<Duration>,
    encoding: TextEncoding,
    headers: BTreeMap<String, String>,
    add_default_params: bool,
    credentials: Option<Credentials>,
    trust: CertificateTrustPolicy,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            content_type: FORM_URLENCODED.to_string(),
            timeout: DEFAULT_TIMEOUT,
            wait_limit: None,
            encoding: TextEncoding::Utf8,
            headers: BTreeMap::new(),
            add_default_params: false,
            credentials: None,
            trust: CertificateTrustPolicy::default(),
        }
    }
}

impl RequestConfig {
    pub fn new(content_type: &str, timeout: Duration, encoding: TextEncoding) -> Self {
        let mut config = Self::default();
        config.configure(content_type, timeout, encoding);
        config
    }

    /// Explicit content type with the 60 second timeout and UTF-8.
    pub fn with_content_type(content_type: &str) -> Self {
        Self::new(content_type, EXPLICIT_TIMEOUT, TextEncoding::Utf8)
    }

    pub fn configure(
        &mut self,
        content_type: &str,
        timeout: Duration,
        encoding: TextEncoding,
    ) -> &mut Self {
        self.content_type = content_type.to_string();
        self.timeout = timeout;
        self.encoding = encoding;
        self
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Caps how long the calling thread blocks. Defaults to the request timeout.
    pub fn set_wait_limit(&mut self, wait_limit: Duration) -> &mut Self {
        self.wait_limit = Some(wait_limit);
        self
    }

    pub fn set_encoding(&mut self, encoding: TextEncoding) -> &mut Self {
        self.encoding = encoding;
        self
    }

    /// Appends device/app diagnostic parameters to GET and DELETE query strings.
    pub fn set_add_default_params(&mut self, enabled: bool) -> &mut Self {
        self.add_default_params = enabled;
        self
    }

    /// Adds a custom header; a later value for the same key replaces the earlier one.
    pub fn add_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn set_basic_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Pins a certificate blob, optionally with the password that unlocks it
    /// as a client identity.
    ///
    /// Passing `None` clears the blob but keeps a previously pinned mode, so
    /// the next TLS challenge is cancelled rather than silently unpinned.
    pub fn set_certificate(
        &mut self,
        certificate: Option<Vec<u8>>,
        password: Option<&str>,
    ) -> &mut Self {
        let password = password.map(str::to_string);
        self.trust.mode = match (certificate, &self.trust.mode) {
            (Some(certificate), _) => CertificateMode::PublicKeyPinned {
                certificate,
                password,
            },
            (None, CertificateMode::PublicKeyPinned { .. }) => CertificateMode::PublicKeyPinned {
                certificate: Vec::new(),
                password,
            },
            (None, CertificateMode::None) => CertificateMode::None,
        };
        self
    }

    pub fn set_trust_all(&mut self, trust_all: bool) -> &mut Self {
        self.trust.trust_all_peers = trust_all;
        self
    }

    pub fn set_host_domain(&mut self, host_domain: &str) -> &mut Self {
        self.trust.required_host_domain = Some(host_domain.to_string());
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// How long a caller blocks before the call is abandoned.
    pub fn deadline(&self) -> Duration {
        self.wait_limit.unwrap_or(self.timeout)
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn add_default_params(&self) -> bool {
        self.add_default_params
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn trust(&self) -> &CertificateTrustPolicy {
        &self.trust
    }
}
