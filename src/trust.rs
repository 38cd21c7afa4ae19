//! TLS trust evaluation.
//!
//! Every HTTPS call raises one server-trust [`Challenge`] for the protection
//! space it targets. [`evaluate`] answers it from the configured
//! [`CertificateTrustPolicy`] and a [`CertificateStrategy`] supplied by the
//! integrator. The function has no side effects beyond the strategy's
//! identity loader, so every branch is testable without a handshake.

use std::fmt;

use tracing::{debug, warn};
use url::Url;

use crate::error::HttpError;
use crate::fetch::TlsOptions;

/// How a pinned certificate participates in trust decisions.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum CertificateMode {
    #[default]
    None,
    PublicKeyPinned {
        certificate: Vec<u8>,
        /// Unlocks `certificate` as a client identity.
        password: Option<String>,
    },
}

impl fmt::Debug for CertificateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateMode::None => f.write_str("None"),
            CertificateMode::PublicKeyPinned {
                certificate,
                password,
            } => f
                .debug_struct("PublicKeyPinned")
                .field("certificate_len", &certificate.len())
                .field("has_password", &password.is_some())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateTrustPolicy {
    pub mode: CertificateMode,
    pub trust_all_peers: bool,
    /// Challenges for any other host are rejected outright. Empty means unset.
    pub required_host_domain: Option<String>,
}

/// The (host, port, scheme) a challenge is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionSpace {
    pub host: String,
    pub port: u16,
    pub scheme: String,
}

/// The identity the peer offered during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTrust {
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub space: ProtectionSpace,
    pub server_trust: Option<ServerTrust>,
}

impl Challenge {
    /// The server-trust challenge an HTTPS request to `url` will raise.
    ///
    /// Returns `None` for plain-text schemes, which never negotiate TLS.
    pub fn for_url(url: &Url) -> Option<Self> {
        if url.scheme() != "https" {
            return None;
        }
        let host = url.host_str()?.to_string();
        Some(Self {
            space: ProtectionSpace {
                host: host.clone(),
                port: url.port_or_known_default().unwrap_or(443),
                scheme: url.scheme().to_string(),
            },
            server_trust: Some(ServerTrust { host }),
        })
    }
}

/// PKCS#12 blob plus the password that unlocks it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pkcs12: Vec<u8>,
    password: String,
}

impl ClientIdentity {
    pub fn new(pkcs12: Vec<u8>, password: &str) -> Self {
        Self {
            pkcs12,
            password: password.to_string(),
        }
    }

    pub fn pkcs12(&self) -> &[u8] {
        &self.pkcs12
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("pkcs12_len", &self.pkcs12.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Accept the trust the peer offered.
    ServerTrust(ServerTrust),
    /// Present a client identity.
    ClientIdentity(ClientIdentity),
}

/// The answer to one challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    UseCredential(Credential),
    PerformDefaultHandling,
    CancelChallenge,
    RejectProtectionSpace,
}

impl Disposition {
    /// Turns the answer into transport settings, or the failure it implies.
    pub fn into_tls_options(self, space: &ProtectionSpace) -> Result<TlsOptions, HttpError> {
        match self {
            Disposition::UseCredential(Credential::ServerTrust(_)) => Ok(TlsOptions {
                accept_invalid_certs: true,
                identity: None,
            }),
            Disposition::UseCredential(Credential::ClientIdentity(identity)) => Ok(TlsOptions {
                accept_invalid_certs: false,
                identity: Some(identity),
            }),
            Disposition::PerformDefaultHandling => Ok(TlsOptions::default()),
            Disposition::CancelChallenge => Err(HttpError::Io(format!(
                "trust challenge for {}:{} cancelled",
                space.host, space.port
            ))),
            Disposition::RejectProtectionSpace => Err(HttpError::SecurityTransport(format!(
                "protection space {}:{} rejected",
                space.host, space.port
            ))),
        }
    }
}

/// Integrator-supplied certificate handling.
///
/// No pinning algorithm is assumed: whether a pinned certificate is trusted
/// for a protection space is entirely up to the implementation.
pub trait CertificateStrategy: Send + Sync {
    /// Whether `certificate` is trusted for `space`.
    fn trusts(&self, space: &ProtectionSpace, certificate: &[u8]) -> bool;

    /// Unlocks `certificate` as a client identity.
    fn load_identity(&self, certificate: &[u8], password: &str) -> Result<ClientIdentity, String>;
}

/// Strategy used when none is injected.
///
/// Trusts no pinned certificate, so pinned calls fall back to platform
/// validation. Identities are accepted if they parse as PKCS#12.
#[derive(Debug, Default)]
pub struct DefaultStrategy;

impl CertificateStrategy for DefaultStrategy {
    fn trusts(&self, _space: &ProtectionSpace, _certificate: &[u8]) -> bool {
        false
    }

    fn load_identity(&self, certificate: &[u8], password: &str) -> Result<ClientIdentity, String> {
        reqwest::Identity::from_pkcs12_der(certificate, password).map_err(|e| e.to_string())?;
        Ok(ClientIdentity::new(certificate.to_vec(), password))
    }
}

/// Decides how to answer `challenge`.
///
/// Order: host-domain mismatch rejects; trust-all accepts any offered server
/// trust; a pinned certificate is consulted through `strategy`; otherwise the
/// platform decides.
pub fn evaluate(
    challenge: &Challenge,
    policy: &CertificateTrustPolicy,
    strategy: &dyn CertificateStrategy,
) -> Disposition {
    let space = &challenge.space;

    if let Some(domain) = policy
        .required_host_domain
        .as_deref()
        .filter(|d| !d.is_empty())
    {
        if !domain.eq_ignore_ascii_case(&space.host) {
            debug!(host = %space.host, required = domain, "Host outside required domain");
            return Disposition::RejectProtectionSpace;
        }
    }

    if policy.trust_all_peers {
        if let Some(trust) = &challenge.server_trust {
            return Disposition::UseCredential(Credential::ServerTrust(trust.clone()));
        }
    }

    match &policy.mode {
        CertificateMode::None => Disposition::PerformDefaultHandling,
        CertificateMode::PublicKeyPinned { certificate, .. } if certificate.is_empty() => {
            Disposition::CancelChallenge
        }
        CertificateMode::PublicKeyPinned {
            certificate,
            password,
        } => {
            if !strategy.trusts(space, certificate) {
                return Disposition::PerformDefaultHandling;
            }
            match password {
                Some(password) => match strategy.load_identity(certificate, password) {
                    Ok(identity) => Disposition::UseCredential(Credential::ClientIdentity(identity)),
                    Err(reason) => {
                        warn!(host = %space.host, %reason, "Failed to load client identity");
                        Disposition::CancelChallenge
                    }
                },
                None => match &challenge.server_trust {
                    Some(trust) => Disposition::UseCredential(Credential::ServerTrust(trust.clone())),
                    None => Disposition::PerformDefaultHandling,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStrategy {
        trusted: bool,
        loads: bool,
    }

    impl CertificateStrategy for FixedStrategy {
        fn trusts(&self, _space: &ProtectionSpace, _certificate: &[u8]) -> bool {
            self.trusted
        }

        fn load_identity(&self, certificate: &[u8], password: &str) -> Result<ClientIdentity, String> {
            if self.loads {
                Ok(ClientIdentity::new(certificate.to_vec(), password))
            } else {
                Err("bad password".to_string())
            }
        }
    }

    const TRUSTING: FixedStrategy = FixedStrategy {
        trusted: true,
        loads: true,
    };

    fn challenge(host: &str) -> Challenge {
        Challenge::for_url(&Url::parse(&format!("https://{host}/path")).unwrap()).unwrap()
    }

    fn pinned(password: Option<&str>) -> CertificateTrustPolicy {
        CertificateTrustPolicy {
            mode: CertificateMode::PublicKeyPinned {
                certificate: vec![0x30, 0x82],
                password: password.map(str::to_string),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_challenge_only_for_https() {
        let plain = Url::parse("http://example.com").unwrap();
        assert!(Challenge::for_url(&plain).is_none());

        let c = challenge("example.com:8443");
        assert_eq!(c.space.host, "example.com");
        assert_eq!(c.space.port, 8443);
        assert_eq!(c.server_trust, Some(ServerTrust { host: "example.com".to_string() }));
    }

    #[test]
    fn test_host_mismatch_rejects_regardless_of_flags() {
        let mut policy = pinned(Some("pw"));
        policy.trust_all_peers = true;
        policy.required_host_domain = Some("api.example.com".to_string());

        assert_eq!(
            evaluate(&challenge("evil.example.org"), &policy, &TRUSTING),
            Disposition::RejectProtectionSpace
        );
    }

    #[test]
    fn test_host_match_is_case_insensitive() {
        let policy = CertificateTrustPolicy {
            trust_all_peers: true,
            required_host_domain: Some("API.Example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            evaluate(&challenge("api.example.com"), &policy, &DefaultStrategy),
            Disposition::UseCredential(Credential::ServerTrust(_))
        ));
    }

    #[test]
    fn test_empty_host_domain_is_ignored() {
        let policy = CertificateTrustPolicy {
            required_host_domain: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            evaluate(&challenge("example.com"), &policy, &DefaultStrategy),
            Disposition::PerformDefaultHandling
        );
    }

    #[test]
    fn test_trust_all_beats_pinning() {
        let mut policy = pinned(Some("pw"));
        policy.trust_all_peers = true;
        assert_eq!(
            evaluate(&challenge("example.com"), &policy, &TRUSTING),
            Disposition::UseCredential(Credential::ServerTrust(ServerTrust {
                host: "example.com".to_string()
            }))
        );
    }

    #[test]
    fn test_trust_all_without_server_trust_falls_through() {
        let policy = CertificateTrustPolicy {
            trust_all_peers: true,
            ..Default::default()
        };
        let mut c = challenge("example.com");
        c.server_trust = None;
        assert_eq!(
            evaluate(&c, &policy, &DefaultStrategy),
            Disposition::PerformDefaultHandling
        );
    }

    #[test]
    fn test_pinned_trusted_with_password_uses_identity() {
        let disposition = evaluate(&challenge("example.com"), &pinned(Some("pw")), &TRUSTING);
        assert_eq!(
            disposition,
            Disposition::UseCredential(Credential::ClientIdentity(ClientIdentity::new(
                vec![0x30, 0x82],
                "pw"
            )))
        );
    }

    #[test]
    fn test_pinned_trusted_without_password_accepts_peer() {
        assert!(matches!(
            evaluate(&challenge("example.com"), &pinned(None), &TRUSTING),
            Disposition::UseCredential(Credential::ServerTrust(_))
        ));
    }

    #[test]
    fn test_pinned_untrusted_defers_to_platform() {
        let strategy = FixedStrategy {
            trusted: false,
            loads: true,
        };
        assert_eq!(
            evaluate(&challenge("example.com"), &pinned(Some("pw")), &strategy),
            Disposition::PerformDefaultHandling
        );
    }

    #[test]
    fn test_identity_load_failure_cancels() {
        let strategy = FixedStrategy {
            trusted: true,
            loads: false,
        };
        assert_eq!(
            evaluate(&challenge("example.com"), &pinned(Some("wrong")), &strategy),
            Disposition::CancelChallenge
        );
    }

    #[test]
    fn test_pinned_without_certificate_cancels() {
        let policy = CertificateTrustPolicy {
            mode: CertificateMode::PublicKeyPinned {
                certificate: Vec::new(),
                password: None,
            },
            ..Default::default()
        };
        assert_eq!(
            evaluate(&challenge("example.com"), &policy, &TRUSTING),
            Disposition::CancelChallenge
        );
    }

    #[test]
    fn test_no_policy_performs_default_handling() {
        assert_eq!(
            evaluate(
                &challenge("example.com"),
                &CertificateTrustPolicy::default(),
                &DefaultStrategy
            ),
            Disposition::PerformDefaultHandling
        );
    }

    #[test]
    fn test_default_strategy_never_trusts_pins() {
        assert_eq!(
            evaluate(&challenge("example.com"), &pinned(Some("pw")), &DefaultStrategy),
            Disposition::PerformDefaultHandling
        );
    }

    #[test]
    fn test_dispositions_map_to_tls_options() {
        let space = challenge("example.com").space;

        let trust_all = Disposition::UseCredential(Credential::ServerTrust(ServerTrust {
            host: "example.com".to_string(),
        }))
        .into_tls_options(&space)
        .unwrap();
        assert!(trust_all.accept_invalid_certs);

        let with_identity = Disposition::UseCredential(Credential::ClientIdentity(
            ClientIdentity::new(vec![1], "pw"),
        ))
        .into_tls_options(&space)
        .unwrap();
        assert!(!with_identity.accept_invalid_certs);
        assert!(with_identity.identity.is_some());

        let rejected = Disposition::RejectProtectionSpace
            .into_tls_options(&space)
            .unwrap_err();
        assert!(matches!(rejected, HttpError::SecurityTransport(_)));

        let cancelled = Disposition::CancelChallenge.into_tls_options(&space).unwrap_err();
        assert!(matches!(cancelled, HttpError::Io(_)));
    }

    #[test]
    fn test_mode_debug_hides_password() {
        let debug = format!("{:?}", pinned(Some("topsecret")).mode);
        assert!(!debug.contains("topsecret"));
    }
}
