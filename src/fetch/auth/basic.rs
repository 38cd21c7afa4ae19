use std::fmt;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use reqwest::header::HeaderValue;

use crate::error::HttpError;

/// Username and password for HTTP Basic authentication.
///
/// Both halves must be non-empty for the header to be sent; an executor with
/// partial credentials issues unauthenticated requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns `true` when both username and password are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Renders `Basic base64(username:password)`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::AuthFormat`] if the rendered value is not a valid
    /// header value.
    pub fn header_value(&self) -> Result<HeaderValue, HttpError> {
        let encoded = BASE64_STANDARD.encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|e| HttpError::AuthFormat(e.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Splits an `Authorization: Basic ...` value back into its credentials.
///
/// The split is at the first `:`, so a username that itself contains `:`
/// comes back with the rest folded into the password.
pub fn decode_basic_auth(value: &str) -> Result<Credentials, HttpError> {
    let encoded = value
        .strip_prefix("Basic ")
        .ok_or_else(|| HttpError::AuthFormat("missing 'Basic ' prefix".to_string()))?;
    let decoded = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| HttpError::AuthFormat(e.to_string()))?;
    let decoded = String::from_utf8(decoded).map_err(|e| HttpError::AuthFormat(e.to_string()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| HttpError::AuthFormat("missing ':' separator".to_string()))?;

    Ok(Credentials::new(username, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_is_basic_base64() {
        let creds = Credentials::new("Aladdin", "open sesame");
        let value = creds.header_value().unwrap();
        assert_eq!(value.to_str().unwrap(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_header_value_round_trips() {
        let pairs = [
            ("user", "pass"),
            ("joão", "señha:com:dois-pontos"),
            ("a", "b"),
            ("very-long-user-name-that-exceeds-sixty-four-characters-when-encoded", "x"),
        ];
        for (user, pass) in pairs {
            let creds = Credentials::new(user, pass);
            let value = creds.header_value().unwrap();
            let decoded = decode_basic_auth(value.to_str().unwrap()).unwrap();
            assert_eq!(decoded, creds);
        }
    }

    #[test]
    fn test_long_credentials_are_not_line_wrapped() {
        let creds = Credentials::new(&"u".repeat(80), &"p".repeat(80));
        let value = creds.header_value().unwrap();
        assert!(!value.to_str().unwrap().contains('\n'));
    }

    #[test]
    fn test_colon_in_username_is_encoded_as_given() {
        let value = Credentials::new("domain:user", "pass").header_value().unwrap();
        let expected = format!("Basic {}", BASE64_STANDARD.encode("domain:user:pass"));
        assert_eq!(value.to_str().unwrap(), expected);

        let decoded = decode_basic_auth(value.to_str().unwrap()).unwrap();
        assert_eq!(decoded, Credentials::new("domain", "user:pass"));
    }

    #[test]
    fn test_is_complete_requires_both() {
        assert!(Credentials::new("u", "p").is_complete());
        assert!(!Credentials::new("", "p").is_complete());
        assert!(!Credentials::new("u", "").is_complete());
        assert!(!Credentials::new("", "").is_complete());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("user", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
