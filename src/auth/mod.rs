//! Authentication for the gated hello endpoints.
//!
//! # Data Flow
//! ```text
//! Authorization header
//!     → basic.rs  (typed Basic header, credential compare)
//!     → digest.rs (parse, nonce check, MD5 response compare)
//!     → Ok(()) or DispatchError::Unauthorized { challenge }
//! ```

pub mod basic;
pub mod digest;

use axum::http::{header, HeaderMap, Method, Uri};
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::error::DispatchError;
use digest::{DigestVerifier, NonceIssuer, Verdict};

/// The single user the sandbox accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = constant_time_eq(&self.username, username);
        let password_ok = constant_time_eq(&self.password, password);
        user_ok & password_ok
    }
}

/// Checks Basic and Digest credentials against the configured user.
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Credentials,
    digest: DigestVerifier,
}

impl Authenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_nonces(config, NonceIssuer::new(config.nonce_ttl_secs))
    }

    pub fn with_nonces(config: &AuthConfig, nonces: NonceIssuer) -> Self {
        Self {
            credentials: Credentials::new(&config.username, &config.password),
            digest: DigestVerifier::new(&config.realm, nonces),
        }
    }

    pub fn check_basic(&self, headers: &HeaderMap) -> Result<(), DispatchError> {
        if basic::verify(headers, &self.credentials) {
            return Ok(());
        }
        tracing::debug!("Basic credentials rejected");
        Err(DispatchError::Unauthorized {
            challenge: basic::challenge(self.digest.realm()),
        })
    }

    pub fn check_digest(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> Result<(), DispatchError> {
        let header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let target = uri
            .path_and_query()
            .map_or_else(|| uri.path(), |pq| pq.as_str());
        let now = digest::unix_now();

        let stale = match self
            .digest
            .verify(header, method.as_str(), target, &self.credentials, now)
        {
            Verdict::Accepted => return Ok(()),
            Verdict::Stale => true,
            Verdict::Rejected => false,
        };
        tracing::debug!(stale, "Digest credentials rejected");
        Err(DispatchError::Unauthorized {
            challenge: self.digest.challenge(now, stale),
        })
    }
}

/// Compare secrets without a data-dependent early exit. Lengths still leak.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Quote a string for use as an auth-param value.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
