//! HTTP Digest authentication (RFC 2617, MD5).
//!
//! Nonces are stateless: `<16 hex digit timestamp><md5(timestamp:secret)>`.
//! Any nonce carrying a valid tag and younger than the TTL is accepted, so
//! no per-client state is kept between requests.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};

use crate::auth::{constant_time_eq, quote, Credentials};

const TIMESTAMP_LEN: usize = 16;

/// Hex MD5 of `parts` joined with ':'.
pub fn md5_hex(parts: &[&str]) -> String {
    let mut hasher = Md5::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b":");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Parse a `Digest k=v, k="v"` header value into lowercase keys.
///
/// Works for both `Authorization` and `WWW-Authenticate` values. Returns
/// `None` when the scheme is not Digest.
pub fn parse_params(value: &str) -> Option<HashMap<String, String>> {
    let value = value.trim_start();
    let (scheme, rest) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("digest") {
        return None;
    }

    let mut params = HashMap::new();
    let mut chars = rest.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        let mut val = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            val.push(escaped);
                        }
                    }
                    '"' => break,
                    other => val.push(other),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                val.push(*c);
                chars.next();
            }
            val = val.trim().to_string();
        }

        params.insert(key, val);
    }

    Some(params)
}

/// The fields a client sends in `Authorization: Digest ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResponse {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub qop: Option<String>,
    pub nc: Option<String>,
    pub cnonce: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestResponse {
    pub fn parse(value: &str) -> Option<Self> {
        let mut params = parse_params(value)?;
        Some(Self {
            username: params.remove("username")?,
            realm: params.remove("realm")?,
            nonce: params.remove("nonce")?,
            uri: params.remove("uri")?,
            response: params.remove("response")?,
            qop: params.remove("qop"),
            nc: params.remove("nc"),
            cnonce: params.remove("cnonce"),
            opaque: params.remove("opaque"),
            algorithm: params.remove("algorithm"),
        })
    }

    /// The response hash a client holding `password` would compute.
    pub fn expected(&self, method: &str, password: &str) -> String {
        let ha1 = md5_hex(&[&self.username, &self.realm, password]);
        let ha2 = md5_hex(&[method, &self.uri]);
        match (&self.qop, &self.nc, &self.cnonce) {
            (Some(qop), Some(nc), Some(cnonce)) => {
                md5_hex(&[&ha1, &self.nonce, nc, cnonce, qop, &ha2])
            }
            _ => md5_hex(&[&ha1, &self.nonce, &ha2]),
        }
    }
}

/// State of a nonce presented by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStatus {
    Valid,
    Stale,
    Invalid,
}

/// Issues and checks stateless nonces.
#[derive(Debug, Clone)]
pub struct NonceIssuer {
    secret: String,
    ttl_secs: u64,
}

impl NonceIssuer {
    /// Issuer with a random per-process secret.
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_secret(hex::encode(rand::random::<[u8; 16]>()), ttl_secs)
    }

    pub fn with_secret(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn issue(&self, now: u64) -> String {
        let timestamp = format!("{now:0width$x}", width = TIMESTAMP_LEN);
        let tag = md5_hex(&[&timestamp, &self.secret]);
        format!("{timestamp}{tag}")
    }

    pub fn check(&self, nonce: &str, now: u64) -> NonceStatus {
        if nonce.len() <= TIMESTAMP_LEN || !nonce.is_char_boundary(TIMESTAMP_LEN) {
            return NonceStatus::Invalid;
        }
        let (timestamp, tag) = nonce.split_at(TIMESTAMP_LEN);
        if !constant_time_eq(&md5_hex(&[timestamp, &self.secret]), tag) {
            return NonceStatus::Invalid;
        }
        let Ok(issued) = u64::from_str_radix(timestamp, 16) else {
            return NonceStatus::Invalid;
        };
        if now.saturating_sub(issued) > self.ttl_secs || issued > now {
            NonceStatus::Stale
        } else {
            NonceStatus::Valid
        }
    }
}

/// Outcome of checking a Digest `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Stale,
    Rejected,
}

/// Verifies Digest credentials against a single configured user.
#[derive(Debug, Clone)]
pub struct DigestVerifier {
    realm: String,
    opaque: String,
    nonces: NonceIssuer,
}

impl DigestVerifier {
    pub fn new(realm: impl Into<String>, nonces: NonceIssuer) -> Self {
        let realm = realm.into();
        let opaque = md5_hex(&[&realm]);
        Self {
            realm,
            opaque,
            nonces,
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Check `header` for a request with `method` and request-target `uri`.
    pub fn verify(
        &self,
        header: Option<&str>,
        method: &str,
        uri: &str,
        credentials: &Credentials,
        now: u64,
    ) -> Verdict {
        let Some(digest) = header.and_then(DigestResponse::parse) else {
            return Verdict::Rejected;
        };

        if digest.username != credentials.username || digest.realm != self.realm {
            return Verdict::Rejected;
        }
        if digest.uri != uri {
            tracing::debug!(expected = uri, got = %digest.uri, "Digest uri mismatch");
            return Verdict::Rejected;
        }
        if digest
            .algorithm
            .as_deref()
            .is_some_and(|alg| !alg.eq_ignore_ascii_case("md5"))
        {
            return Verdict::Rejected;
        }
        if digest.qop.as_deref().is_some_and(|qop| qop != "auth") {
            return Verdict::Rejected;
        }
        if digest.opaque.as_deref().is_some_and(|o| o != self.opaque) {
            return Verdict::Rejected;
        }

        let nonce_status = self.nonces.check(&digest.nonce, now);
        if nonce_status == NonceStatus::Invalid {
            return Verdict::Rejected;
        }
        if !constant_time_eq(&digest.expected(method, &credentials.password), &digest.response) {
            return Verdict::Rejected;
        }

        // Correct password over an expired nonce: ask the client to retry.
        if nonce_status == NonceStatus::Stale {
            Verdict::Stale
        } else {
            Verdict::Accepted
        }
    }

    /// A fresh `WWW-Authenticate` value.
    pub fn challenge(&self, now: u64, stale: bool) -> String {
        let mut value = format!(
            "Digest realm={}, qop=\"auth\", nonce=\"{}\", opaque=\"{}\", algorithm=MD5",
            quote(&self.realm),
            self.nonces.issue(now),
            self.opaque,
        );
        if stale {
            value.push_str(", stale=true");
        }
        value
    }
}
