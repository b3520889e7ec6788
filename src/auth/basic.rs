//! HTTP Basic authentication (RFC 7617).
//!
//! Header decoding is left to the typed `Authorization<Basic>` header from
//! axum-extra; this module only compares and builds challenges.

use axum::http::HeaderMap;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::{Authorization, HeaderMapExt};

use crate::auth::{quote, Credentials};

/// True when the request carries Basic credentials equal to `expected`.
pub fn verify(headers: &HeaderMap, expected: &Credentials) -> bool {
    headers
        .typed_get::<Authorization<Basic>>()
        .is_some_and(|auth| expected.matches(auth.username(), auth.password()))
}

pub fn challenge(realm: &str) -> String {
    format!("Basic realm={}", quote(realm))
}
