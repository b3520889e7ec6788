//! Reflects request metadata as JSON.

use std::collections::BTreeMap;

use axum::http::request::Parts;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::http::response;

/// Request metadata with sorted keys, so identical requests serialize
/// identically. Values under a key keep arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    pub version: String,
    pub query: BTreeMap<String, Vec<String>>,
    pub headers: BTreeMap<String, Vec<String>>,
}

impl RequestMeta {
    pub fn from_parts(parts: &Parts) -> Self {
        let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        // Lossy decoding: malformed escapes are kept, never dropped.
        let raw = parts.uri.query().unwrap_or_default();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            query
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in &parts.headers {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        Self {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            version: format!("{:?}", parts.version),
            query,
            headers,
        }
    }
}

pub fn dumpmeta(parts: &Parts) -> Response {
    response::json(&RequestMeta::from_parts(parts))
}
