//! Reflects the request body, shaped by query parameters.
//!
//! | Parameter  | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `code`     | status to return (200..=599, default 200)               |
//! | `content`  | body to return instead of the request body              |
//! | `encoding` | WHATWG charset label used for `content` (utf-8, gb2312) |
//! | `header`   | `Name: Value` added to the response, repeatable          |
//! | `delay`    | seconds to wait before responding                       |

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::Query;
use axum::http::{header, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use encoding_rs::{Encoding, UTF_8};

use crate::error::DispatchError;
use crate::handlers::read_body;
use crate::http::response::{self, TEXT_PLAIN_UTF8};

/// Charset applied to the `content` parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charset(&'static Encoding);

impl Default for Charset {
    fn default() -> Self {
        Self(UTF_8)
    }
}

impl Charset {
    fn parse(label: &str) -> Result<Self, DispatchError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| DispatchError::bad_request(format!("unsupported encoding '{label}'")))
    }

    pub fn name(self) -> &'static str {
        self.0.output_encoding().name()
    }

    pub fn content_type(self) -> HeaderValue {
        if self.0.output_encoding() == UTF_8 {
            return HeaderValue::from_static(TEXT_PLAIN_UTF8);
        }
        let value = format!("text/plain; charset={}", self.name().to_ascii_lowercase());
        HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(TEXT_PLAIN_UTF8))
    }

    /// Characters the charset cannot represent are an error.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, DispatchError> {
        let (bytes, _, unmappable) = self.0.encode(text);
        if unmappable {
            return Err(DispatchError::bad_request(format!(
                "content has no {} encoding",
                self.name()
            )));
        }
        Ok(bytes.into_owned())
    }
}

/// Parsed echo query parameters.
#[derive(Debug)]
pub struct EchoOptions {
    pub status: StatusCode,
    pub content: Option<String>,
    pub charset: Charset,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub delay: Duration,
}

impl Default for EchoOptions {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            content: None,
            charset: Charset::default(),
            headers: Vec::new(),
            delay: Duration::ZERO,
        }
    }
}

impl EchoOptions {
    /// Unknown parameters are ignored.
    pub fn from_query(pairs: Vec<(String, String)>) -> Result<Self, DispatchError> {
        let mut options = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "code" => options.status = parse_status(&value)?,
                "content" => options.content = Some(value),
                "encoding" => options.charset = Charset::parse(&value)?,
                "header" => options.headers.push(parse_header(&value)?),
                "delay" => options.delay = parse_delay(&value)?,
                _ => {}
            }
        }
        Ok(options)
    }
}

fn parse_status(value: &str) -> Result<StatusCode, DispatchError> {
    value
        .parse::<u16>()
        .ok()
        .filter(|code| (200..=599).contains(code))
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| DispatchError::bad_request(format!("invalid code '{value}'")))
}

fn parse_header(value: &str) -> Result<(HeaderName, HeaderValue), DispatchError> {
    let invalid = || DispatchError::bad_request(format!("invalid header '{value}'"));
    let (name, val) = value.split_once(':').ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let val = HeaderValue::from_str(val.trim()).map_err(|_| invalid())?;
    Ok((name, val))
}

/// Seconds, fractional allowed.
fn parse_delay(value: &str) -> Result<Duration, DispatchError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| DispatchError::bad_request(format!("invalid delay '{value}'")))
}

/// `max_delay` caps the `delay` parameter; longer waits are rejected.
pub async fn echo(
    request: Request<Body>,
    max_body_size: usize,
    max_delay: Duration,
) -> Result<Response, DispatchError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(request.uri())
        .map_err(|e| DispatchError::bad_request(e.body_text()))?;
    let EchoOptions {
        status,
        content,
        charset,
        headers,
        delay,
    } = EchoOptions::from_query(pairs)?;

    if delay > max_delay {
        return Err(DispatchError::bad_request(format!(
            "delay {}s exceeds the {}s limit",
            delay.as_secs_f64(),
            max_delay.as_secs()
        )));
    }

    let mut response = match content {
        Some(content) => {
            response::bytes(status, charset.content_type(), Bytes::from(charset.encode(&content)?))
        }
        None => {
            let content_type = request
                .headers()
                .get(header::CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(TEXT_PLAIN_UTF8));
            let body = read_body(request.into_body(), max_body_size).await?;
            response::bytes(status, content_type, body)
        }
    };

    for (name, value) in headers {
        response.headers_mut().insert(name, value);
    }

    if !delay.is_zero() {
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Delaying echo response");
        tokio::time::sleep(delay).await;
    }
    Ok(response)
}
