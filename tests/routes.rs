//! Dispatch tests driven through the full middleware stack without a socket.

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use futures_util::stream;
use serde_json::Value;

use sandbox_server::config::SandboxConfig;
use sandbox_server::http::X_REQUEST_ID;
use sandbox_server::routing::{Endpoint, Router};

mod common;

use common::{body_string, digest_authorization, get, send, test_app};

const BOUNDARY: &str = "sandbox-boundary";

fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
    let mut body = String::new();
    for (field, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(filename) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{field}\"\r\n\r\n"
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

/// A body of `count` chunks with no declared length.
fn streamed(count: usize, chunk_len: usize) -> Body {
    let chunks = (0..count).map(move |_| Ok::<_, std::io::Error>(Bytes::from(vec![b'x'; chunk_len])));
    Body::from_stream(stream::iter(chunks))
}

#[tokio::test]
async fn test_every_route_is_served() {
    let app = test_app(SandboxConfig::default());
    let table = Router::sandbox("").unwrap();

    for route in table.routes() {
        let response = get(&app, route.pattern()).await;
        let expected = match route.endpoint() {
            Endpoint::HelloWithBasicAuth | Endpoint::HelloWithDigestAuth => {
                StatusCode::UNAUTHORIZED
            }
            _ => StatusCode::OK,
        };
        assert_eq!(response.status(), expected, "route {}", route.name());
    }
}

#[tokio::test]
async fn test_hello_in_both_namespaces() {
    let app = test_app(SandboxConfig::default());

    let primary = get(&app, "/hello/").await;
    assert_eq!(primary.status(), StatusCode::OK);
    assert_eq!(
        primary.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_string(primary).await, "Hello");

    let playground = get(&app, "/playground/hello/").await;
    assert_eq!(playground.status(), StatusCode::OK);
    assert_eq!(body_string(playground).await, "Hello");
}

#[tokio::test]
async fn test_configured_greeting() {
    let mut config = SandboxConfig::default();
    config.sandbox.greeting = "Hello World".into();
    let app = test_app(config);

    assert_eq!(body_string(get(&app, "/hello/").await).await, "Hello World");
}

#[tokio::test]
async fn test_unknown_paths_are_not_found() {
    let app = test_app(SandboxConfig::default());

    for path in [
        "/nonexistent/",
        "/",
        "/playground/",
        "/playground/hello_with_digest_auth/",
        "/api/hello/",
    ] {
        let response = get(&app, path).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
    }
}

#[tokio::test]
async fn test_paths_below_a_route_match_it() {
    let app = test_app(SandboxConfig::default());

    let response = get(&app, "/hello/anything/else").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Hello");
}

#[tokio::test]
async fn test_echo_reflects_body() {
    let app = test_app(SandboxConfig::default());
    let request = Request::post("/echo/").body(Body::from("ping")).unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ping");
}

#[tokio::test]
async fn test_echo_keeps_content_type() {
    let app = test_app(SandboxConfig::default());
    let request = Request::post("/playground/echo/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"a":1}"#))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(body_string(response).await, r#"{"a":1}"#);
}

#[tokio::test]
async fn test_echo_query_options() {
    let app = test_app(SandboxConfig::default());
    let response = get(&app, "/echo/?code=201&content=hi&header=X-Test:%20yes").await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-test"], "yes");
    assert_eq!(body_string(response).await, "hi");
}

#[tokio::test]
async fn test_echo_rejects_bad_code() {
    let app = test_app(SandboxConfig::default());
    let response = get(&app, "/echo/?code=teapot").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dumpmeta_reports_request() {
    let app = test_app(SandboxConfig::default());
    let request = Request::get("/dumpmeta/?a=1&a=2&b=x")
        .header("x-custom", "value")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let meta: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(meta["method"], "GET");
    assert_eq!(meta["path"], "/dumpmeta/");
    assert_eq!(meta["query"]["a"], serde_json::json!(["1", "2"]));
    assert_eq!(meta["query"]["b"], serde_json::json!(["x"]));
    assert_eq!(meta["headers"]["x-custom"], serde_json::json!(["value"]));
}

#[tokio::test]
async fn test_dumpupload_without_files() {
    let app = test_app(SandboxConfig::default());
    let response = get(&app, "/dumpupload/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let files: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(files, serde_json::json!([]));
}

#[tokio::test]
async fn test_dumpupload_lists_files() {
    let app = test_app(SandboxConfig::default());
    let body = multipart_body(&[
        ("first", Some("a.txt"), "hello"),
        ("note", None, "not a file"),
        ("second", Some("b.bin"), "0123456789"),
    ]);
    let request = Request::post("/playground/dumpupload/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let files: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(
        files,
        serde_json::json!([
            {"field": "first", "filename": "a.txt", "size": 5},
            {"field": "second", "filename": "b.bin", "size": 10},
        ])
    );
}

#[tokio::test]
async fn test_basic_auth() {
    let app = test_app(SandboxConfig::default());

    let missing = get(&app, "/hello_with_basic_auth/").await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        missing.headers()[header::WWW_AUTHENTICATE],
        "Basic realm=\"sandbox\""
    );

    // test:wrong
    let wrong = Request::get("/hello_with_basic_auth/")
        .header(header::AUTHORIZATION, "Basic dGVzdDp3cm9uZw==")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.status(), StatusCode::UNAUTHORIZED);

    // test:12345
    let valid = Request::get("/playground/hello_with_basic_auth/")
        .header(header::AUTHORIZATION, "Basic dGVzdDoxMjM0NQ==")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, valid).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Hello");
}

#[tokio::test]
async fn test_digest_handshake() {
    let app = test_app(SandboxConfig::default());
    let uri = "/hello_with_digest_auth/";

    let first = get(&app, uri).await;
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
    let challenge = first.headers()[header::WWW_AUTHENTICATE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(challenge.starts_with("Digest realm=\"sandbox\""));
    assert!(challenge.contains("qop=\"auth\""));

    let authorization = digest_authorization(&challenge, "GET", uri, "test", "12345");
    let request = Request::get(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Hello");
}

#[tokio::test]
async fn test_digest_wrong_password() {
    let app = test_app(SandboxConfig::default());
    let uri = "/hello_with_digest_auth/";

    let first = get(&app, uri).await;
    let challenge = first.headers()[header::WWW_AUTHENTICATE]
        .to_str()
        .unwrap()
        .to_string();

    let authorization = digest_authorization(&challenge, "GET", uri, "test", "nope");
    let request = Request::get(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn test_digest_answer_for_other_method_is_rejected() {
    let app = test_app(SandboxConfig::default());
    let uri = "/hello_with_digest_auth/";

    let first = get(&app, uri).await;
    let challenge = first.headers()[header::WWW_AUTHENTICATE]
        .to_str()
        .unwrap()
        .to_string();

    let authorization = digest_authorization(&challenge, "GET", uri, "test", "12345");
    let request = Request::post(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mount_prefix() {
    let mut config = SandboxConfig::default();
    config.routing.mount_prefix = "/core".into();
    let app = test_app(config);

    let mounted = get(&app, "/core/hello/").await;
    assert_eq!(mounted.status(), StatusCode::OK);
    assert_eq!(
        get(&app, "/core/playground/echo/").await.status(),
        StatusCode::OK
    );
    assert_eq!(get(&app, "/hello/").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_header() {
    let app = test_app(SandboxConfig::default());

    let generated = get(&app, "/hello/").await;
    let id = generated.headers()[X_REQUEST_ID].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    let request = Request::get("/nonexistent/")
        .header(X_REQUEST_ID, "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = SandboxConfig::default();
    config.limits.max_body_size = 16;
    let app = test_app(config);

    let payload = "x".repeat(64);
    let request = Request::post("/echo/")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_streamed_body_over_limit_is_rejected() {
    let mut config = SandboxConfig::default();
    config.limits.max_body_size = 16;
    let app = test_app(config);

    for uri in ["/echo/", "/dumpupload/"] {
        let request = Request::post(uri).body(streamed(8, 10)).unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE, "{uri}");
    }
}

#[tokio::test]
async fn test_streamed_body_within_limit_is_echoed() {
    let app = test_app(SandboxConfig::default());
    let request = Request::post("/echo/").body(streamed(8, 10)).unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "x".repeat(80));
}

#[tokio::test]
async fn test_echo_empty_body() {
    let app = test_app(SandboxConfig::default());
    let request = Request::post("/echo/").body(Body::empty()).unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_echo_returns_arbitrary_bytes() {
    let app = test_app(SandboxConfig::default());
    let payload: Vec<u8> = (0..=255u8).collect();
    let request = Request::post("/playground/echo/")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(payload.clone()))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.to_vec(), payload);
}

#[tokio::test]
async fn test_echo_gb2312_content() {
    let app = test_app(SandboxConfig::default());
    let response = get(&app, "/echo/?content=%E4%BD%A0%E5%A5%BD&encoding=gb2312").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=gbk"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.to_vec(), vec![0xC4, 0xE3, 0xBA, 0xC3]);
    let (decoded, _, had_errors) = encoding_rs::GBK.decode(&body);
    assert!(!had_errors);
    assert_eq!(decoded, "你好");
}

#[tokio::test]
async fn test_echo_unknown_encoding_is_rejected() {
    let app = test_app(SandboxConfig::default());
    let response = get(&app, "/echo/?content=hi&encoding=klingon").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn test_echo_delay() {
    let app = test_app(SandboxConfig::default());
    let start = tokio::time::Instant::now();

    let response = get(&app, "/echo/?delay=2&content=hello").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(body_string(response).await, "hello");
}

#[tokio::test]
async fn test_echo_delay_past_request_timeout_is_rejected() {
    let mut config = SandboxConfig::default();
    config.timeouts.request_secs = 5;
    let app = test_app(config);

    let response = get(&app, "/echo/?delay=6").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_trailing_slash_redirects() {
    let app = test_app(SandboxConfig::default());

    for (uri, location) in [
        ("/echo?code=500", "/echo/?code=500"),
        ("/hello_with_basic_auth", "/hello_with_basic_auth/"),
        ("/hello_with_digest_auth", "/hello_with_digest_auth/"),
        ("/playground/hello", "/playground/hello/"),
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT, "{uri}");
        assert_eq!(response.headers()[header::LOCATION], location, "{uri}");
    }

    let post = Request::post("/echo").body(Body::from("ping")).unwrap();
    assert_eq!(send(&app, post).await.status(), StatusCode::PERMANENT_REDIRECT);

    for uri in ["/nonexistent", "/playground/hello_with_digest_auth"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert!(!response.headers().contains_key(header::LOCATION));
    }
}

#[tokio::test]
async fn test_redirect_respects_mount_prefix() {
    let mut config = SandboxConfig::default();
    config.routing.mount_prefix = "/core".into();
    let app = test_app(config);

    let response = get(&app, "/core/echo?code=500").await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/core/echo/?code=500");
}
