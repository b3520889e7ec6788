//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use sandbox_server::auth::digest::{md5_hex, parse_params, NonceIssuer};
use sandbox_server::auth::Authenticator;
use sandbox_server::config::SandboxConfig;
use sandbox_server::http::{AppState, HttpServer, ServerError};
use sandbox_server::lifecycle::Shutdown;

pub const NONCE_SECRET: &str = "integration-secret";

fn server(config: SandboxConfig) -> HttpServer {
    let nonces = NonceIssuer::with_secret(NONCE_SECRET, config.auth.nonce_ttl_secs);
    let auth = Authenticator::with_nonces(&config.auth, nonces);
    let state = AppState::with_auth(&config, auth).unwrap();
    HttpServer::with_state(config, state)
}

/// The fully layered router for `config`, with a fixed nonce secret.
pub fn test_app(config: SandboxConfig) -> axum::Router {
    server(config).app()
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &axum::Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Bind an ephemeral port and serve `config` on it.
pub async fn spawn_server(
    config: SandboxConfig,
) -> (SocketAddr, Shutdown, JoinHandle<Result<(), ServerError>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(server(config).run(listener, receiver));
    (addr, shutdown, handle)
}

/// Answer a Digest `challenge` the way a browser would.
pub fn digest_authorization(
    challenge: &str,
    method: &str,
    uri: &str,
    username: &str,
    password: &str,
) -> String {
    let params = parse_params(challenge).unwrap();
    let realm = &params["realm"];
    let nonce = &params["nonce"];
    let opaque = &params["opaque"];
    let nc = "00000001";
    let cnonce = "0a4f113b";

    let ha1 = md5_hex(&[username, realm, password]);
    let ha2 = md5_hex(&[method, uri]);
    let response = md5_hex(&[&ha1, nonce, nc, cnonce, "auth", &ha2]);

    format!(
        "Digest username=\"{username}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", \
         qop=auth, nc={nc}, cnonce=\"{cnonce}\", response=\"{response}\", \
         opaque=\"{opaque}\", algorithm=MD5"
    )
}
