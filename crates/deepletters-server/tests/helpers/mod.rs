#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use deepletters_core::{ContentKey, KeyWrapService};
use deepletters_server::config::Config;
use deepletters_server::http::{build_router, AppState};
use tower::ServiceExt;

/// Standard base64 of the bytes 0x00..=0x1f.
pub const TEST_WRAPPING_KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

pub fn test_config() -> Config {
    Config {
        env: "test".into(),
        listen_addr: "127.0.0.1:0".into(),
        log_level: "error".into(),
        wrapping_key: TEST_WRAPPING_KEY.into(),
    }
}

pub fn test_app(cfg: Config) -> axum::Router {
    let state = AppState::from_config(cfg).expect("app state");
    build_router(Arc::new(state))
}

pub fn test_app_with_master(master: [u8; 32]) -> axum::Router {
    let key = ContentKey::from_bytes(&master).expect("master key");
    let state = AppState::new(KeyWrapService::new(key));
    build_router(Arc::new(state))
}

pub fn json_request(method: &str, uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .expect("request")
}

pub async fn send(app: &axum::Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.expect("response")
}

pub async fn response_body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub async fn response_json(resp: Response) -> serde_json::Value {
    serde_json::from_str(&response_body_text(resp).await).expect("json body")
}
