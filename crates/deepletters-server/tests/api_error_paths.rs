mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use deepletters_server::http::MAX_BODY_BYTES;
use helpers::{json_request, response_json, send, test_app, test_config};
use serde_json::json;

async fn expect_error(app: &axum::Router, req: Request<Body>, status: StatusCode, msg: &str) {
    let resp = send(app, req).await;
    assert_eq!(resp.status(), status);
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-store",
        "error responses must not be cached"
    );
    assert_eq!(response_json(resp).await, json!({ "error": msg }));
}

#[tokio::test]
async fn wrap_missing_or_empty_key() {
    let app = test_app(test_config());
    for body in [
        json!({}),
        json!({ "key": "" }),
        json!({ "key": "   " }),
        json!({ "key": null }),
        json!({ "wrappedKey": "x" }),
    ] {
        expect_error(
            &app,
            json_request("POST", "/wrap", body.to_string()),
            StatusCode::BAD_REQUEST,
            "missing key",
        )
        .await;
    }
}

#[tokio::test]
async fn wrap_invalid_key() {
    let app = test_app(test_config());
    let short = STANDARD.encode([9u8; 16]);
    for key in ["not base64 at all!", short.as_str()] {
        expect_error(
            &app,
            json_request("POST", "/wrap", json!({ "key": key }).to_string()),
            StatusCode::BAD_REQUEST,
            "invalid key",
        )
        .await;
    }
}

#[tokio::test]
async fn unwrap_missing_or_empty_wrapped_key() {
    let app = test_app(test_config());
    for body in [json!({}), json!({ "wrappedKey": "" }), json!({ "key": "x" })] {
        expect_error(
            &app,
            json_request("POST", "/unwrap", body.to_string()),
            StatusCode::BAD_REQUEST,
            "missing wrappedKey",
        )
        .await;
    }
}

#[tokio::test]
async fn unwrap_failures_look_the_same() {
    let app = test_app(test_config());
    let too_short = STANDARD.encode([0u8; 5]);
    let random_envelope = STANDARD.encode([7u8; 60]);
    for wrapped in ["%%%", too_short.as_str(), random_envelope.as_str()] {
        expect_error(
            &app,
            json_request("POST", "/unwrap", json!({ "wrappedKey": wrapped }).to_string()),
            StatusCode::BAD_REQUEST,
            "failed to unwrap key",
        )
        .await;
    }
}

#[tokio::test]
async fn wrong_field_types_and_bad_json() {
    let app = test_app(test_config());
    expect_error(
        &app,
        json_request("POST", "/wrap", r#"{"key":42}"#),
        StatusCode::BAD_REQUEST,
        "invalid json field type",
    )
    .await;
    expect_error(
        &app,
        json_request("POST", "/unwrap", "{not json"),
        StatusCode::BAD_REQUEST,
        "invalid json",
    )
    .await;
}

#[tokio::test]
async fn non_json_content_type_rejected() {
    let app = test_app(test_config());
    let req = Request::builder()
        .method("POST")
        .uri("/wrap")
        .header("content-type", "text/plain")
        .body(Body::from(r#"{"key":"x"}"#))
        .expect("request");
    expect_error(
        &app,
        req,
        StatusCode::BAD_REQUEST,
        "content-type must be application/json",
    )
    .await;
}

#[tokio::test]
async fn oversized_body_rejected() {
    let app = test_app(test_config());
    let body = json!({ "key": "a".repeat(MAX_BODY_BYTES) }).to_string();
    expect_error(
        &app,
        json_request("POST", "/wrap", body),
        StatusCode::BAD_REQUEST,
        &format!("request body exceeds {} bytes", MAX_BODY_BYTES),
    )
    .await;
}

#[tokio::test]
async fn non_post_methods_rejected() {
    let app = test_app(test_config());
    for (method, path) in [
        ("GET", "/wrap"),
        ("PUT", "/unwrap"),
        ("DELETE", "/api/wrap-key"),
        ("GET", "/api/unwrap-key"),
    ] {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .expect("request");
        expect_error(
            &app,
            req,
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed",
        )
        .await;
    }
}

#[tokio::test]
async fn unknown_path_is_json_404() {
    let app = test_app(test_config());
    let req = Request::builder()
        .method("GET")
        .uri("/nope")
        .body(Body::empty())
        .expect("request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    assert_eq!(response_json(resp).await, json!({ "error": "not found" }));
}
