use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use chrono::Utc;
use deepletters_core::{KeyWrapService, KeyWrapper, LetterError};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};
use zeroize::Zeroize;

use crate::config::{Config, ConfigError};

/// Upper bound on wrap/unwrap request bodies.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub wrapper: Arc<KeyWrapService>,
}

impl AppState {
    pub fn new(wrapper: KeyWrapService) -> Self {
        Self {
            wrapper: Arc::new(wrapper),
        }
    }

    /// Consumes the config; the wrapping key text is wiped once imported.
    pub fn from_config(mut cfg: Config) -> Result<Self, ConfigError> {
        let wrapper = cfg.wrap_service();
        cfg.wrapping_key.zeroize();
        Ok(Self::new(wrapper?))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct WrapRequest {
    #[serde(default)]
    key: Option<String>,
}

#[derive(Serialize)]
struct WrapResponse {
    #[serde(rename = "wrappedKey")]
    wrapped_key: String,
}

#[derive(Deserialize)]
struct UnwrapRequest {
    #[serde(default, rename = "wrappedKey")]
    wrapped_key: Option<String>,
}

#[derive(Serialize)]
struct UnwrapResponse {
    key: String,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    time: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handle_healthz))
        .route("/wrap", any(handle_wrap_entry))
        .route("/unwrap", any(handle_unwrap_entry))
        .route("/api/wrap-key", any(handle_wrap_entry))
        .route("/api/unwrap-key", any(handle_unwrap_entry))
        .fallback(handle_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(request_middleware))
        .with_state(state)
}

fn handle_panic(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    internal_server_error()
}

async fn request_middleware(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(generate_request_id);

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let mut resp = next.run(req).await;

    insert_header(resp.headers_mut(), "x-request-id", &request_id);
    insert_header(resp.headers_mut(), "x-content-type-options", "nosniff");
    insert_header(resp.headers_mut(), "referrer-policy", "no-referrer");
    insert_header(resp.headers_mut(), "x-frame-options", "DENY");

    let bytes = response_bytes(&resp);
    let status = resp.status().as_u16();

    info!(
        method = %method,
        path = %path,
        status = status,
        bytes = bytes,
        duration_ms = started.elapsed().as_millis() as u64,
        request_id = %request_id,
        "request"
    );

    resp
}

fn response_bytes(resp: &Response) -> usize {
    resp.headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0)
}

fn generate_request_id() -> String {
    use ring::rand::{SecureRandom, SystemRandom};

    let rng = SystemRandom::new();
    let mut bytes = [0u8; 16];
    if rng.fill(&mut bytes).is_err() {
        return "00000000000000000000000000000000".to_string();
    }
    hex::encode(bytes)
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
        headers.insert(name, value);
    }
}

fn add_cache_control_if_missing(headers: &mut HeaderMap) {
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
}

fn json_response<T: Serialize>(status: StatusCode, payload: T) -> Response {
    let mut resp = (status, Json(payload)).into_response();
    add_cache_control_if_missing(resp.headers_mut());
    resp
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    json_response(status, ErrorResponse { error: msg.into() })
}

fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

fn bad_request(msg: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

fn internal_server_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

async fn read_json_body<T: for<'de> Deserialize<'de>>(
    req: Request,
    max_bytes: usize,
    too_large_msg: Option<String>,
) -> Result<T, Response> {
    if !is_json_content_type(req.headers()) {
        return Err(bad_request("content-type must be application/json"));
    }

    let body = to_bytes(req.into_body(), max_bytes).await.map_err(|_| {
        if let Some(msg) = too_large_msg {
            bad_request(msg)
        } else {
            bad_request("invalid request body")
        }
    })?;

    serde_json::from_slice::<T>(&body).map_err(map_decode_error)
}

fn map_decode_error(err: serde_json::Error) -> Response {
    if err.is_data() {
        bad_request("invalid json field type")
    } else {
        bad_request("invalid json")
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn handle_wrap_entry(State(state): State<Arc<AppState>>, req: Request) -> Response {
    if req.method() != Method::POST {
        return method_not_allowed();
    }

    let payload: WrapRequest = match read_json_body(
        req,
        MAX_BODY_BYTES,
        Some(format!("request body exceeds {} bytes", MAX_BODY_BYTES)),
    )
    .await
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(key) = present(payload.key) else {
        return bad_request("missing key");
    };

    match state.wrapper.wrap(&key) {
        Ok(wrapped_key) => json_response(StatusCode::OK, WrapResponse { wrapped_key }),
        Err(LetterError::KeyImport(_)) => {
            warn!(kind = "invalid_key", "wrap rejected");
            bad_request("invalid key")
        }
        Err(err) => {
            error!(err = %err, "wrap failed");
            internal_server_error()
        }
    }
}

pub async fn handle_unwrap_entry(State(state): State<Arc<AppState>>, req: Request) -> Response {
    if req.method() != Method::POST {
        return method_not_allowed();
    }

    let payload: UnwrapRequest = match read_json_body(
        req,
        MAX_BODY_BYTES,
        Some(format!("request body exceeds {} bytes", MAX_BODY_BYTES)),
    )
    .await
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(wrapped_key) = present(payload.wrapped_key) else {
        return bad_request("missing wrappedKey");
    };

    match state.wrapper.unwrap(&wrapped_key) {
        Ok(key) => json_response(StatusCode::OK, UnwrapResponse { key }),
        Err(_) => {
            warn!(kind = "unwrap_failed", "unwrap rejected");
            bad_request("failed to unwrap key")
        }
    }
}

pub async fn handle_healthz() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            ok: true,
            time: Utc::now().to_rfc3339(),
        },
    )
}

async fn handle_not_found() -> Response {
    not_found()
}

pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr, std::net::AddrParseError> {
    if addr.starts_with(':') {
        return format!("0.0.0.0{addr}").parse();
    }
    addr.parse()
}
