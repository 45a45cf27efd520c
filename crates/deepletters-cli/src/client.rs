use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::letters::{KeyWrapper, LetterError};

/// HTTP client for the key wrapping endpoints.
pub struct ApiClient {
    pub base_url: String,
}

#[derive(Serialize)]
struct WrapRequest<'a> {
    key: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WrapResponse {
    wrapped_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnwrapRequest<'a> {
    wrapped_key: &'a str,
}

#[derive(Deserialize)]
struct UnwrapResponse {
    key: String,
}

/// API error response.
#[derive(Deserialize)]
struct ApiErrorResponse {
    error: String,
}

impl ApiClient {
    fn agent(&self) -> ureq::Agent {
        ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_global(Some(Duration::from_secs(30)))
                .http_status_as_error(false)
                .build(),
        )
    }

    fn handle_ureq_error(&self, err: ureq::Error) -> String {
        let msg = err.to_string();
        if msg.contains("tls") || msg.contains("certificate") || msg.contains("ssl") {
            format!("TLS error connecting to {}: {}", self.base_url, msg)
        } else if msg.contains("dns") || msg.contains("resolve") || msg.contains("No such host") {
            format!("cannot resolve host {}: {}", self.base_url, msg)
        } else if msg.contains("timed out") || msg.contains("timeout") {
            format!("connection to {} timed out", self.base_url)
        } else if msg.contains("Connection refused") || msg.contains("connection refused") {
            format!("connection refused by {}", self.base_url)
        } else {
            format!("HTTP request failed: {}", msg)
        }
    }

    /// POST a JSON body and return the status with the raw response text.
    fn post_json(&self, path: &str, body: &[u8]) -> Result<(u16, String), LetterError> {
        let endpoint = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let resp = self
            .agent()
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .send(body)
            .map_err(|e| LetterError::Remote(self.handle_ureq_error(e)))?;

        let status = resp.status().as_u16();
        let text = resp
            .into_body()
            .read_to_string()
            .map_err(|e| LetterError::Remote(format!("read response: {}", e)))?;
        Ok((status, text))
    }
}

/// Friendly fallback error message for HTTP status codes when the server
/// provides no JSON error body.
fn format_status_error(status: u16) -> String {
    let desc = match status {
        404 => "key service not found at this URL",
        405 => "method not allowed",
        429 => "rate limit exceeded; please try again in a few seconds",
        500 | 502 | 503 => "server is temporarily unavailable; please try again later",
        _ => "",
    };
    if desc.is_empty() {
        format!("server error ({})", status)
    } else {
        format!("server error ({}): {}", status, desc)
    }
}

fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .map(|r| r.error)
        .filter(|e| !e.is_empty())
}

/// Format an API error from a JSON body and status code.
fn format_api_error(status: u16, body: &str) -> String {
    match api_error_message(body) {
        Some(msg) => format!("server error ({}): {}", status, msg),
        None => format_status_error(status),
    }
}

impl KeyWrapper for ApiClient {
    fn wrap(&self, content_key: &str) -> Result<String, LetterError> {
        let body = serde_json::to_vec(&WrapRequest { key: content_key })
            .map_err(|e| LetterError::Remote(format!("marshal request: {}", e)))?;
        let (status, text) = self.post_json("/wrap", &body)?;

        match status {
            200 => {
                let resp: WrapResponse = serde_json::from_str(&text)
                    .map_err(|e| LetterError::Remote(format!("decode response: {}", e)))?;
                Ok(resp.wrapped_key)
            }
            400 => match api_error_message(&text) {
                Some(msg) if msg == "invalid key" || msg == "missing key" => {
                    Err(LetterError::KeyImport(msg))
                }
                _ => Err(LetterError::Remote(format_api_error(status, &text))),
            },
            _ => Err(LetterError::Remote(format_api_error(status, &text))),
        }
    }

    fn unwrap(&self, wrapped_key: &str) -> Result<String, LetterError> {
        let body = serde_json::to_vec(&UnwrapRequest { wrapped_key })
            .map_err(|e| LetterError::Remote(format!("marshal request: {}", e)))?;
        let (status, text) = self.post_json("/unwrap", &body)?;

        match status {
            200 => {
                let resp: UnwrapResponse = serde_json::from_str(&text)
                    .map_err(|e| LetterError::Remote(format!("decode response: {}", e)))?;
                Ok(resp.key)
            }
            400 => Err(LetterError::UnwrapFailed),
            _ => Err(LetterError::Remote(format_api_error(status, &text))),
        }
    }
}
