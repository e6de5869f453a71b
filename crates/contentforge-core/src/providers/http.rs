//! HTTP plumbing shared by the provider adapters

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use super::ProviderKind;
use crate::error::{Error, Result};

/// Retry hint when a loading model gives no estimate
const DEFAULT_RETRY_AFTER_SECS: u64 = 10;

/// Longest upstream error body carried into an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

pub(crate) fn build_client() -> Result<HttpClient> {
    HttpClient::builder()
        .user_agent(concat!("contentforge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::NetworkError)
}

/// Bound an outbound call by a wall-clock deadline
pub(crate) async fn with_timeout<T, F>(secs: u64, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(secs)),
    }
}

/// Map a transport failure from `send()`
pub(crate) fn send_error(provider: ProviderKind, error: reqwest::Error) -> Error {
    if error.is_connect() {
        warn!(provider = %provider, error = %error, "Provider unreachable");
        Error::ProviderUnavailable(error.to_string())
    } else {
        Error::NetworkError(error)
    }
}

/// Turn a non-2xx response into an error
pub(crate) async fn error_from_response(provider: ProviderKind, response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error_from_parts(provider, status, &body)
}

pub(crate) fn error_from_parts(provider: ProviderKind, status: StatusCode, body: &str) -> Error {
    if status == StatusCode::SERVICE_UNAVAILABLE && body.to_lowercase().contains("loading") {
        let retry_after = loading_estimate(body).unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Error::ModelLoading { retry_after };
    }

    let message = extract_error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });

    warn!(provider = %provider, status = status.as_u16(), "Provider returned an error");

    Error::Provider {
        provider,
        status: status.as_u16(),
        message,
    }
}

fn loading_estimate(body: &str) -> Option<u64> {
    let value: Value = serde_json::from_str(body).ok()?;
    let secs = value.get("estimated_time")?.as_f64()?;
    (secs.is_finite() && secs > 0.0).then(|| secs.ceil() as u64)
}

/// Pull a human-readable message out of an error body
fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let candidates = [
            value.get("error").and_then(Value::as_str),
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str),
            value.get("message").and_then(Value::as_str),
            value.get("detail").and_then(Value::as_str),
        ];
        if let Some(message) = candidates.into_iter().flatten().next() {
            return Some(message.to_string());
        }
    }

    Some(trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect())
}

/// Detect MIME type from image magic bytes
pub fn detect_image_mime_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP") {
        Some("image/webp")
    } else if data.starts_with(b"GIF8") {
        Some("image/gif")
    } else {
        None
    }
}

/// Content type of a response, without parameters
pub(crate) fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_lowercase())
}

/// Pick the MIME type for returned image bytes
pub(crate) fn image_mime_type(declared: Option<&str>, bytes: &[u8]) -> String {
    match declared {
        Some(ct) if ct.starts_with("image/") => ct.to_string(),
        _ => detect_image_mime_type(bytes)
            .unwrap_or("image/jpeg")
            .to_string(),
    }
}
