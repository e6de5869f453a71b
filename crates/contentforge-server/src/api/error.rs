//! Mapping from core errors to HTTP responses

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use contentforge_core::Error;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    /// The request itself could not be read
    BadRequest(String),
    /// Body refused before parsing, with its own status
    Rejected(StatusCode, String),
    /// No valid bearer token on a protected route
    Unauthenticated,
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Core(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), reason = %rejection.body_text(), "Rejected request body");
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self::Rejected(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type must be application/json".to_string(),
            ),
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => Self::Rejected(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large".to_string(),
            ),
            _ => Self::BadRequest("Invalid request body: Could not parse JSON".to_string()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

/// Status and client-facing message for a core error
fn classify(e: &Error) -> (StatusCode, String) {
    match e {
        Error::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
        Error::Unsupported { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
        Error::GenerationNotFound(_) => (StatusCode::NOT_FOUND, "Generation not found".to_string()),
        Error::MissingCredentials(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error: API key not found".to_string(),
        ),
        Error::ModelLoading { .. } => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        Error::ProviderUnavailable(_) | Error::NetworkError(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Failed to connect to AI service".to_string(),
        ),
        Error::Timeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "Request timed out. Please try again.".to_string(),
        ),
        Error::Provider { status, .. } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            e.to_string(),
        ),
        Error::UnexpectedResponse(message) => {
            (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
        }
        Error::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
        Error::AuthError(message) => (StatusCode::BAD_REQUEST, message.clone()),
        Error::AuthUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Failed to connect to auth service".to_string(),
        ),
        Error::DatabaseError(_) | Error::StorageError(_) | Error::Io(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to access storage".to_string(),
        ),
        Error::ConfigError(_) | Error::Other(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
            }
            ApiError::Rejected(status, message) => {
                (status, Json(json!({"error": message}))).into_response()
            }
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Authentication required"})),
            )
                .into_response(),
            ApiError::Core(e) => {
                let (status, message) = classify(&e);
                if status.is_server_error() {
                    error!(code = e.code(), error = %e, "Request failed");
                } else {
                    warn!(code = e.code(), error = %e, "Request rejected");
                }

                let mut body = json!({"error": message});
                let retry_after = e.retry_after();
                if let Some(secs) = retry_after {
                    body["retryAfter"] = json!(secs);
                }

                let mut response = (status, Json(body)).into_response();
                if let Some(secs) = retry_after {
                    if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                        response.headers_mut().insert(RETRY_AFTER, value);
                    }
                }
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use contentforge_core::providers::ProviderKind;
    use serde_json::Value;

    async fn render(e: Error) -> (StatusCode, Value) {
        let response = ApiError::from(e).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_model_loading_carries_retry_after() {
        let response = ApiError::from(Error::ModelLoading { retry_after: 43 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "43");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryAfter"], 43);
        assert!(body["error"].as_str().unwrap().contains("43 seconds"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let (status, body) = render(Error::MissingCredentials(ProviderKind::HuggingFace)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Server configuration error: API key not found");

        let (status, body) = render(Error::InvalidInput("Prompt is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Prompt is required");
        assert!(body.get("retryAfter").is_none());

        let (status, _) = render(Error::Timeout(60)).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        let (status, body) = render(Error::ProviderUnavailable("refused".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Failed to connect to AI service");

        let (status, _) = render(Error::GenerationNotFound("g1".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = render(Error::StorageError("relation missing".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to access storage");

        let (status, body) = render(Error::AuthUnavailable("connection refused".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Failed to connect to auth service");
    }

    #[tokio::test]
    async fn test_upstream_status_passes_through() {
        let (status, body) = render(Error::Provider {
            provider: ProviderKind::Mistral,
            status: 429,
            message: "Rate limit exceeded".into(),
        })
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "mistral API error (429): Rate limit exceeded");
    }
}
