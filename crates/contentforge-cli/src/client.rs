//! HTTP client for a running ContentForge server

use async_trait::async_trait;
use contentforge_core::Error;
use contentforge_core::auth::{Session, SessionRefresher, SignUpOutcome};
use contentforge_core::generate::{ImageRequest, TextRequest};
use contentforge_core::storage::{Generation, GenerationKind, NewGeneration};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

type Result<T> = contentforge_core::Result<T>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default, rename = "retryAfter")]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageBody {
    image_url: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http_client: HttpClient,
    base_url: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("signed_in", &self.access_token.is_some())
            .finish()
    }
}

/// Turn a server error body into a core error
fn api_error(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| body.trim().to_string());

    if let Some(retry_after) = parsed.as_ref().and_then(|b| b.retry_after) {
        return Error::ModelLoading { retry_after };
    }

    match status {
        StatusCode::BAD_REQUEST => Error::InvalidInput(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        _ => Error::Other(format!("{} (HTTP {})", message, status.as_u16())),
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = HttpClient::builder()
            .user_agent(concat!("contentforge-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::NetworkError)?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_connect() {
                Error::Other(format!(
                    "Could not reach the ContentForge server at {}",
                    self.base_url
                ))
            } else {
                Error::NetworkError(e)
            }
        })?;
        debug!(status = response.status().as_u16(), url = %response.url(), "Server responded");
        Ok(response)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        check(self.send_raw(request).await?).await
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| Error::UnexpectedResponse(format!("Unexpected server response: {}", e)))
    }

    pub async fn generate_text(&self, request: &TextRequest) -> Result<String> {
        let body: TextBody = self
            .json(self.http_client.post(self.url("/api/generate-text")).json(request))
            .await?;
        Ok(body.text)
    }

    /// Returns the image as a data URL
    pub async fn generate_image(&self, request: &ImageRequest) -> Result<String> {
        let body: ImageBody = self
            .json(self.http_client.post(self.url("/api/generate-image")).json(request))
            .await?;
        Ok(body.image_url)
    }

    pub async fn save_generation(&self, new: &NewGeneration) -> Result<Generation> {
        self.json(self.http_client.post(self.url("/api/generations")).json(new))
            .await
    }

    pub async fn list_generations(
        &self,
        kind: Option<GenerationKind>,
        limit: Option<u32>,
    ) -> Result<Vec<Generation>> {
        let mut params = Vec::new();
        if let Some(kind) = kind {
            params.push(("type", kind.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        self.json(self.http_client.get(self.url("/api/generations")).query(&params))
            .await
    }

    pub async fn get_generation(&self, id: &str) -> Result<Generation> {
        let request = self
            .http_client
            .get(self.url(&format!("/api/generations/{}", id)));
        let response = found(self.send_raw(request).await?, id).await?;
        response
            .json()
            .await
            .map_err(|e| Error::UnexpectedResponse(format!("Unexpected server response: {}", e)))
    }

    pub async fn delete_generation(&self, id: &str) -> Result<()> {
        let request = self
            .http_client
            .delete(self.url(&format!("/api/generations/{}", id)));
        found(self.send_raw(request).await?, id).await?;
        Ok(())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({"email": email, "password": password});
        self.json(self.http_client.post(self.url("/api/auth/sign-in")).json(&body))
            .await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let body = json!({"email": email, "password": password});
        let value: Value = self
            .json(self.http_client.post(self.url("/api/auth/sign-up")).json(&body))
            .await?;

        if value.get("accessToken").is_some() {
            let session = serde_json::from_value(value)
                .map_err(|e| Error::UnexpectedResponse(format!("Invalid session: {}", e)))?;
            return Ok(SignUpOutcome::Session(session));
        }
        let user = serde_json::from_value(value.get("user").cloned().unwrap_or(Value::Null))
            .map_err(|e| Error::UnexpectedResponse(format!("Invalid user: {}", e)))?;
        Ok(SignUpOutcome::ConfirmationRequired {
            confirmation_required: true,
            user,
        })
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.send(self.http_client.post(self.url("/api/auth/sign-out")))
            .await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

/// Like [`check`], with a 404 naming the record
async fn found(response: Response, id: &str) -> Result<Response> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(Error::GenerationNotFound(id.to_string()));
    }
    check(response).await
}

#[async_trait]
impl SessionRefresher for ApiClient {
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let body = json!({"refreshToken": refresh_token});
        self.json(self.http_client.post(self.url("/api/auth/refresh")).json(&body))
            .await
    }
}
