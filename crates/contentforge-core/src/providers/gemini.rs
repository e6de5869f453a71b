//! Google Gemini `generateContent` adapter

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::http::{build_client, error_from_response, image_mime_type, send_error, with_timeout};
use super::{GeneratedImage, ImageJob, ImageProvider, ProviderKind, TextOptions, TextProvider};
use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::prompt::TextPrompt;

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_client()?,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(ProviderKind::Gemini, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(ProviderKind::Gemini, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| Error::UnexpectedResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate_text(&self, prompt: &TextPrompt, options: &TextOptions) -> Result<String> {
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt.user}]}],
            "generationConfig": {
                "maxOutputTokens": options.max_new_tokens,
                "temperature": options.temperature,
                "topP": options.top_p
            }
        });
        if !prompt.system.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": prompt.system}]});
        }

        debug!(model = %self.text_model, "Sending text generation request");

        with_timeout(options.timeout_secs, async {
            let response = self.generate_content(&self.text_model, &body).await?;
            let text: String = response.parts().filter_map(|p| p.text.as_deref()).collect();
            if text.is_empty() {
                return Err(Error::UnexpectedResponse(
                    "Unexpected response format from AI service".to_string(),
                ));
            }
            Ok(text)
        })
        .await
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate_image(&self, job: &ImageJob) -> Result<GeneratedImage> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": job.prompt}]}],
            "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]}
        });

        debug!(model = %self.image_model, "Sending image generation request");

        with_timeout(job.timeout_secs, async {
            let response = self.generate_content(&self.image_model, &body).await?;
            let inline = response
                .parts()
                .find_map(|p| p.inline_data.as_ref())
                .ok_or_else(|| {
                    Error::UnexpectedResponse("No image data found in response".to_string())
                })?;

            let bytes = BASE64
                .decode(inline.data.trim())
                .map_err(|e| Error::UnexpectedResponse(format!("Invalid base64: {}", e)))?;
            if bytes.is_empty() {
                return Err(Error::UnexpectedResponse(
                    "Received empty image data".to_string(),
                ));
            }

            Ok(GeneratedImage {
                mime_type: image_mime_type(inline.mime_type.as_deref(), &bytes),
                bytes,
            })
        })
        .await
    }
}
