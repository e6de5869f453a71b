//! HuggingFace serverless inference adapter
//!
//! Text goes to an instruct model as a single `[INST]` string; images go to
//! a diffusion model which answers with raw image bytes.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::http::{
    build_client, content_type, error_from_response, image_mime_type, send_error, with_timeout,
};
use super::{GeneratedImage, ImageJob, ImageProvider, ProviderKind, TextOptions, TextProvider};
use crate::config::HuggingFaceConfig;
use crate::error::{Error, Result};
use crate::prompt::TextPrompt;

#[derive(Clone)]
pub struct HuggingFaceProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl std::fmt::Debug for HuggingFaceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceProvider")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

impl HuggingFaceProvider {
    pub fn new(api_key: impl Into<String>, config: &HuggingFaceConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_client()?,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }

    async fn post(&self, model: &str, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(self.model_url(model))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(ProviderKind::HuggingFace, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(ProviderKind::HuggingFace, response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl TextProvider for HuggingFaceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn generate_text(&self, prompt: &TextPrompt, options: &TextOptions) -> Result<String> {
        let body = json!({
            "inputs": prompt.to_instruct_format(),
            "parameters": {
                "max_new_tokens": options.max_new_tokens,
                "temperature": options.temperature,
                "top_p": options.top_p,
                "do_sample": true,
                "return_full_text": false
            }
        });

        debug!(model = %self.text_model, "Sending text generation request");

        with_timeout(options.timeout_secs, async {
            let response = self.post(&self.text_model, &body).await?;
            let value: Value = response.json().await.map_err(|e| {
                Error::UnexpectedResponse(format!("Failed to parse response: {}", e))
            })?;
            parse_generated_text(&value)
        })
        .await
    }
}

/// Accepts both `[{"generated_text": ..}]` and `{"generated_text": ..}`
fn parse_generated_text(value: &Value) -> Result<String> {
    let item = match value {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(value),
        _ => None,
    };

    item.and_then(|v| v.get("generated_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::UnexpectedResponse("Unexpected response format from AI service".to_string()))
}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn generate_image(&self, job: &ImageJob) -> Result<GeneratedImage> {
        let body = json!({
            "inputs": job.prompt,
            "parameters": {
                "guidance_scale": job.params.guidance_scale,
                "num_inference_steps": job.params.num_inference_steps,
                "width": job.params.width,
                "height": job.params.height
            }
        });

        info!(
            model = %self.image_model,
            steps = job.params.num_inference_steps,
            width = job.params.width,
            height = job.params.height,
            "Sending image generation request"
        );

        with_timeout(job.timeout_secs, async {
            let response = self.post(&self.image_model, &body).await?;
            let declared = content_type(&response);

            if declared.as_deref() == Some("application/json") {
                return Err(Error::UnexpectedResponse(
                    "Received JSON instead of image data".to_string(),
                ));
            }

            let bytes = response.bytes().await.map_err(Error::NetworkError)?;
            if bytes.is_empty() {
                return Err(Error::UnexpectedResponse(
                    "Received empty image data".to_string(),
                ));
            }

            Ok(GeneratedImage {
                mime_type: image_mime_type(declared.as_deref(), &bytes),
                bytes: bytes.to_vec(),
            })
        })
        .await
    }
}
