//! Mistral chat completions adapter (text only)

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http::{build_client, error_from_response, send_error, with_timeout};
use super::{ProviderKind, TextOptions, TextProvider};
use crate::config::MistralConfig;
use crate::error::{Error, Result};
use crate::prompt::TextPrompt;

#[derive(Clone)]
pub struct MistralProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for MistralProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl MistralProvider {
    pub fn new(api_key: impl Into<String>, config: &MistralConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_client()?,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextProvider for MistralProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mistral
    }

    async fn generate_text(&self, prompt: &TextPrompt, options: &TextOptions) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !prompt.system.is_empty() {
            messages.push(json!({"role": "system", "content": prompt.system}));
        }
        messages.push(json!({"role": "user", "content": prompt.user}));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": options.max_new_tokens,
            "temperature": options.temperature,
            "top_p": options.top_p
        });

        debug!(model = %self.model, "Sending chat completion request");

        with_timeout(options.timeout_secs, async {
            let response = self
                .http_client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| send_error(ProviderKind::Mistral, e))?;

            if !response.status().is_success() {
                return Err(error_from_response(ProviderKind::Mistral, response).await);
            }

            let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
                Error::UnexpectedResponse(format!("Failed to parse response: {}", e))
            })?;

            completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| {
                    Error::UnexpectedResponse("Unexpected response format from AI service".to_string())
                })
        })
        .await
    }
}
