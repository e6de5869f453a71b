//! Inference providers
//!
//! Each provider is a thin HTTP adapter. Prompts arrive already enhanced;
//! the adapters only shape the request body, enforce the timeout and map
//! upstream failures onto [`Error`](crate::Error).

mod http;
pub mod gemini;
pub mod huggingface;
pub mod mistral;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::config::{Credentials, ProvidersConfig, TextConfig};
use crate::error::{Error, Result};
use crate::prompt::{ImageParams, TextPrompt};

pub use gemini::GeminiProvider;
pub use http::detect_image_mime_type;
pub use huggingface::HuggingFaceProvider;
pub use mistral::MistralProvider;

/// Supported inference backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    HuggingFace,
    Gemini,
    Mistral,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::HuggingFace, Self::Gemini, Self::Mistral];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Some(Self::HuggingFace),
            "gemini" => Some(Self::Gemini),
            "mistral" => Some(Self::Mistral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::Gemini => "gemini",
            Self::Mistral => "mistral",
        }
    }

    /// Environment variable holding this provider's key
    pub fn credential_env(&self) -> &'static str {
        match self {
            Self::HuggingFace => "HF_TOKEN",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Mistral => "MISTRAL_API_KEY",
        }
    }

    pub fn supports_images(&self) -> bool {
        !matches!(self, Self::Mistral)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling options for text generation
#[derive(Debug, Clone)]
pub struct TextOptions {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl From<&TextConfig> for TextOptions {
    fn from(config: &TextConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            timeout_secs: config.timeout_secs,
        }
    }
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::from(&TextConfig::default())
    }
}

/// An enhanced image prompt with its tuned parameters
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub prompt: String,
    pub params: ImageParams,
    pub timeout_secs: u64,
}

/// Raw image bytes returned by a provider
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl GeneratedImage {
    /// Encode as a `data:` URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn generate_text(&self, prompt: &TextPrompt, options: &TextOptions) -> Result<String>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn generate_image(&self, job: &ImageJob) -> Result<GeneratedImage>;
}

/// Providers available to this process, keyed by kind
///
/// Only providers with credentials are registered; asking for any other
/// kind yields [`Error::MissingCredentials`].
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    text: HashMap<ProviderKind, Arc<dyn TextProvider>>,
    image: HashMap<ProviderKind, Arc<dyn ImageProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("text", &self.text.keys().collect::<Vec<_>>())
            .field("image", &self.image.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every provider whose credential is present
    pub fn from_config(config: &ProvidersConfig, credentials: &Credentials) -> Result<Self> {
        let mut registry = Self::new();

        if let Some(key) = credentials.api_key(ProviderKind::HuggingFace) {
            let provider = Arc::new(HuggingFaceProvider::new(key, &config.huggingface)?);
            registry.register_text(provider.clone());
            registry.register_image(provider);
        }
        if let Some(key) = credentials.api_key(ProviderKind::Gemini) {
            let provider = Arc::new(GeminiProvider::new(key, &config.gemini)?);
            registry.register_text(provider.clone());
            registry.register_image(provider);
        }
        if let Some(key) = credentials.api_key(ProviderKind::Mistral) {
            registry.register_text(Arc::new(MistralProvider::new(key, &config.mistral)?));
        }

        tracing::debug!(registry = ?registry, "Providers registered");
        Ok(registry)
    }

    pub fn register_text(&mut self, provider: Arc<dyn TextProvider>) {
        self.text.insert(provider.kind(), provider);
    }

    pub fn register_image(&mut self, provider: Arc<dyn ImageProvider>) {
        self.image.insert(provider.kind(), provider);
    }

    pub fn text(&self, kind: ProviderKind) -> Result<Arc<dyn TextProvider>> {
        self.text
            .get(&kind)
            .cloned()
            .ok_or(Error::MissingCredentials(kind))
    }

    pub fn image(&self, kind: ProviderKind) -> Result<Arc<dyn ImageProvider>> {
        if !kind.supports_images() {
            return Err(Error::Unsupported {
                provider: kind,
                operation: "image generation",
            });
        }
        self.image
            .get(&kind)
            .cloned()
            .ok_or(Error::MissingCredentials(kind))
    }

    /// Kinds that can currently serve text requests
    pub fn text_kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.text.contains_key(k))
            .collect()
    }

    /// Kinds that can currently serve image requests
    pub fn image_kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.image.contains_key(k))
            .collect()
    }
}
