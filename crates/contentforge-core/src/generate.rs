//! Text and image generation requests
//!
//! Resolves the provider, checks the prompt, applies templates and tuning,
//! then makes the single outbound call.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, TextConfig};
use crate::error::{Error, Result};
use crate::prompt::{
    ImageParams, clean_generated_text, enhance_image_prompt, enhance_text_prompt, preview,
};
use crate::providers::{GeneratedImage, ImageJob, ProviderKind, ProviderRegistry, TextOptions};

const PROMPT_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextOutput {
    pub text: String,
    pub provider: ProviderKind,
    pub template: String,
}

#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub image: GeneratedImage,
    pub provider: ProviderKind,
    /// The enhanced prompt actually sent
    pub prompt: String,
    pub params: ImageParams,
}

/// Front door for generation
#[derive(Debug, Clone)]
pub struct Generator {
    registry: ProviderRegistry,
    default_text: ProviderKind,
    default_image: ProviderKind,
    text: TextConfig,
    image_timeout_secs: u64,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl Generator {
    pub fn new(registry: ProviderRegistry, config: &Config) -> Self {
        Self {
            registry,
            default_text: config.providers.default_text,
            default_image: config.providers.default_image,
            text: config.text.clone(),
            image_timeout_secs: config.image.timeout_secs,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn resolve(&self, requested: Option<&str>, default: ProviderKind) -> Result<ProviderKind> {
        match non_blank(requested) {
            None => Ok(default),
            Some(name) => ProviderKind::parse(name)
                .ok_or_else(|| Error::InvalidInput(format!("Unknown provider: {}", name))),
        }
    }

    pub async fn text(&self, request: &TextRequest) -> Result<TextOutput> {
        let kind = self.resolve(request.provider.as_deref(), self.default_text)?;
        let provider = self.registry.text(kind)?;

        let prompt = non_blank(request.prompt.as_deref())
            .ok_or_else(|| Error::InvalidInput("Valid prompt is required".to_string()))?;
        let template = non_blank(request.template.as_deref())
            .unwrap_or(&self.text.default_template)
            .to_string();

        info!(
            provider = %kind,
            template = %template,
            prompt = %preview(prompt, PROMPT_PREVIEW_CHARS),
            "Generating text"
        );

        let enhanced = enhance_text_prompt(prompt, &template);
        let raw = provider
            .generate_text(&enhanced, &TextOptions::from(&self.text))
            .await?;

        Ok(TextOutput {
            text: clean_generated_text(&raw),
            provider: kind,
            template,
        })
    }

    pub async fn image(&self, request: &ImageRequest) -> Result<ImageOutput> {
        let kind = self.resolve(request.provider.as_deref(), self.default_image)?;
        let provider = self.registry.image(kind)?;

        let prompt = non_blank(request.prompt.as_deref())
            .ok_or_else(|| Error::InvalidInput("Prompt is required".to_string()))?;
        let style = non_blank(request.style.as_deref());

        let params = ImageParams::tune(
            style,
            request.complexity.map(|c| c.round() as i64),
            request.width,
            request.height,
        );
        let enhanced = enhance_image_prompt(prompt, style, Some(params.complexity));

        info!(
            provider = %kind,
            style = style.unwrap_or("natural"),
            complexity = params.complexity,
            prompt = %preview(prompt, PROMPT_PREVIEW_CHARS),
            "Generating image"
        );

        let job = ImageJob {
            prompt: enhanced,
            params,
            timeout_secs: self.image_timeout_secs,
        };
        let image = provider.generate_image(&job).await?;

        Ok(ImageOutput {
            image,
            provider: kind,
            prompt: job.prompt,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::TextPrompt;
    use crate::providers::{ImageProvider, TextProvider};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        text_prompts: Mutex<Vec<TextPrompt>>,
        image_jobs: Mutex<Vec<ImageJob>>,
    }

    #[async_trait]
    impl TextProvider for Recorder {
        fn kind(&self) -> ProviderKind {
            ProviderKind::HuggingFace
        }

        async fn generate_text(&self, prompt: &TextPrompt, _: &TextOptions) -> Result<String> {
            self.text_prompts.lock().unwrap().push(prompt.clone());
            Ok("  Draft copy [/INST] ".to_string())
        }
    }

    #[async_trait]
    impl ImageProvider for Recorder {
        fn kind(&self) -> ProviderKind {
            ProviderKind::HuggingFace
        }

        async fn generate_image(&self, job: &ImageJob) -> Result<GeneratedImage> {
            self.image_jobs.lock().unwrap().push(job.clone());
            Ok(GeneratedImage {
                bytes: vec![0xFF, 0xD8, 0xFF],
                mime_type: "image/jpeg".to_string(),
            })
        }
    }

    fn generator(recorder: &Arc<Recorder>) -> Generator {
        let mut registry = ProviderRegistry::new();
        registry.register_text(recorder.clone());
        registry.register_image(recorder.clone());
        Generator::new(registry, &Config::default())
    }

    #[tokio::test]
    async fn test_text_applies_template_and_cleans_output() {
        let recorder = Arc::new(Recorder::default());
        let output = generator(&recorder)
            .text(&TextRequest {
                prompt: Some("Launch post".to_string()),
                template: Some("marketing".to_string()),
                provider: None,
            })
            .await
            .unwrap();

        assert_eq!(output.text, "Draft copy");
        assert_eq!(output.template, "marketing");
        let prompts = recorder.text_prompts.lock().unwrap();
        assert!(prompts[0].system.contains("persuasive"));
    }

    #[tokio::test]
    async fn test_text_defaults_template() {
        let recorder = Arc::new(Recorder::default());
        let output = generator(&recorder)
            .text(&TextRequest {
                prompt: Some("Hello".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(output.template, "content-creator");
    }

    #[tokio::test]
    async fn test_missing_credentials_checked_before_prompt() {
        let recorder = Arc::new(Recorder::default());
        let result = generator(&recorder)
            .text(&TextRequest {
                prompt: None,
                provider: Some("gemini".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(Error::MissingCredentials(ProviderKind::Gemini))));
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected() {
        let recorder = Arc::new(Recorder::default());
        let generator = generator(&recorder);

        let text = generator
            .text(&TextRequest {
                prompt: Some("   ".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(text, Err(Error::InvalidInput(ref m)) if m == "Valid prompt is required"));

        let image = generator.image(&ImageRequest::default()).await;
        assert!(matches!(image, Err(Error::InvalidInput(ref m)) if m == "Prompt is required"));
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let recorder = Arc::new(Recorder::default());
        let result = generator(&recorder)
            .text(&TextRequest {
                prompt: Some("hi".to_string()),
                provider: Some("openai".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_image_tunes_and_enhances() {
        let recorder = Arc::new(Recorder::default());
        let output = generator(&recorder)
            .image(&ImageRequest {
                prompt: Some("a lighthouse".to_string()),
                style: Some("Minimalist".to_string()),
                complexity: Some(79.6),
                width: Some(1001),
                height: None,
                provider: None,
            })
            .await
            .unwrap();

        assert_eq!(output.params.complexity, 80);
        assert_eq!(output.params.num_inference_steps, 70);
        assert_eq!(output.params.width, 1000);
        assert_eq!(
            output.prompt,
            "a lighthouse, minimalist composition, clean background, negative space, style: Minimalist, detail level: 80%"
        );
        assert!(output.image.data_url().starts_with("data:image/jpeg;base64,"));

        let jobs = recorder.image_jobs.lock().unwrap();
        assert_eq!(jobs[0].timeout_secs, 180);
    }

    #[tokio::test]
    async fn test_mistral_image_unsupported() {
        let recorder = Arc::new(Recorder::default());
        let result = generator(&recorder)
            .image(&ImageRequest {
                prompt: Some("x".to_string()),
                provider: Some("mistral".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(Error::Unsupported { .. })));
    }
}
