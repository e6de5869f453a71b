//! Prompt templates and enhancement
//!
//! Turns a user prompt plus template/style selections into what the
//! inference providers actually receive:
//! - Text: a system instruction chosen by template, wrapped for instruct models
//! - Image: a style/detail suffix and tuned diffusion parameters

pub mod image;
pub mod text;

pub use image::{
    IMAGE_TEMPLATES, ImageParams, ImageTemplate, StyleProfile, enhance_image_prompt,
    snap_dimension,
};
pub use text::{
    TEXT_TEMPLATES, TextPrompt, TextTemplate, clean_generated_text, enhance_text_prompt,
};

use serde::Serialize;

/// A named prompt skeleton with `[slot]` placeholders
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Preset {
    pub key: &'static str,
    pub prompt: &'static str,
}

/// Both template families, as served to clients
#[derive(Debug, Clone, Serialize)]
pub struct TemplateCatalog {
    pub text: &'static [TextTemplate],
    pub image: &'static [ImageTemplate],
}

/// The full template catalog
pub fn catalog() -> TemplateCatalog {
    TemplateCatalog {
        text: TEXT_TEMPLATES,
        image: IMAGE_TEMPLATES,
    }
}

/// Shorten a prompt for log lines
pub fn preview(prompt: &str, max_chars: usize) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_catalog_serializes() {
        let json = serde_json::to_value(catalog()).unwrap();
        assert_eq!(json["text"].as_array().unwrap().len(), 4);
        assert_eq!(json["image"][0]["key"], "social-media");
        assert!(json["image"][0]["styles"].as_array().unwrap().len() >= 1);
    }
}
