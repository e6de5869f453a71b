//! Image templates, style modifiers and diffusion parameter tuning

use serde::{Deserialize, Serialize};

use super::Preset;

pub const DEFAULT_COMPLEXITY: u8 = 50;
pub const DEFAULT_DIMENSION: u32 = 1024;
pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 1536;
pub const DEFAULT_GUIDANCE: f32 = 7.5;
const BASE_STEPS: u32 = 30;
const FALLBACK_STYLE: &str = "natural";

/// An image generation template
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImageTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
    pub presets: &'static [Preset],
    pub styles: &'static [&'static str],
}

pub static IMAGE_TEMPLATES: &[ImageTemplate] = &[
    ImageTemplate {
        key: "social-media",
        name: "Social Media",
        description: "Create images for Instagram, Facebook, Twitter, and other social platforms.",
        placeholder: "A lifestyle photo of someone using a sustainable water bottle in a cafe...",
        presets: &[
            Preset {
                key: "instagram-post",
                prompt: "A lifestyle photo of [subject] with [description], perfect for Instagram, vibrant colors, professional lighting",
            },
            Preset {
                key: "facebook-ad",
                prompt: "A promotional image for [product/service] showing [benefit/feature], optimized for Facebook ads",
            },
            Preset {
                key: "twitter-header",
                prompt: "A banner image for a Twitter profile about [topic/brand] with [description]",
            },
            Preset {
                key: "pinterest-pin",
                prompt: "A vertical image showing [subject] with text overlay for [topic], designed for Pinterest",
            },
        ],
        styles: &["Photorealistic", "Lifestyle", "Minimalist", "Vibrant", "Branded"],
    },
    ImageTemplate {
        key: "marketing",
        name: "Marketing",
        description: "Generate images for ads, product photos, and marketing materials.",
        placeholder: "A product photo of an eco-friendly water bottle on a wooden table...",
        presets: &[
            Preset {
                key: "product-photo",
                prompt: "A professional product photo of [product] on a [background] with [lighting style]",
            },
            Preset {
                key: "ad-banner",
                prompt: "A web banner ad for [product/service] highlighting [feature/benefit] with [call to action]",
            },
            Preset {
                key: "promotional",
                prompt: "A promotional image for [event/product] featuring [description]",
            },
            Preset {
                key: "infographic",
                prompt: "A simple infographic showing [data/process] related to [topic]",
            },
        ],
        styles: &["Product Photography", "Flat Design", "Corporate", "Bold", "Informational"],
    },
    ImageTemplate {
        key: "design",
        name: "Design",
        description: "Create concept art, illustrations, and design elements.",
        placeholder: "A minimalist logo concept for an eco-friendly brand...",
        presets: &[
            Preset {
                key: "concept-art",
                prompt: "Concept art for [subject/character/environment] in a [style] style with [mood/lighting]",
            },
            Preset {
                key: "illustration",
                prompt: "An illustration of [subject] in [style] style with [color scheme]",
            },
            Preset {
                key: "pattern",
                prompt: "A seamless pattern with [elements] in [color scheme] for [purpose]",
            },
            Preset {
                key: "icon-set",
                prompt: "A set of minimalist icons representing [concepts/objects] in a consistent style",
            },
        ],
        styles: &["Illustration", "Concept Art", "Minimalist", "Abstract", "Flat Design"],
    },
    ImageTemplate {
        key: "content",
        name: "Content",
        description: "Generate images for blog posts, articles, and other content.",
        placeholder: "A header image for a blog post about sustainable living...",
        presets: &[
            Preset {
                key: "blog-header",
                prompt: "A header image for a blog post about [topic] with [mood/style]",
            },
            Preset {
                key: "article-illustration",
                prompt: "An illustration to accompany an article about [topic] showing [concept/idea]",
            },
            Preset {
                key: "ebook-cover",
                prompt: "A cover image for an ebook about [topic] with [style] design",
            },
            Preset {
                key: "featured-image",
                prompt: "A featured image for content about [topic] that conveys [mood/concept]",
            },
        ],
        styles: &["Editorial", "Informational", "Conceptual", "Metaphorical", "Storytelling"],
    },
];

impl ImageTemplate {
    /// Get a template by key
    pub fn by_key(key: &str) -> Option<&'static ImageTemplate> {
        IMAGE_TEMPLATES.iter().find(|t| t.key == key)
    }

    /// Look up one of this template's presets
    pub fn preset(&self, key: &str) -> Option<&'static str> {
        self.presets.iter().find(|p| p.key == key).map(|p| p.prompt)
    }
}

/// Prompt modifier and base guidance for a named style
#[derive(Debug, Clone, Copy)]
pub struct StyleProfile {
    pub name: &'static str,
    pub modifier: &'static str,
    pub guidance: f32,
}

static STYLE_PROFILES: &[StyleProfile] = &[
    StyleProfile { name: "photorealistic", modifier: "photorealistic, highly detailed, natural lighting", guidance: 7.0 },
    StyleProfile { name: "lifestyle", modifier: "candid lifestyle photography, warm tones", guidance: 6.5 },
    StyleProfile { name: "minimalist", modifier: "minimalist composition, clean background, negative space", guidance: 8.0 },
    StyleProfile { name: "vibrant", modifier: "vibrant colors, high contrast", guidance: 7.5 },
    StyleProfile { name: "branded", modifier: "cohesive brand colors, polished commercial look", guidance: 7.5 },
    StyleProfile { name: "product photography", modifier: "studio product photography, soft box lighting, sharp focus", guidance: 7.0 },
    StyleProfile { name: "flat design", modifier: "flat design, simple shapes, solid colors", guidance: 8.0 },
    StyleProfile { name: "corporate", modifier: "clean corporate aesthetic, professional", guidance: 7.5 },
    StyleProfile { name: "bold", modifier: "bold colors, strong composition", guidance: 8.0 },
    StyleProfile { name: "informational", modifier: "clear informational layout, legible", guidance: 7.5 },
    StyleProfile { name: "illustration", modifier: "digital illustration, clean linework", guidance: 8.5 },
    StyleProfile { name: "concept art", modifier: "concept art, dramatic lighting, painterly", guidance: 9.0 },
    StyleProfile { name: "abstract", modifier: "abstract shapes, expressive color", guidance: 9.5 },
    StyleProfile { name: "editorial", modifier: "editorial photography, magazine quality", guidance: 6.5 },
    StyleProfile { name: "conceptual", modifier: "conceptual imagery, symbolic", guidance: 8.0 },
    StyleProfile { name: "metaphorical", modifier: "visual metaphor, surreal elements", guidance: 8.5 },
    StyleProfile { name: "storytelling", modifier: "narrative scene, cinematic composition", guidance: 7.5 },
    StyleProfile { name: "natural", modifier: "natural lighting, realistic colors", guidance: 7.5 },
];

impl StyleProfile {
    /// Case-insensitive lookup
    pub fn lookup(style: &str) -> Option<&'static StyleProfile> {
        let needle = style.trim().to_lowercase();
        STYLE_PROFILES.iter().find(|p| p.name == needle)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Append style and detail hints to an image prompt
///
/// Output shape: `"{prompt}, {modifier}, style: {style}, detail level: {n}%"`.
/// The modifier is only added for a known style the caller chose; without a
/// style the suffix reads `style: natural`. Only a missing complexity falls
/// back to 50; an explicit 0 is kept.
pub fn enhance_image_prompt(prompt: &str, style: Option<&str>, complexity: Option<u8>) -> String {
    let prompt = prompt.trim();
    let complexity = complexity.unwrap_or(DEFAULT_COMPLEXITY).min(100);

    let mut parts = vec![prompt.to_string()];
    let style_label = match non_blank(style) {
        Some(style) => {
            if let Some(profile) = StyleProfile::lookup(style) {
                parts.push(profile.modifier.to_string());
            }
            style.to_string()
        }
        None => FALLBACK_STYLE.to_string(),
    };
    parts.push(format!("style: {}", style_label));
    parts.push(format!("detail level: {}%", complexity));

    parts.join(", ")
}

/// Round to the nearest multiple of 8, then clamp to the supported range
pub fn snap_dimension(value: u32) -> u32 {
    let rounded = value.saturating_add(4) / 8 * 8;
    rounded.clamp(MIN_DIMENSION, MAX_DIMENSION)
}

/// Diffusion parameters derived from style and complexity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageParams {
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub width: u32,
    pub height: u32,
    pub complexity: u8,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self::tune(None, None, None, None)
    }
}

impl ImageParams {
    /// Derive parameters from user choices
    ///
    /// Complexity is clamped to 0..=100. Steps grow from 30 to 80 with
    /// complexity; guidance starts from the style's base and gains up to one
    /// point at full complexity.
    pub fn tune(
        style: Option<&str>,
        complexity: Option<i64>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Self {
        let complexity = complexity
            .map(|c| c.clamp(0, 100) as u8)
            .unwrap_or(DEFAULT_COMPLEXITY);

        let base = non_blank(style)
            .and_then(StyleProfile::lookup)
            .map(|p| p.guidance)
            .unwrap_or(DEFAULT_GUIDANCE);
        let guidance_scale = (base + f32::from(complexity) / 100.0).clamp(1.0, 20.0);

        Self {
            guidance_scale,
            num_inference_steps: BASE_STEPS + (u32::from(complexity) + 1) / 2,
            width: snap_dimension(width.unwrap_or(DEFAULT_DIMENSION)),
            height: snap_dimension(height.unwrap_or(DEFAULT_DIMENSION)),
            complexity,
        }
    }
}
