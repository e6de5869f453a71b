//! Text templates and prompt enhancement

use serde::Serialize;

use super::Preset;

/// Opening line of every system instruction
const SYSTEM_PREAMBLE: &str = "You are a professional writer and content creator. ";

/// Instruction used when the template is unknown
const GENERIC_INSTRUCTION: &str =
    "Create high-quality content that is engaging, clear, and valuable to the reader.";

/// A text generation template
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TextTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
    #[serde(skip)]
    pub instruction: &'static str,
    pub presets: &'static [Preset],
}

pub static TEXT_TEMPLATES: &[TextTemplate] = &[
    TextTemplate {
        key: "content-creator",
        name: "Content Creator",
        description: "Generate blog posts, social media captions, video scripts, and podcast outlines.",
        placeholder: "Write a blog post about sustainable fashion trends...",
        instruction: "Create high-quality, engaging content that resonates with readers and follows best content creation practices.",
        presets: &[
            Preset {
                key: "blog-post",
                prompt: "Write a comprehensive blog post about [topic] with an engaging introduction, 3-5 main points with subheadings, and a conclusion with a call to action.",
            },
            Preset {
                key: "social-media",
                prompt: "Create 5 engaging social media captions about [topic] that are optimized for Instagram, each with relevant hashtags.",
            },
            Preset {
                key: "video-script",
                prompt: "Write a YouTube video script about [topic] with an attention-grabbing intro, 3 main talking points, and an outro with a call to subscribe.",
            },
            Preset {
                key: "podcast-outline",
                prompt: "Create a detailed podcast episode outline about [topic] with an introduction, 3-4 segments, interview questions, and closing remarks.",
            },
        ],
    },
    TextTemplate {
        key: "marketing",
        name: "Marketing & Business",
        description: "Create marketing copy, product descriptions, ad variations, and business content.",
        placeholder: "Write a product description for an eco-friendly water bottle...",
        instruction: "Create persuasive, benefit-focused marketing copy that drives action and highlights the unique selling points.",
        presets: &[
            Preset {
                key: "product-description",
                prompt: "Write a compelling product description for [product] that highlights its key features, benefits, and unique selling points.",
            },
            Preset {
                key: "ad-copy",
                prompt: "Create 3 variations of ad copy for [product/service] optimized for Facebook ads, each with a compelling headline and call to action.",
            },
            Preset {
                key: "email-campaign",
                prompt: "Write a marketing email for [product/service] with an attention-grabbing subject line, engaging body content, and a clear call to action.",
            },
            Preset {
                key: "business-plan",
                prompt: "Create an executive summary for a business plan for [business type] that outlines the concept, target market, competitive advantage, and financial projections.",
            },
        ],
    },
    TextTemplate {
        key: "education",
        name: "Education",
        description: "Generate study materials, lesson plans, and educational content.",
        placeholder: "Create a lesson plan about photosynthesis for high school students...",
        instruction: "Create clear, informative educational content that breaks down complex topics into understandable sections.",
        presets: &[
            Preset {
                key: "lesson-plan",
                prompt: "Create a detailed lesson plan about [topic] for [grade level] students with learning objectives, activities, assessment methods, and resources needed.",
            },
            Preset {
                key: "study-guide",
                prompt: "Generate a comprehensive study guide for [subject/topic] with key concepts, definitions, examples, and practice questions.",
            },
            Preset {
                key: "summary",
                prompt: "Summarize the key points of [text/article/book] in a concise and easy-to-understand format.",
            },
            Preset {
                key: "quiz-questions",
                prompt: "Create 10 quiz questions about [topic] with multiple-choice answers and explanations for the correct answers.",
            },
        ],
    },
    TextTemplate {
        key: "developer",
        name: "Developer",
        description: "Generate code snippets, documentation, and technical content.",
        placeholder: "Write a function that sorts an array of objects by a specific property...",
        instruction: "Create well-commented, efficient code and technical documentation with clear explanations.",
        presets: &[
            Preset {
                key: "code-snippet",
                prompt: "Write a [programming language] function that [functionality description] with comments explaining the code.",
            },
            Preset {
                key: "documentation",
                prompt: "Create documentation for a [programming language] function/API that [functionality description] with parameters, return values, and usage examples.",
            },
            Preset {
                key: "tutorial",
                prompt: "Write a step-by-step tutorial on how to implement [feature/functionality] in [programming language/framework].",
            },
            Preset {
                key: "code-review",
                prompt: "Review the following code and suggest improvements for readability, performance, and best practices: [paste code here]",
            },
        ],
    },
];

impl TextTemplate {
    /// Get a template by key
    pub fn by_key(key: &str) -> Option<&'static TextTemplate> {
        TEXT_TEMPLATES.iter().find(|t| t.key == key)
    }

    /// Look up one of this template's presets
    pub fn preset(&self, key: &str) -> Option<&'static str> {
        self.presets.iter().find(|p| p.key == key).map(|p| p.prompt)
    }

    /// Full system instruction for this template
    pub fn system_message(&self) -> String {
        format!("{}{}", SYSTEM_PREAMBLE, self.instruction)
    }
}

/// A prompt split into a system instruction and the user's request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPrompt {
    pub system: String,
    pub user: String,
}

impl TextPrompt {
    /// Render as a single Mistral-style instruct string
    pub fn to_instruct_format(&self) -> String {
        if self.system.is_empty() {
            return self.user.clone();
        }
        format!(
            "<s>[INST]{}\n\nPlease respond to the following request:\n{}[/INST]</s>",
            self.system, self.user
        )
    }
}

/// Attach the template's system instruction to a prompt
pub fn enhance_text_prompt(prompt: &str, template: &str) -> TextPrompt {
    if prompt.trim().is_empty() {
        return TextPrompt {
            system: String::new(),
            user: prompt.to_string(),
        };
    }

    let system = match TextTemplate::by_key(template) {
        Some(t) => t.system_message(),
        None => format!("{}{}", SYSTEM_PREAMBLE, GENERIC_INSTRUCTION),
    };

    TextPrompt {
        system,
        user: prompt.to_string(),
    }
}

/// Strip instruct markers the model may echo back
pub fn clean_generated_text(text: &str) -> String {
    text.replace("[/INST]", "").trim().to_string()
}
