//! Generation records

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// What a generation produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Text,
    Image,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved prompt/output pair
///
/// For images `output` holds the `data:` URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GenerationKind,
    pub prompt: String,
    pub output: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub complexity: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A generation about to be saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGeneration {
    #[serde(rename = "type")]
    pub kind: GenerationKind,
    pub prompt: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<i32>,
}

impl NewGeneration {
    pub fn text(prompt: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind: GenerationKind::Text,
            prompt: prompt.into(),
            output: output.into(),
            template: None,
            style: None,
            complexity: None,
        }
    }

    pub fn image(prompt: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind: GenerationKind::Image,
            ..Self::text(prompt, output)
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_complexity(mut self, complexity: i32) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Check field presence before saving
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidInput("prompt must not be empty".to_string()));
        }
        if self.output.trim().is_empty() {
            return Err(Error::InvalidInput("output must not be empty".to_string()));
        }
        if let Some(c) = self.complexity {
            if !(0..=100).contains(&c) {
                return Err(Error::InvalidInput(
                    "complexity must be between 0 and 100".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Assign an id and a microsecond-precision timestamp
    pub fn into_generation(self) -> Generation {
        Generation {
            id: Uuid::new_v4().to_string(),
            kind: self.kind,
            prompt: self.prompt,
            output: self.output,
            template: self.template,
            style: self.style,
            complexity: self.complexity,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}
