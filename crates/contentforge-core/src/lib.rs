//! ContentForge Core Library
//!
//! This crate provides the core functionality for ContentForge, including:
//! - Prompt templates, prompt enhancement and image parameter tuning
//! - Inference providers (HuggingFace, Gemini, Mistral)
//! - Generation storage (SQLite locally, hosted row API in production)
//! - Hosted auth client and session keepalive
//! - Configuration with env-only credentials

pub mod auth;
pub mod config;
pub mod error;
pub mod generate;
pub mod prompt;
pub mod providers;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, Credentials};
    pub use crate::error::{Error, Result};
    pub use crate::generate::{Generator, ImageRequest, TextRequest};
    pub use crate::providers::{ProviderKind, ProviderRegistry};
    pub use crate::storage::{Generation, GenerationKind, GenerationStore, NewGeneration};
}
