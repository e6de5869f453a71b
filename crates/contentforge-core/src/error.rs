//! Error types for ContentForge

use thiserror::Error;

use crate::providers::ProviderKind;

/// Result type alias using ContentForge's Error
pub type Result<T> = std::result::Result<T, Error>;

/// ContentForge error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (E001-E099)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Generation '{0}' not found.")]
    GenerationNotFound(String),

    // Provider errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Missing API key for {0}. Set {env} in the server environment.", env = .0.credential_env())]
    MissingCredentials(ProviderKind),

    #[error("Model is still loading, please try again in {retry_after} seconds")]
    ModelLoading { retry_after: u64 },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to connect to AI service: {0}")]
    ProviderUnavailable(String),

    #[error("{provider} API error ({status}): {message}")]
    Provider {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    #[error("{0}")]
    UnexpectedResponse(String),

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: ProviderKind,
        operation: &'static str,
    },

    // Storage errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    // Auth errors (E500-E599)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Auth service unreachable: {0}")]
    AuthUnavailable(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "E001",
            Self::GenerationNotFound(_) => "E002",
            Self::NetworkError(_) => "E100",
            Self::MissingCredentials(_) => "E101",
            Self::ModelLoading { .. } => "E102",
            Self::Timeout(_) => "E103",
            Self::ProviderUnavailable(_) => "E104",
            Self::Provider { .. } => "E105",
            Self::UnexpectedResponse(_) => "E106",
            Self::Unsupported { .. } => "E107",
            Self::DatabaseError(_) => "E400",
            Self::StorageError(_) => "E401",
            Self::Unauthorized(_) => "E500",
            Self::AuthError(_) => "E501",
            Self::AuthUnavailable(_) => "E502",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::GenerationNotFound(_) => Some("contentforge gallery list".to_string()),
            Self::NetworkError(_) | Self::ProviderUnavailable(_) | Self::AuthUnavailable(_) => {
                Some("Check internet connection".to_string())
            }
            Self::MissingCredentials(kind) => Some(format!("export {}=...", kind.credential_env())),
            Self::ModelLoading { retry_after } => {
                Some(format!("Retry in {} seconds", retry_after))
            }
            Self::Unauthorized(_) => Some("contentforge login".to_string()),
            Self::ConfigError(_) => Some("contentforge config list".to_string()),
            _ => None,
        }
    }

    /// Seconds a client should wait before retrying, when the upstream told us
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::ModelLoading { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
