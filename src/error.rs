//! Error types for the batch analysis pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::batch::InvalidTransition;

/// Result type for run-level operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Video file not found: {}", .0.display())]
    VideoNotFound(PathBuf),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Missing or invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// The media tool could not produce frames or audio for a window.
#[derive(Debug, Error)]
#[error("Extraction failed for batch {batch}: {message}")]
pub struct ExtractionError {
    pub batch: usize,
    pub message: String,
}

impl ExtractionError {
    pub fn new(batch: usize, message: impl Into<String>) -> Self {
        Self {
            batch,
            message: message.into(),
        }
    }
}

/// Failures reported by the analysis provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider is temporarily overloaded (HTTP 503).
    #[error("Service overloaded: {0}")]
    Overloaded(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn overloaded(msg: impl Into<String>) -> Self {
        Self::Overloaded(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Only the overload signal is eligible for retry.
    pub fn is_overloaded(&self) -> bool {
        matches!(self, ProviderError::Overloaded(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// An audio clip could not be pushed to provider storage.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload rejected: {0}")]
    Provider(#[from] ProviderError),
}
