//! Boundary to the multimodal analysis provider.

pub mod gemini;

use std::path::Path;

use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::error::{ProviderError, UploadError};
use crate::media::AudioClip;

pub use gemini::GeminiClient;

/// Provider-issued reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadedAsset {
    /// Resource name used for deletion (e.g. `files/abc123`).
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

/// One element of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Base64-encoded bytes sent with the request.
    InlineData { mime_type: String, data: String },
    /// Reference to an uploaded asset.
    FileData { mime_type: String, file_uri: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data: BASE64_STANDARD.encode(bytes),
        }
    }

    pub fn file(asset: &UploadedAsset) -> Self {
        Self::FileData {
            mime_type: asset.mime_type.clone(),
            file_uri: asset.uri.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One side of a conversational exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Push raw bytes to provider storage.
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<UploadedAsset, ProviderError>;

    async fn delete_file(&self, asset: &UploadedAsset) -> Result<(), ProviderError>;

    /// Send the full ordered history (ending with the new user turn) and return the reply text.
    async fn generate(&self, contents: &[Turn]) -> Result<String, ProviderError>;
}

/// Upload an extracted audio clip.
pub async fn upload_clip<P>(provider: &P, clip: &AudioClip) -> Result<UploadedAsset, UploadError>
where
    P: AnalysisProvider + ?Sized,
{
    let bytes = tokio::fs::read(&clip.path)
        .await
        .map_err(|source| UploadError::Read {
            path: clip.path.clone(),
            source,
        })?;
    let file_name = file_name(&clip.path);
    debug!(file = %file_name, size = bytes.len(), "Uploading audio clip");

    let asset = provider
        .upload_file(bytes, &clip.mime_type, &file_name)
        .await
        .inspect_err(|e| warn!(file = %file_name, "Audio upload failed: {}", e))?;
    Ok(asset)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string())
}
