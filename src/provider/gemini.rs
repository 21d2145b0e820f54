//! Gemini REST client: file upload, file deletion and content generation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AnalysisProvider, ContentPart, Role, Turn, UploadedAsset};
use crate::error::ProviderError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    uri: String,
    mime_type: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_API_BASE)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Map a non-success response into a provider error; 503 is the overload signal.
    async fn error_from(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            ProviderError::overloaded(format!("{}: {}", status, body))
        } else {
            ProviderError::api(status.as_u16(), body)
        }
    }
}

fn to_content(turn: &Turn) -> Content<'_> {
    let role = match turn.role {
        Role::User => "user",
        Role::Model => "model",
    };
    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => Part::Text { text },
            ContentPart::InlineData { mime_type, data } => Part::Inline {
                inline_data: InlineData { mime_type, data },
            },
            ContentPart::FileData {
                mime_type,
                file_uri,
            } => Part::File {
                file_data: FileData {
                    mime_type,
                    file_uri,
                },
            },
        })
        .collect();
    Content { role, parts }
}

#[async_trait]
impl AnalysisProvider for GeminiClient {
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<UploadedAsset, ProviderError> {
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let len = bytes.len();

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", mime_type)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-File-Name", file_name)
            // Content-Length is derived from the body
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("upload response: {}", e)))?;
        info!(asset = %uploaded.file.name, size = len, "Uploaded {}", file_name);

        Ok(UploadedAsset {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded.file.mime_type,
        })
    }

    async fn delete_file(&self, asset: &UploadedAsset) -> Result<(), ProviderError> {
        let url = format!("{}/v1beta/{}", self.base_url, asset.name);
        let response = self
            .client
            .delete(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        debug!(asset = %asset.name, "Deleted remote file");
        Ok(())
    }

    async fn generate(&self, contents: &[Turn]) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateRequest {
            contents: contents.iter().map(to_content).collect(),
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("generate response: {}", e)))?;

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| ProviderError::invalid_response("No content in Gemini response"))?;

        if text.trim().is_empty() {
            return Err(ProviderError::invalid_response("Empty text in Gemini response"));
        }
        Ok(text)
    }
}
