#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use reelscribe::conversation::AnalysisMode;
use reelscribe::media::{AudioClip, FrameImage};
use reelscribe::provider::Turn;
use reelscribe::{
    AnalysisProvider, BatchWindow, ExtractedMedia, ExtractionError, Language, MediaExtractor,
    PipelineSettings, PromptBuilder, ProviderError, RetryPolicy, UploadedAsset, VideoSource,
};

/// Provider double with scripted analysis replies.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    failing_uploads: HashSet<String>,
    failing_deletes: bool,
    pub uploads: Mutex<Vec<String>>,
    pub uploaded: Mutex<Vec<UploadedAsset>>,
    pub deleted: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<Vec<Turn>>>,
    pub request_times: Mutex<Vec<Instant>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Reject uploads of the named file.
    pub fn fail_upload(mut self, file_name: &str) -> Self {
        self.failing_uploads.insert(file_name.to_string());
        self
    }

    pub fn fail_deletes(mut self) -> Self {
        self.failing_deletes = true;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploaded
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedProvider {
    async fn upload_file(
        &self,
        _bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<UploadedAsset, ProviderError> {
        self.uploads.lock().unwrap().push(file_name.to_string());
        if self.failing_uploads.contains(file_name) {
            return Err(ProviderError::api(400, "upload rejected"));
        }
        let asset = UploadedAsset {
            name: format!("files/{}", file_name),
            uri: format!("https://files.test/{}", file_name),
            mime_type: mime_type.to_string(),
        };
        self.uploaded.lock().unwrap().push(asset.clone());
        Ok(asset)
    }

    async fn delete_file(&self, asset: &UploadedAsset) -> Result<(), ProviderError> {
        self.deleted.lock().unwrap().push(asset.name.clone());
        if self.failing_deletes {
            return Err(ProviderError::api(500, "delete failed"));
        }
        Ok(())
    }

    async fn generate(&self, contents: &[Turn]) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(contents.to_vec());
        self.request_times.lock().unwrap().push(Instant::now());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::api(500, "no scripted reply")))
    }
}

/// Extractor double that writes small placeholder files per window.
pub struct FakeExtractor {
    frames_dir: PathBuf,
    audio_dir: PathBuf,
    frames_per_batch: usize,
    fail_at: Option<usize>,
    pub extracted: Mutex<Vec<usize>>,
}

impl FakeExtractor {
    pub fn new(root: &Path) -> Self {
        Self {
            frames_dir: root.join("frames"),
            audio_dir: root.join("audio"),
            frames_per_batch: 2,
            fail_at: None,
            extracted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, batch: usize) -> Self {
        self.fail_at = Some(batch);
        self
    }

    pub fn temp_dirs(&self) -> Vec<PathBuf> {
        vec![self.frames_dir.clone(), self.audio_dir.clone()]
    }

    pub fn extracted(&self) -> Vec<usize> {
        self.extracted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn extract(
        &self,
        _video: &VideoSource,
        window: &BatchWindow,
    ) -> Result<ExtractedMedia, ExtractionError> {
        self.extracted.lock().unwrap().push(window.index);
        if self.fail_at == Some(window.index) {
            return Err(ExtractionError::new(window.index, "decode failure"));
        }

        let io = |e: std::io::Error| ExtractionError::new(window.index, e.to_string());
        std::fs::create_dir_all(&self.frames_dir).map_err(io)?;
        std::fs::create_dir_all(&self.audio_dir).map_err(io)?;

        let mut frames = Vec::new();
        for seq in 1..=self.frames_per_batch {
            let path = self
                .frames_dir
                .join(format!("batch_{}_frame-{}.jpg", window.index, seq));
            std::fs::write(&path, format!("frame {} {}", window.index, seq)).map_err(io)?;
            frames.push(FrameImage {
                path,
                mime_type: "image/jpeg".to_string(),
            });
        }
        let audio_path = self
            .audio_dir
            .join(format!("audio_chunk_{}.aac", window.index));
        std::fs::write(&audio_path, b"aac").map_err(io)?;

        Ok(ExtractedMedia {
            frames,
            audio: AudioClip {
                path: audio_path,
                mime_type: "audio/aac".to_string(),
            },
        })
    }
}

pub fn video(minutes: u64) -> VideoSource {
    VideoSource::new("talk.mp4", Duration::from_secs(minutes * 60))
}

pub fn settings(temp_dirs: Vec<PathBuf>) -> PipelineSettings {
    PipelineSettings {
        batch_length: Duration::from_secs(300),
        total_batches: None,
        request_limit: None,
        retry: RetryPolicy::new(3, Duration::from_millis(1000)),
        prompts: PromptBuilder::new(Language::English, AnalysisMode::Meeting),
        model: "test-model".to_string(),
        temp_dirs,
    }
}

pub fn ok(text: &str) -> Result<String, ProviderError> {
    Ok(text.to_string())
}

pub fn overloaded() -> Result<String, ProviderError> {
    Err(ProviderError::overloaded("503 Service Unavailable"))
}
