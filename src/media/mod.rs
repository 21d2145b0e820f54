//! Frame and audio extraction for one batch window.

pub mod audio;
pub mod frames;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use ffmpeg::{format, rescale, Rational, Rescale};
use ffmpeg_next::{self as ffmpeg};
use tracing::info;

use crate::error::ExtractionError;
use crate::planner::{BatchWindow, VideoSource};

pub const FRAME_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub path: PathBuf,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub path: PathBuf,
    pub mime_type: String,
}

/// Artifacts of one window. Frames are in temporal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMedia {
    pub frames: Vec<FrameImage>,
    pub audio: AudioClip,
}

impl ExtractedMedia {
    /// Every local file backing this batch.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.frames
            .iter()
            .map(|f| f.path.as_path())
            .chain(std::iter::once(self.audio.path.as_path()))
    }
}

#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract(
        &self,
        video: &VideoSource,
        window: &BatchWindow,
    ) -> Result<ExtractedMedia, ExtractionError>;
}

/// Window bounds in one stream's time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PtsRange {
    pub start: i64,
    pub end: i64,
}

impl PtsRange {
    pub(crate) fn new(window: &BatchWindow, time_base: Rational) -> Self {
        let ms = |d: Duration| (d.as_millis() as i64).rescale((1, 1000), time_base);
        Self {
            start: ms(window.start),
            end: ms(window.end()),
        }
    }

    /// Decoded before the window, after seeking to an earlier keyframe.
    pub(crate) fn is_before(&self, pts: i64) -> bool {
        pts < self.start
    }

    pub(crate) fn is_past(&self, pts: i64) -> bool {
        pts >= self.end
    }
}

static INIT: OnceLock<Result<(), ffmpeg::Error>> = OnceLock::new();

pub fn init() -> anyhow::Result<()> {
    INIT.get_or_init(ffmpeg::init).clone().map_err(anyhow::Error::from)
}

/// Read the container duration.
pub fn probe(path: &Path) -> anyhow::Result<VideoSource> {
    init()?;
    let input = format::input(&path)?;
    let duration_ms = input
        .duration()
        .max(0)
        .rescale(rescale::TIME_BASE, (1, 1000));
    Ok(VideoSource::new(
        path,
        Duration::from_millis(duration_ms.max(0) as u64),
    ))
}

/// Extracts with the linked FFmpeg libraries into the configured temp directories.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    frames_dir: PathBuf,
    audio_dir: PathBuf,
    frame_interval: Duration,
}

impl FfmpegExtractor {
    pub fn new(
        frames_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            audio_dir: audio_dir.into(),
            frame_interval,
        }
    }
}

#[async_trait]
impl MediaExtractor for FfmpegExtractor {
    async fn extract(
        &self,
        video: &VideoSource,
        window: &BatchWindow,
    ) -> Result<ExtractedMedia, ExtractionError> {
        let input = video.path.clone();
        let window = *window;
        let frames_dir = self.frames_dir.clone();
        let audio_path = self.audio_dir.join(audio::audio_file_name(window.index));
        let interval = self.frame_interval;

        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<ExtractedMedia> {
            init()?;
            let frames = frames::capture_frames(&input, &window, interval, &frames_dir)?;
            if let Some(parent) = audio_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            audio::extract_audio(&input, &window, &audio_path)?;
            Ok(ExtractedMedia {
                frames: frames
                    .into_iter()
                    .map(|path| FrameImage {
                        path,
                        mime_type: FRAME_MIME_TYPE.to_string(),
                    })
                    .collect(),
                audio: AudioClip {
                    path: audio_path,
                    mime_type: audio::AUDIO_MIME_TYPE.to_string(),
                },
            })
        })
        .await;

        let media = match result {
            Ok(Ok(media)) => media,
            Ok(Err(e)) => return Err(ExtractionError::new(window.index, format!("{:#}", e))),
            Err(e) => return Err(ExtractionError::new(window.index, e.to_string())),
        };
        info!(
            batch = window.index,
            frames = media.frames.len(),
            "Extracted window {:?}..{:?}",
            window.start,
            window.end()
        );
        Ok(media)
    }
}
