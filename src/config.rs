//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::provider::gemini::DEFAULT_API_BASE;
use crate::retry::{RetryPolicy, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_RETRIES};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Parser)]
#[command(name = "reelscribe")]
#[command(
    about = "Build one cumulative report for a long video, batch by batch, with Gemini",
    long_about = None
)]
pub struct Args {
    /// Source video
    #[arg(long, env = "VIDEO_PATH", default_value = "Input/sample-video.mp4")]
    pub video: PathBuf,
    #[arg(long, env = "FRAMES_FOLDER", default_value = "temp_frames")]
    pub frames_dir: PathBuf,
    #[arg(long, env = "AUDIO_FOLDER", default_value = "temp_audio")]
    pub audio_dir: PathBuf,
    /// Length of one batch window
    #[arg(long, env = "SECONDS_PER_BATCH", default_value_t = 300)]
    pub batch_seconds: u64,
    /// Sample one frame every N seconds
    #[arg(long, env = "FRAME_INTERVAL_SECONDS", default_value_t = 12)]
    pub frame_interval_seconds: u64,
    /// Process at most this many windows
    #[arg(long, env = "TOTAL_BATCHES")]
    pub total_batches: Option<usize>,
    /// Stop once this many batches have been sent
    #[arg(long, env = "REQUEST_LIMIT")]
    pub request_limit: Option<usize>,
    #[arg(long, env = "MODEL_NAME", default_value = "gemini-2.5-flash")]
    pub model: String,
    /// Attempts per batch when the provider is overloaded
    #[arg(long, env = "MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    #[arg(long, env = "INITIAL_DELAY_MS", default_value_t = DEFAULT_INITIAL_DELAY_MS)]
    pub initial_delay_ms: u64,
    /// Report language; asked interactively when omitted
    #[arg(short, long)]
    pub language: Option<String>,
    /// Analysis mode (meeting or general); asked interactively when omitted
    #[arg(short, long)]
    pub mode: Option<String>,
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub video: PathBuf,
    pub frames_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub batch_length: Duration,
    pub frame_interval: Duration,
    pub total_batches: Option<usize>,
    pub request_limit: Option<usize>,
    pub model: String,
    pub retry: RetryPolicy,
    pub api_key: String,
    pub api_base: String,
}

impl AnalysisConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingVar(API_KEY_VAR))?;
        Self::with_api_key(args, api_key)
    }

    pub fn with_api_key(args: &Args, api_key: String) -> Result<Self, ConfigError> {
        if args.batch_seconds == 0 {
            return Err(ConfigError::invalid("batch-seconds", "must be greater than 0"));
        }
        if args.frame_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "frame-interval-seconds",
                "must be greater than 0",
            ));
        }
        if args.max_retries == 0 {
            return Err(ConfigError::invalid("max-retries", "must be at least 1"));
        }
        if args.model.trim().is_empty() {
            return Err(ConfigError::invalid("model", "must not be empty"));
        }

        Ok(Self {
            video: args.video.clone(),
            frames_dir: args.frames_dir.clone(),
            audio_dir: args.audio_dir.clone(),
            batch_length: Duration::from_secs(args.batch_seconds),
            frame_interval: Duration::from_secs(args.frame_interval_seconds),
            total_batches: args.total_batches,
            request_limit: args.request_limit,
            model: args.model.clone(),
            retry: RetryPolicy::new(
                args.max_retries,
                Duration::from_millis(args.initial_delay_ms),
            ),
            api_key,
            api_base: args.api_base.clone(),
        })
    }

    pub fn temp_dirs(&self) -> Vec<PathBuf> {
        vec![self.frames_dir.clone(), self.audio_dir.clone()]
    }
}
