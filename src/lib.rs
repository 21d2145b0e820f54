//! Cumulative multimodal analysis of long videos.
//!
//! A video is cut into fixed-length windows. For each window, in order, frames and an
//! audio clip are extracted, the audio is uploaded to the provider, and one
//! conversational turn asks the provider to rewrite a single report with the new
//! material. Uploaded assets and temp files are removed when the run ends.

pub mod batch;
pub mod config;
pub mod conversation;
pub mod error;
pub mod i18n;
pub mod ledger;
pub mod media;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod provider;
pub mod retry;

pub use batch::{BatchEvent, BatchState};
pub use config::{AnalysisConfig, Args};
pub use conversation::{AnalysisMode, ConversationState, PromptBuilder, TurnRequest};
pub use error::{ConfigError, ExtractionError, PipelineError, ProviderError, UploadError};
pub use i18n::{Language, Messages};
pub use ledger::{CleanupLedger, CleanupReport};
pub use media::{ExtractedMedia, FfmpegExtractor, MediaExtractor};
pub use pipeline::{BatchOutcome, Pipeline, PipelineSettings, RunSummary};
pub use planner::{plan_batches, BatchWindow, VideoSource};
pub use provider::{AnalysisProvider, GeminiClient, UploadedAsset};
pub use retry::{BatchFailed, RetryPolicy};
