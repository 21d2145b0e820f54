//! Sequential batch loop: extract, upload, analyze, then tear everything down.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::ProgressBar;
use tracing::{error, info, info_span, warn, Instrument};

use crate::batch::{BatchEvent, BatchState};
use crate::conversation::{ConversationState, PromptBuilder, TurnRequest};
use crate::error::{PipelineError, PipelineResult};
use crate::i18n::Messages;
use crate::ledger::{CleanupLedger, CleanupReport};
use crate::media::{FrameImage, MediaExtractor};
use crate::planner::{plan_batches, BatchWindow, VideoSource};
use crate::progress::batch_progress;
use crate::provider::{upload_clip, AnalysisProvider, ContentPart};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_length: Duration,
    pub total_batches: Option<usize>,
    pub request_limit: Option<usize>,
    pub retry: RetryPolicy,
    pub prompts: PromptBuilder,
    pub model: String,
    /// Created before the first batch and removed at the end of the run.
    pub temp_dirs: Vec<PathBuf>,
}

/// Final state of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub window: BatchWindow,
    pub state: BatchState,
    /// Analysis attempts made (0 when the batch never reached analysis).
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Output of the last successful turn.
    pub report: Option<String>,
    /// Windows produced by the planner, before any request limit.
    pub windows: usize,
    pub outcomes: Vec<BatchOutcome>,
    pub limit_reached: bool,
    pub cleanup: CleanupReport,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == BatchState::Complete)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.state.is_skipped()).count()
    }
}

pub struct Pipeline<'a, E: ?Sized, P: ?Sized> {
    extractor: &'a E,
    provider: &'a P,
    messages: &'a dyn Messages,
    settings: PipelineSettings,
    progress: ProgressBar,
}

impl<'a, E, P> Pipeline<'a, E, P>
where
    E: MediaExtractor + ?Sized,
    P: AnalysisProvider + ?Sized,
{
    pub fn new(
        extractor: &'a E,
        provider: &'a P,
        messages: &'a dyn Messages,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            provider,
            messages,
            settings,
            progress: batch_progress(messages, 0),
        }
    }

    /// Completed-batch counter of the current run.
    pub fn progress(&self) -> &ProgressBar {
        &self.progress
    }

    fn say(&self, line: String) {
        self.progress.suspend(|| println!("{}", line));
    }

    /// Process every planned window in order.
    ///
    /// Cleanup of everything tracked so far runs before returning, including when an
    /// extraction failure aborts the run.
    pub async fn run(&self, video: &VideoSource) -> PipelineResult<RunSummary> {
        let windows = plan_batches(
            video.duration,
            self.settings.batch_length,
            self.settings.total_batches,
        );
        let planned = self
            .settings
            .request_limit
            .map_or(windows.len(), |limit| windows.len().min(limit));
        info!(
            video = %video.path.display(),
            duration_secs = video.duration.as_secs_f64(),
            windows = windows.len(),
            "Planned batches"
        );
        self.say(self.messages.processing(&video.path, &self.settings.model, planned));
        if windows.is_empty() {
            self.say(self.messages.no_batches());
        }

        let mut ledger = CleanupLedger::prepare(&self.settings.temp_dirs).await?;
        let mut conversation = ConversationState::new();
        let mut outcomes = Vec::with_capacity(planned);

        self.progress.reset();
        self.progress.set_length(planned as u64);
        let result = self
            .process_windows(
                video,
                &windows,
                planned,
                &mut ledger,
                &mut conversation,
                &mut outcomes,
            )
            .await;
        self.progress.abandon();

        self.say(self.messages.cleanup());
        let cleanup = ledger.cleanup(self.provider).await;
        self.say(self.messages.cleanup_complete());

        let limit_reached = result?;
        Ok(RunSummary {
            report: conversation.into_report(),
            windows: windows.len(),
            outcomes,
            limit_reached,
            cleanup,
        })
    }

    /// Returns whether the request limit stopped the loop early.
    async fn process_windows(
        &self,
        video: &VideoSource,
        windows: &[BatchWindow],
        planned: usize,
        ledger: &mut CleanupLedger,
        conversation: &mut ConversationState,
        outcomes: &mut Vec<BatchOutcome>,
    ) -> PipelineResult<bool> {
        for (sent, window) in windows.iter().enumerate() {
            if let Some(limit) = self.settings.request_limit {
                if sent >= limit {
                    info!(limit, "Request limit reached");
                    self.say(self.messages.limit_reached(limit));
                    return Ok(true);
                }
            }

            let span = info_span!("batch", batch = window.index);
            let outcome = self
                .process_batch(video, window, planned, ledger, conversation)
                .instrument(span)
                .await?;

            if outcome.state == BatchState::Complete {
                self.progress.inc(1);
            }
            outcomes.push(outcome);
        }
        Ok(false)
    }

    async fn process_batch(
        &self,
        video: &VideoSource,
        window: &BatchWindow,
        planned: usize,
        ledger: &mut CleanupLedger,
        conversation: &mut ConversationState,
    ) -> PipelineResult<BatchOutcome> {
        let number = window.index + 1;
        let mut state = BatchState::Pending.on(BatchEvent::Start)?;
        self.say(self.messages.step(number, planned, &self.messages.extracting()));

        let media = match self.extractor.extract(video, window).await {
            Ok(media) => media,
            Err(e) => {
                state = state.on(BatchEvent::ExtractionFailed)?;
                error!(%state, "{}", e);
                return Err(PipelineError::Extraction(e));
            }
        };
        for path in media.paths() {
            ledger.track_file(path);
        }
        state = state.on(BatchEvent::Extracted)?;

        state = state.on(BatchEvent::UploadStarted)?;
        self.say(self.messages.step(number, planned, &self.messages.uploading()));
        let asset = match upload_clip(self.provider, &media.audio).await {
            Ok(asset) => asset,
            Err(e) => {
                state = state.on(BatchEvent::UploadFailed)?;
                warn!(%state, "Skipping batch: {}", e);
                self.say(self.messages.upload_failed(&e.to_string()));
                return Ok(BatchOutcome {
                    window: *window,
                    state,
                    attempts: 0,
                });
            }
        };
        ledger.track_asset(asset.clone());
        state = state.on(BatchEvent::Uploaded)?;

        let request = TurnRequest {
            prompt: self.settings.prompts.for_state(conversation),
            frames: load_frames(&media.frames).await,
            audio: asset,
        };
        drop(media);

        state = state.on(BatchEvent::AnalysisStarted)?;
        self.say(self.messages.step(number, planned, &self.messages.analyzing()));
        let retry = self.settings.retry;
        let result = retry
            .send_with_retry(self.provider, conversation, &request, |attempt, delay| {
                if let Ok(next) = state.on(BatchEvent::Overloaded) {
                    state = next;
                }
                self.say(self.messages.api_overloaded(delay, attempt, retry.max_retries));
            })
            .await;

        match result {
            Ok(success) => {
                conversation.record(request.parts(), success.report);
                state = state.on(BatchEvent::Succeeded)?;
                info!(%state, attempts = success.attempts, "Batch analyzed");
                Ok(BatchOutcome {
                    window: *window,
                    state,
                    attempts: success.attempts,
                })
            }
            Err(failed) => {
                state = state.on(BatchEvent::Rejected)?;
                warn!(%state, attempts = failed.attempts, "{}", failed);
                if !failed.retries_exhausted() {
                    self.say(self.messages.unrecoverable_error(&failed.error.to_string()));
                }
                self.say(self.messages.batch_failed(failed.attempts));
                Ok(BatchOutcome {
                    window: *window,
                    state,
                    attempts: failed.attempts,
                })
            }
        }
    }
}

/// Read frames as inline parts, skipping any that cannot be read.
async fn load_frames(frames: &[FrameImage]) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(frames.len());
    for frame in frames {
        match tokio::fs::read(&frame.path).await {
            Ok(bytes) => parts.push(ContentPart::inline(frame.mime_type.clone(), &bytes)),
            Err(e) => warn!(path = %frame.path.display(), "Skipping unreadable frame: {}", e),
        }
    }
    parts
}
