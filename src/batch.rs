//! Per-batch state machine.
//!
//! ```text
//! Pending -> Extracting -> Extracted -> Uploading -> Uploaded -> Analyzing{1}
//!                 |                          |                     |   ^
//!                 v                          v                     |   | overloaded
//!              Aborted                 UploadFailed                +---+
//!                                                                  |
//!                                                      Complete <--+--> Failed
//! ```
//!
//! `Aborted` ends the whole run; `UploadFailed` and `Failed` only skip the batch.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Extracting,
    Extracted,
    Uploading,
    Uploaded,
    /// Analysis in flight; `attempt` starts at 1.
    Analyzing { attempt: u32 },
    Complete,
    UploadFailed,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEvent {
    Start,
    Extracted,
    ExtractionFailed,
    UploadStarted,
    Uploaded,
    UploadFailed,
    AnalysisStarted,
    Overloaded,
    Succeeded,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid batch transition: {event:?} in state {from}")]
pub struct InvalidTransition {
    pub from: BatchState,
    pub event: BatchEvent,
}

impl BatchState {
    pub fn on(self, event: BatchEvent) -> Result<BatchState, InvalidTransition> {
        use BatchEvent as E;
        use BatchState as S;

        let next = match (self, event) {
            (S::Pending, E::Start) => S::Extracting,
            (S::Extracting, E::Extracted) => S::Extracted,
            (S::Extracting, E::ExtractionFailed) => S::Aborted,
            (S::Extracted, E::UploadStarted) => S::Uploading,
            (S::Uploading, E::Uploaded) => S::Uploaded,
            (S::Uploading, E::UploadFailed) => S::UploadFailed,
            (S::Uploaded, E::AnalysisStarted) => S::Analyzing { attempt: 1 },
            (S::Analyzing { attempt }, E::Overloaded) => S::Analyzing {
                attempt: attempt + 1,
            },
            (S::Analyzing { .. }, E::Succeeded) => S::Complete,
            (S::Analyzing { .. }, E::Rejected) => S::Failed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Complete | BatchState::UploadFailed | BatchState::Failed | BatchState::Aborted
        )
    }

    /// Terminal states that let the run continue with the next window.
    pub fn is_skipped(&self) -> bool {
        matches!(self, BatchState::UploadFailed | BatchState::Failed)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Pending => f.write_str("PENDING"),
            BatchState::Extracting => f.write_str("EXTRACTING"),
            BatchState::Extracted => f.write_str("EXTRACTED"),
            BatchState::Uploading => f.write_str("UPLOADING"),
            BatchState::Uploaded => f.write_str("UPLOADED"),
            BatchState::Analyzing { attempt } => write!(f, "ANALYZING(attempt {attempt})"),
            BatchState::Complete => f.write_str("COMPLETE"),
            BatchState::UploadFailed => f.write_str("UPLOAD_FAILED"),
            BatchState::Failed => f.write_str("FAILED"),
            BatchState::Aborted => f.write_str("ABORTED"),
        }
    }
}
