//! Bounded exponential backoff around a single conversational turn.

use std::time::Duration;

use thiserror::Error;
use tracing::{info_span, warn, Instrument};

use crate::conversation::{send_turn, ConversationState, TurnRequest};
use crate::error::ProviderError;
use crate::provider::AnalysisProvider;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

/// Retry settings. `max_retries` bounds the total number of attempts per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
        }
    }
}

/// A turn that produced a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSuccess {
    pub report: String,
    pub attempts: u32,
}

/// The batch gave up on analysis.
#[derive(Debug, Clone, Error)]
#[error("Batch failed after {attempts} attempt(s): {error}")]
pub struct BatchFailed {
    pub attempts: u32,
    pub error: ProviderError,
}

impl BatchFailed {
    /// Overload persisted through every allowed attempt.
    pub fn retries_exhausted(&self) -> bool {
        self.error.is_overloaded()
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Delay after the failed `attempt` (1-based): `initial * 2^(attempt-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Send one turn, retrying only on the overload signal.
    ///
    /// `on_retry(attempt, delay)` runs before each backoff sleep, with the attempt that
    /// just failed. Counters start fresh on every call.
    pub async fn send_with_retry<P, F>(
        &self,
        provider: &P,
        state: &ConversationState,
        request: &TurnRequest,
        mut on_retry: F,
    ) -> Result<TurnSuccess, BatchFailed>
    where
        P: AnalysisProvider + ?Sized,
        F: FnMut(u32, Duration),
    {
        let max_attempts = self.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let span = info_span!("analysis_attempt", attempt);
            match send_turn(provider, state, request).instrument(span).await {
                Ok(report) => return Ok(TurnSuccess { report, attempts: attempt }),
                Err(error) if error.is_overloaded() && attempt < max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Provider overloaded, retrying: {}",
                        error
                    );
                    on_retry(attempt, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(BatchFailed { attempts: attempt, error }),
            }
        }
    }
}
