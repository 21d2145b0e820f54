//! Window planning over the source video.

use std::path::PathBuf;
use std::time::Duration;

/// The video being analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    pub path: PathBuf,
    pub duration: Duration,
}

impl VideoSource {
    pub fn new(path: impl Into<PathBuf>, duration: Duration) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// A contiguous time slice processed as one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    /// 0-based position in processing order.
    pub index: usize,
    pub start: Duration,
    pub duration: Duration,
}

impl BatchWindow {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

/// Split `[0, total)` into windows of `batch_length`, the last one possibly shorter.
///
/// The count is `ceil(total / batch_length)`, capped by `max_batches` when given.
/// A zero duration (or a zero batch length) yields no windows.
pub fn plan_batches(
    total: Duration,
    batch_length: Duration,
    max_batches: Option<usize>,
) -> Vec<BatchWindow> {
    let total_ns = total.as_nanos();
    let step_ns = batch_length.as_nanos();
    if total_ns == 0 || step_ns == 0 {
        return Vec::new();
    }

    let count = usize::try_from(total_ns.div_ceil(step_ns)).unwrap_or(usize::MAX);
    let count = max_batches.map_or(count, |max| count.min(max));

    (0..count)
        .map(|index| {
            let start = batch_length * index as u32;
            BatchWindow {
                index,
                start,
                duration: batch_length.min(total.saturating_sub(start)),
            }
        })
        .collect()
}
