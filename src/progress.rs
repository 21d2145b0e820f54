//! Console progress bar for the analysis loop.

use indicatif::{ProgressBar, ProgressStyle};

use crate::i18n::Messages;

/// Bar layout with localized elapsed and ETA labels.
pub fn progress_template(messages: &dyn Messages) -> String {
    format!(
        "{{prefix}}: [{{bar:30}}] {{percent}}% | {{pos}}/{{len}} | {}: {{elapsed_precise}} | {}: {{eta_precise}}",
        messages.elapsed(),
        messages.eta()
    )
}

pub fn progress_style(messages: &dyn Messages) -> ProgressStyle {
    ProgressStyle::with_template(&progress_template(messages))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█ ")
}

/// Bar counting completed batches. Draws to stderr and stays hidden when it is not a terminal.
pub fn batch_progress(messages: &dyn Messages, total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(progress_style(messages));
    pb.set_prefix(messages.analyzing());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{English, Turkish};

    #[test]
    fn template_carries_localized_labels() {
        let english = progress_template(&English);
        assert!(english.starts_with("{prefix}: [{bar:30}] {percent}% | {pos}/{len}"));
        assert!(english.ends_with("Elapsed: {elapsed_precise} | ETA: {eta_precise}"));

        let turkish = progress_template(&Turkish);
        assert!(turkish.contains("Geçen Süre: {elapsed_precise}"));
        assert!(turkish.contains("Tahmini Kalan Süre: {eta_precise}"));
    }

    #[test]
    fn templates_parse() {
        assert!(ProgressStyle::with_template(&progress_template(&English)).is_ok());
        assert!(ProgressStyle::with_template(&progress_template(&Turkish)).is_ok());
    }

    #[test]
    fn counts_batches() {
        let pb = batch_progress(&English, 3);
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        pb.inc(1);
        pb.inc(1);
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(3));
        assert_eq!(pb.prefix(), "Analyzing");
    }
}
