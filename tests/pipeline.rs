mod common;

use std::time::Duration;

use reelscribe::i18n::English;
use reelscribe::provider::{ContentPart, Role};
use reelscribe::{BatchState, Pipeline, PipelineError, ProviderError};

use common::{ok, overloaded, settings, video, FakeExtractor, ScriptedProvider};

#[tokio::test]
async fn three_windows_without_errors() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![ok("report 1"), ok("report 2"), ok("report 3")]);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(15)).await.unwrap();

    assert_eq!(summary.windows, 3);
    assert_eq!(summary.completed(), 3);
    assert_eq!(provider.generate_calls(), 3);
    assert_eq!(summary.report.as_deref(), Some("report 3"));
    assert_eq!(extractor.extracted(), vec![0, 1, 2]);
    assert!(!summary.limit_reached);
    assert_eq!(pipeline.progress().position(), 3);
    assert_eq!(pipeline.progress().length(), Some(3));
}

#[tokio::test]
async fn history_grows_and_report_is_replaced() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![ok("first"), ok("second")]);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(10)).await.unwrap();
    assert_eq!(summary.report.as_deref(), Some("second"));

    let requests = provider.requests.lock().unwrap();
    assert_eq!(requests[0].len(), 1);
    let second = &requests[1];
    assert_eq!(second.len(), 3);
    assert_eq!(second[1].role, Role::Model);
    assert_eq!(second[1].parts, vec![ContentPart::text("first")]);

    // prompt, two frames, audio reference
    let parts = &second[2].parts;
    assert_eq!(parts.len(), 4);
    match &parts[0] {
        ContentPart::Text(prompt) => assert!(prompt.contains("Update and enrich")),
        other => panic!("expected prompt text, got {:?}", other),
    }
    assert!(matches!(parts[1], ContentPart::InlineData { .. }));
    assert_eq!(
        parts[3],
        ContentPart::FileData {
            mime_type: "audio/aac".into(),
            file_uri: "https://files.test/audio_chunk_1.aac".into(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn overload_is_retried_with_backoff() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![
        ok("report 1"),
        ok("report 2"),
        overloaded(),
        ok("report 3"),
    ]);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(15)).await.unwrap();

    let third = &summary.outcomes[2];
    assert_eq!(third.state, BatchState::Complete);
    assert_eq!(third.attempts, 2);
    assert_eq!(provider.generate_calls(), 4);
    assert_eq!(summary.report.as_deref(), Some("report 3"));

    let times = provider.request_times.lock().unwrap();
    let waited = times[3] - times[2];
    assert!(waited >= Duration::from_millis(1000), "waited {:?}", waited);
    assert!(waited < Duration::from_millis(1100), "waited {:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn backoff_restarts_for_every_batch() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![
        overloaded(),
        overloaded(),
        ok("report 0"),
        overloaded(),
        overloaded(),
        ok("report 1"),
    ]);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(10)).await.unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    for outcome in &summary.outcomes {
        assert_eq!(outcome.state, BatchState::Complete);
        assert_eq!(outcome.attempts, 3);
    }
    assert_eq!(provider.generate_calls(), 6);
    assert_eq!(summary.report.as_deref(), Some("report 1"));

    let times = provider.request_times.lock().unwrap();
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let within = |gap: Duration, ms: u64| {
        gap >= Duration::from_millis(ms) && gap < Duration::from_millis(ms + 100)
    };
    // batch 0
    assert!(within(gaps[0], 1000), "{:?}", gaps);
    assert!(within(gaps[1], 2000), "{:?}", gaps);
    // batch 1 starts over at the initial delay
    assert!(within(gaps[3], 1000), "{:?}", gaps);
    assert!(within(gaps[4], 2000), "{:?}", gaps);
}

#[tokio::test]
async fn permanent_error_fails_batch_without_retry() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![
        ok("report 1"),
        Err(ProviderError::api(400, "bad request")),
        ok("report 3"),
    ]);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(15)).await.unwrap();

    assert_eq!(summary.outcomes[1].state, BatchState::Failed);
    assert_eq!(summary.outcomes[1].attempts, 1);
    assert_eq!(summary.outcomes[2].state, BatchState::Complete);
    assert_eq!(provider.generate_calls(), 3);
    assert_eq!(summary.report.as_deref(), Some("report 3"));
}

#[tokio::test]
async fn request_limit_stops_before_extraction() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![ok("report 1"), ok("report 2"), ok("report 3")]);
    let mut settings = settings(extractor.temp_dirs());
    settings.request_limit = Some(2);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings);

    let summary = pipeline.run(&video(15)).await.unwrap();

    assert!(summary.limit_reached);
    // the limit caps the bar, not the plan
    assert_eq!(summary.windows, 3);
    assert_eq!(pipeline.progress().length(), Some(2));
    assert_eq!(extractor.extracted(), vec![0, 1]);
    assert_eq!(provider.uploads.lock().unwrap().len(), 2);
    assert_eq!(provider.generate_calls(), 2);
    assert_eq!(summary.report.as_deref(), Some("report 2"));
}

#[tokio::test]
async fn total_batches_caps_the_plan() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![ok("only")]);
    let mut settings = settings(extractor.temp_dirs());
    settings.total_batches = Some(1);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings);

    let summary = pipeline.run(&video(15)).await.unwrap();

    assert_eq!(summary.windows, 1);
    assert_eq!(extractor.extracted(), vec![0]);
    assert!(!summary.limit_reached);
}

#[tokio::test]
async fn upload_failure_skips_only_that_batch() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![ok("report 0"), ok("report 2")])
        .fail_upload("audio_chunk_1.aac");
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(15)).await.unwrap();

    assert_eq!(summary.outcomes[1].state, BatchState::UploadFailed);
    assert_eq!(summary.outcomes[1].attempts, 0);
    assert_eq!(summary.outcomes[2].state, BatchState::Complete);
    assert_eq!(extractor.extracted(), vec![0, 1, 2]);
    assert_eq!(provider.generate_calls(), 2);
    assert_eq!(summary.report.as_deref(), Some("report 2"));
    // only completed batches advance the bar
    assert_eq!(pipeline.progress().position(), 2);
}

#[tokio::test]
async fn first_prompt_follows_first_successful_turn() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![ok("report 1")]).fail_upload("audio_chunk_0.aac");
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    pipeline.run(&video(10)).await.unwrap();

    let requests = provider.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    match &requests[0][0].parts[0] {
        ContentPart::Text(prompt) => assert!(prompt.contains("Executive Summary")),
        other => panic!("expected prompt text, got {:?}", other),
    }
}

#[tokio::test]
async fn cleanup_deletes_every_uploaded_asset() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![
        ok("report 0"),
        Err(ProviderError::api(500, "internal")),
    ])
    .fail_upload("audio_chunk_2.aac");
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(15)).await.unwrap();

    let mut uploaded = provider.uploaded_names();
    let mut deleted = provider.deleted_names();
    uploaded.sort();
    deleted.sort();
    assert_eq!(
        uploaded,
        vec!["files/audio_chunk_0.aac", "files/audio_chunk_1.aac"]
    );
    assert_eq!(deleted, uploaded);
    assert_eq!(summary.cleanup.remote_deleted.len(), 2);
    assert!(summary.cleanup.is_clean());
    for dir in extractor.temp_dirs() {
        assert!(!dir.exists(), "{} still exists", dir.display());
    }
}

#[tokio::test]
async fn delete_failures_do_not_fail_the_run() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![ok("report")]).fail_deletes();
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(5)).await.unwrap();

    assert_eq!(summary.report.as_deref(), Some("report"));
    assert_eq!(summary.cleanup.remote_failed, vec!["files/audio_chunk_0.aac"]);
    assert_eq!(summary.cleanup.remote_attempted(), 1);
    assert!(!summary.cleanup.is_clean());
}

#[tokio::test]
async fn extraction_failure_aborts_after_cleanup() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path()).failing_at(1);
    let provider = ScriptedProvider::new(vec![ok("report 0"), ok("never")]);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let err = pipeline.run(&video(15)).await.unwrap_err();

    assert!(matches!(err, PipelineError::Extraction(ref e) if e.batch == 1));
    assert_eq!(extractor.extracted(), vec![0, 1]);
    assert_eq!(provider.generate_calls(), 1);
    assert_eq!(provider.deleted_names(), vec!["files/audio_chunk_0.aac"]);
    for dir in extractor.temp_dirs() {
        assert!(!dir.exists());
    }
}

#[tokio::test]
async fn empty_video_does_no_work() {
    let root = tempfile::tempdir().unwrap();
    let extractor = FakeExtractor::new(root.path());
    let provider = ScriptedProvider::new(vec![]);
    let pipeline = Pipeline::new(&extractor, &provider, &English, settings(extractor.temp_dirs()));

    let summary = pipeline.run(&video(0)).await.unwrap();

    assert_eq!(summary.windows, 0);
    assert!(summary.outcomes.is_empty());
    assert!(summary.report.is_none());
    assert!(extractor.extracted().is_empty());
    assert_eq!(provider.generate_calls(), 0);
}
