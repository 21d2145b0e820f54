use std::io;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelscribe::i18n::{self, Selection};
use reelscribe::{
    media, AnalysisConfig, AnalysisMode, Args, FfmpegExtractor, GeminiClient, Language, Messages,
    Pipeline, PipelineSettings, PromptBuilder,
};

const RULE: &str = "----------------------------------------------------------------------";

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("reelscribe=info"))?;

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .with(env_filter)
            .init();
    }
    Ok(())
}

/// Free-text answer; an empty answer selects the default.
fn ask(question: &str) -> anyhow::Result<String> {
    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(question)
        .allow_empty(true)
        .interact_text()?;
    Ok(answer.trim().to_string())
}

fn choose_language(preset: Option<&str>) -> anyhow::Result<Language> {
    // The question is asked in Turkish until a language is chosen.
    let asking = i18n::catalog(Language::Turkish);
    let input = match preset {
        Some(value) => value.to_string(),
        None => ask(&asking.prompt_language())?,
    };
    let selection = i18n::resolve_language(&input);
    match selection {
        Selection::Defaulted(_) => println!("{}", asking.defaulting_language()),
        Selection::Unrecognized(_) => println!("{}", asking.unknown_language(&input)),
        Selection::Chosen(_) => {}
    }
    let language = selection.value();
    println!("{}", i18n::catalog(language).language_confirmed(language));
    Ok(language)
}

fn choose_mode(messages: &dyn Messages, preset: Option<&str>) -> anyhow::Result<AnalysisMode> {
    let input = match preset {
        Some(value) => value.to_string(),
        None => ask(&messages.prompt_mode())?,
    };
    let selection = i18n::resolve_mode(&input);
    let mode = selection.value();
    match selection {
        Selection::Chosen(_) => println!("{}", messages.mode_confirmed(mode)),
        Selection::Defaulted(_) | Selection::Unrecognized(_) => {
            println!("{}", messages.defaulting_mode(mode))
        }
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    let started_at = Instant::now();

    let args = Args::parse();
    let config = match AnalysisConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let language = choose_language(args.language.as_deref())?;
    let messages = i18n::catalog(language);
    let mode = choose_mode(messages, args.mode.as_deref())?;

    if !config.video.is_file() {
        eprintln!("{}", messages.video_not_found(&config.video));
        std::process::exit(1);
    }

    let video = media::probe(&config.video)
        .with_context(|| format!("Failed to read {}", config.video.display()))?;
    info!(
        video = %video.path.display(),
        duration_secs = video.duration.as_secs_f64(),
        model = %config.model,
        "Starting analysis"
    );

    let provider =
        GeminiClient::with_base_url(config.api_key.clone(), config.model.clone(), &config.api_base);
    let extractor =
        FfmpegExtractor::new(&config.frames_dir, &config.audio_dir, config.frame_interval);
    let settings = PipelineSettings {
        batch_length: config.batch_length,
        total_batches: config.total_batches,
        request_limit: config.request_limit,
        retry: config.retry,
        prompts: PromptBuilder::new(language, mode),
        model: config.model.clone(),
        temp_dirs: config.temp_dirs(),
    };

    println!("{}", RULE);
    let pipeline = Pipeline::new(&extractor, &provider, messages, settings);
    let summary = match pipeline.run(&video).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Run aborted: {}", e);
            eprintln!("{}", messages.process_error(&e.to_string()));
            std::process::exit(1);
        }
    };

    println!("\n{}", messages.final_report());
    println!("{}", RULE);
    match &summary.report {
        Some(report) => println!("{}", report),
        None => println!("{}", messages.no_report()),
    }
    println!("{}", RULE);

    info!(
        completed = summary.completed(),
        skipped = summary.skipped(),
        remote_cleanup_failures = summary.cleanup.remote_failed.len(),
        "Run finished"
    );
    println!("\n{}", messages.finished(started_at.elapsed()));
    Ok(())
}
