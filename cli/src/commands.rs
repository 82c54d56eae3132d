use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use ankigen_ai::generate::{generate_decks, GenerateOptions, ProcessingContext};
use ankigen_ai::llm::ollama_chat::OllamaChat;
use ankigen_ai::llm::ModelSession;
use ankigen_ai::ocr::VisionOcr;
use ankigen_ai::ollama::OllamaClient;
use ankigen_ai::transcript::Transcript;
use ankigen_core::config::AppConfig;
use ankigen_core::error::AppError;
use ankigen_core::extract::{extract_text, extract_text_with, SourceFormat};
use ankigen_core::package::build_apkg;
use ankigen_core::parse::{LineMatchers, ResponseParser};
use ankigen_core::progress::{ProgressSnapshot, ProgressStatus, SharedProgress};
use ankigen_core::segment::segment_text;
use time::OffsetDateTime;
use tracing::info;

const PROGRESS_POLL: Duration = Duration::from_millis(200);

/// Command-line flags take precedence over the config file.
pub fn apply_overrides(
    cfg: &mut AppConfig,
    max_chars: Option<usize>,
    max_decks: Option<usize>,
    model: Option<String>,
) {
    if let Some(v) = max_chars {
        cfg.segmenter.max_chars = v.max(1);
    }
    if let Some(v) = max_decks {
        cfg.decks.max_decks = v.max(1);
    }
    if let Some(v) = model.filter(|m| !m.trim().is_empty()) {
        cfg.model.model = v;
    }
}

pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "flashcards".to_string());
    PathBuf::from(format!("{stem}.apkg"))
}

pub fn build_parser(cfg: &AppConfig) -> Result<ResponseParser, AppError> {
    if cfg.parser.patterns.is_empty() {
        return Ok(ResponseParser::default());
    }
    Ok(ResponseParser::new(LineMatchers::from_specs(&cfg.parser.patterns)?))
}

fn ollama_backend(cfg: &AppConfig) -> Result<OllamaChat, AppError> {
    let client = OllamaClient::new(&cfg.model.base_url)?;
    Ok(OllamaChat::new(client, Duration::from_secs(cfg.model.timeout_secs)))
}

/// Extract text, reading images through the configured vision model.
fn extract(cfg: &AppConfig, input: &Path) -> Result<String, AppError> {
    let vision_model = cfg.model.vision_model.trim();
    if vision_model.is_empty() || SourceFormat::from_path(input) != SourceFormat::Image {
        return extract_text(input);
    }
    let backend = ollama_backend(cfg)?;
    extract_text_with(input, &VisionOcr::new(&backend, vision_model))
}

/// One status line per change of the observed snapshot.
fn progress_line(s: &ProgressSnapshot) -> Option<String> {
    match s.status {
        ProgressStatus::Processing => Some(format!("[{:>3}%] {}", s.percent(), s.debug)),
        ProgressStatus::Completed => Some(format!("[100%] {}", s.message)),
        ProgressStatus::Idle | ProgressStatus::Error => None,
    }
}

pub fn generate(cfg: &AppConfig, input: &Path, output: &Path) -> Result<(), AppError> {
    let text = extract(cfg, input)?;
    let parser = build_parser(cfg)?;
    let backend = ollama_backend(cfg)?;
    let opts = GenerateOptions {
        max_chars: cfg.segmenter.max_chars,
        max_decks: cfg.decks.max_decks,
    };

    // The model calls run on a worker; this thread watches the shared snapshot.
    let progress = SharedProgress::new();
    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            let mut session = ModelSession::from_config(&backend, &cfg.model);
            if let Some(path) = &cfg.logging.transcript {
                let transcript = Transcript::new(path);
                info!(path = %transcript.path().display(), "recording prompt transcript");
                session = session.with_transcript(transcript);
            }
            info!(input = %input.display(), model = %session.model(), "starting generation");
            let mut ctx = ProcessingContext::new(cfg.model.history_window);
            generate_decks(&text, &opts, &session, &parser, &mut ctx, &progress)
        });

        let mut last = None;
        loop {
            let finished = worker.is_finished();
            let line = progress_line(&progress.snapshot());
            if line.is_some() && line != last {
                if let Some(l) = &line {
                    eprintln!("{l}");
                }
                last = line;
            }
            if finished {
                break;
            }
            thread::sleep(PROGRESS_POLL);
        }
        worker.join().map_err(|_| {
            AppError::new("GENERATE_WORKER_PANICKED", "Generation worker stopped unexpectedly")
        })?
    })?;

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let summary = build_apkg(&outcome.decks, output, now)?;

    for deck in &outcome.decks {
        println!("{:>4}  {}", deck.cards.len(), deck.name);
    }
    println!(
        "wrote {} ({} decks, {} notes)",
        summary.path.display(),
        summary.decks,
        summary.notes
    );
    if !outcome.empty_chunks.is_empty() {
        println!("warning: chunks without cards: {:?}", outcome.empty_chunks);
    }
    Ok(())
}

pub fn preview(cfg: &AppConfig, input: &Path) -> Result<(), AppError> {
    let text = extract(cfg, input)?;
    let chunks = segment_text(&text, cfg.segmenter.max_chars);
    println!(
        "{} chars -> {} chunks (max {})",
        text.chars().count(),
        chunks.len(),
        cfg.segmenter.max_chars
    );
    for c in &chunks {
        let head: String = c.text.chars().take(60).collect();
        println!("{:>4}  {:>5}  {}", c.index + 1, c.char_len(), head.replace('\n', " "));
    }
    Ok(())
}

pub fn parse(cfg: &AppConfig, reply: &Path) -> Result<(), AppError> {
    let raw = fs::read(reply).map_err(|e| {
        AppError::new("REPLY_READ_FAILED", "Failed to read reply file")
            .with_details(format!("path={}; err={e}", reply.display()))
    })?;
    let decks = build_parser(cfg)?.parse(&String::from_utf8_lossy(&raw));
    let json = serde_json::to_string_pretty(&decks).map_err(|e| {
        AppError::new("REPLY_ENCODE_FAILED", "Failed to encode decks").with_details(e.to_string())
    })?;
    println!("{json}");
    Ok(())
}

pub fn health(cfg: &AppConfig) -> Result<(), AppError> {
    let client = OllamaClient::new(&cfg.model.base_url)?;
    client.health_check()?;
    println!("ok: {}", client.base_url());
    Ok(())
}
