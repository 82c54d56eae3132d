use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use ankigen_ai::generate::{generate_decks, GenerateOptions, ProcessingContext};
use ankigen_ai::llm::{ChatBackend, ChatMessage, ChatRole, ModelSession, RetryPolicy};
use ankigen_ai::transcript::Transcript;
use ankigen_core::domain::Card;
use ankigen_core::error::AppError;
use ankigen_core::parse::ResponseParser;
use ankigen_core::progress::{NoopProgress, ProgressStatus, SharedProgress};
use pretty_assertions::assert_eq;

/// Replays scripted replies in order; echoes the last user message once the script runs out.
#[derive(Default)]
struct MockBackend {
    replies: RefCell<VecDeque<Result<String, AppError>>>,
    seen: RefCell<Vec<Vec<ChatMessage>>>,
}

impl MockBackend {
    fn scripted(replies: Vec<Result<String, AppError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl ChatBackend for MockBackend {
    fn complete(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, AppError> {
        self.seen.borrow_mut().push(messages.to_vec());
        match self.replies.borrow_mut().pop_front() {
            Some(r) => r,
            None => Ok(messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default()),
        }
    }
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::ZERO,
    }
}

fn opts(max_chars: usize, max_decks: usize) -> GenerateOptions {
    GenerateOptions {
        max_chars,
        max_decks,
    }
}

fn transient() -> AppError {
    AppError::new("AI_MODEL_CALL_FAILED", "boom").with_retryable(true)
}

#[test]
fn echoed_document_becomes_decks_in_order() {
    let backend = MockBackend::default();
    let session = ModelSession::new(&backend, "mock", fast_policy(1));
    let mut ctx = ProcessingContext::new(10);
    let text = "TEMA UNO\n\nPregunta: ¿Qué es X?\nRespuesta: Es Y.\n\nTEMA DOS\n\nPregunta: ¿Qué es Z?\nRespuesta: Es W.";

    let out = generate_decks(
        text,
        &opts(1500, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &NoopProgress,
    )
    .expect("generate");

    assert_eq!(out.chunk_count, 1);
    assert_eq!(out.total_cards, 2);
    assert!(out.empty_chunks.is_empty());
    assert_eq!(out.decks.names(), vec!["TEMA UNO", "TEMA DOS"]);
    assert_eq!(
        out.decks.get("TEMA UNO").expect("deck"),
        &[Card::new("¿Qué es X?", "Es Y.")][..]
    );
    assert_eq!(
        out.decks.get("TEMA DOS").expect("deck"),
        &[Card::new("¿Qué es Z?", "Es W.")][..]
    );
}

#[test]
fn system_prompt_is_sent_and_history_carries_over() {
    let backend = MockBackend::scripted(vec![
        Ok("TEMA A\nPregunta: uno?\nRespuesta: 1".to_string()),
        Ok("Pregunta: dos?\nRespuesta: 2".to_string()),
    ]);
    let session = ModelSession::new(&backend, "mock", fast_policy(1));
    let mut ctx = ProcessingContext::new(10);

    let out = generate_decks(
        "Primer bloque.\n\nSegundo bloque.",
        &opts(16, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &NoopProgress,
    )
    .expect("generate");
    assert_eq!(out.chunk_count, 2);

    let seen = backend.seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0][0].role, ChatRole::System);
    assert!(seen[0][0].content.contains("máximo 6 temas"));
    assert_eq!(seen[0].len(), 2);

    // Second request: system prompt, first exchange, new chunk.
    let roles: Vec<_> = seen[1].iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
    );
    assert_eq!(seen[1][3].content, "Segundo bloque.");

    // Chunk two has no heading, so its card lands in General.
    assert_eq!(out.decks.names(), vec!["TEMA A", "General"]);
}

#[test]
fn transient_failures_are_retried() {
    let backend = MockBackend::scripted(vec![
        Err(transient()),
        Err(transient()),
        Ok("Pregunta: q?\nRespuesta: a".to_string()),
    ]);
    let session = ModelSession::new(&backend, "mock", fast_policy(5));
    let mut ctx = ProcessingContext::new(10);

    let out = generate_decks(
        "Texto corto.",
        &opts(1500, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &NoopProgress,
    )
    .expect("generate");
    assert_eq!(out.total_cards, 1);
    assert_eq!(backend.seen.borrow().len(), 3);
}

#[test]
fn exhausted_retries_abort_and_report_error() {
    let backend = MockBackend::scripted((0..3).map(|_| Err(transient())).collect());
    let session = ModelSession::new(&backend, "mock", fast_policy(3));
    let mut ctx = ProcessingContext::new(10);
    let progress = SharedProgress::new();

    let err = generate_decks(
        "Texto corto.",
        &opts(1500, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &progress,
    )
    .expect_err("should fail");

    assert_eq!(err.code, "AI_MODEL_RETRIES_EXHAUSTED");
    assert_eq!(backend.seen.borrow().len(), 3);
    assert_eq!(progress.snapshot().status, ProgressStatus::Error);
}

#[test]
fn non_retryable_failure_is_not_retried() {
    let backend = MockBackend::scripted(vec![Err(AppError::new("AI_MODEL_CALL_FAILED", "bad request"))]);
    let session = ModelSession::new(&backend, "mock", fast_policy(5));
    let mut ctx = ProcessingContext::new(10);

    let err = generate_decks(
        "Texto corto.",
        &opts(1500, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &NoopProgress,
    )
    .expect_err("should fail");
    assert_eq!(err.code, "AI_MODEL_CALL_FAILED");
    assert_eq!(backend.seen.borrow().len(), 1);
}

#[test]
fn empty_text_is_rejected_before_any_call() {
    let backend = MockBackend::default();
    let session = ModelSession::new(&backend, "mock", fast_policy(1));
    let mut ctx = ProcessingContext::new(10);

    let err = generate_decks(
        "  \n\t ",
        &opts(1500, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &NoopProgress,
    )
    .expect_err("should fail");
    assert_eq!(err.code, "GENERATE_EMPTY_TEXT");
    assert!(backend.seen.borrow().is_empty());
}

#[test]
fn replies_without_cards_fail_generation() {
    let backend = MockBackend::scripted(vec![Ok("Lo siento, no puedo ayudar.".to_string())]);
    let session = ModelSession::new(&backend, "mock", fast_policy(1));
    let mut ctx = ProcessingContext::new(10);
    let progress = SharedProgress::new();

    let err = generate_decks(
        "Texto corto.",
        &opts(1500, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &progress,
    )
    .expect_err("should fail");
    assert_eq!(err.code, "GENERATE_NO_CARDS");
    assert_eq!(ctx.empty_chunks, vec![1]);
    assert_eq!(progress.snapshot().status, ProgressStatus::Error);
}

#[test]
fn empty_chunk_is_reported_as_warning() {
    let backend = MockBackend::scripted(vec![
        Ok("Pregunta: q?\nRespuesta: a".to_string()),
        Ok("sin tarjetas".to_string()),
    ]);
    let session = ModelSession::new(&backend, "mock", fast_policy(1));
    let mut ctx = ProcessingContext::new(10);
    let progress = SharedProgress::new();

    let out = generate_decks(
        "Primer bloque.\n\nSegundo bloque.",
        &opts(16, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &progress,
    )
    .expect("generate");

    assert_eq!(out.empty_chunks, vec![2]);
    let snap = progress.snapshot();
    assert_eq!(snap.status, ProgressStatus::Completed);
    assert_eq!(snap.current, 2);
    assert_eq!(snap.total, 2);
    assert_eq!(snap.percent(), 100);
    assert!(snap.message.contains("warnings"));
    assert_eq!(snap.partial_decks, out.decks);
}

#[test]
fn deck_count_is_limited_after_accumulation() {
    let reply: String = (1..=7)
        .map(|i| format!("TEMA {i}\nPregunta: q{i}?\nRespuesta: a{i}\n"))
        .collect();
    let backend = MockBackend::scripted(vec![Ok(reply)]);
    let session = ModelSession::new(&backend, "mock", fast_policy(1));
    let mut ctx = ProcessingContext::new(10);

    let out = generate_decks(
        "Texto corto.",
        &opts(1500, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &NoopProgress,
    )
    .expect("generate");

    assert_eq!(out.total_cards, 7);
    assert_eq!(
        out.decks.names(),
        vec!["TEMA 1", "TEMA 2", "TEMA 3", "TEMA 4", "TEMA 5", "General"]
    );
    assert_eq!(
        out.decks.get("General").expect("general"),
        &[Card::new("q6?", "a6"), Card::new("q7?", "a7")][..]
    );
}

#[test]
fn transcript_records_prompts_and_replies_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("prompts_log.txt");
    let backend = MockBackend::scripted(vec![
        Ok("Pregunta: uno?\nRespuesta: 1".to_string()),
        Ok("Pregunta: dos?\nRespuesta: 2".to_string()),
    ]);
    let session =
        ModelSession::new(&backend, "mock", fast_policy(1)).with_transcript(Transcript::new(&log));
    let mut ctx = ProcessingContext::new(10);

    generate_decks(
        "Primer bloque.\n\nSegundo bloque.",
        &opts(16, 6),
        &session,
        &ResponseParser::default(),
        &mut ctx,
        &NoopProgress,
    )
    .expect("generate");

    let raw = std::fs::read_to_string(&log).expect("transcript written");
    let roles: Vec<_> = raw
        .lines()
        .filter(|l| l.starts_with('['))
        .filter_map(|l| l.rsplit_once("] ").map(|(_, role)| role))
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user", "assistant"]);
    assert!(raw.contains("Segundo bloque."));
    assert!(raw.contains("Pregunta: dos?\nRespuesta: 2"));
}
