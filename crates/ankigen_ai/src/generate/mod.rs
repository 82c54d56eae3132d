//! Sequential driver: segment → model → parse → accumulate → limit.
//!
//! Chunks are submitted strictly in order because each call extends the same conversation.

use ankigen_core::decks::{limit_decks, DeckMap};
use ankigen_core::error::AppError;
use ankigen_core::parse::ResponseParser;
use ankigen_core::progress::{ProgressSink, ProgressSnapshot, ProgressStatus};
use ankigen_core::segment::segment_text;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conversation::Conversation;
use crate::llm::ModelSession;

mod prompts;

pub use prompts::system_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub max_chars: usize,
    pub max_decks: usize,
}

/// State owned by one generation request. Nothing here is shared between requests.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub conversation: Conversation,
    pub decks: DeckMap,
    /// 1-based indexes of chunks whose reply produced no cards.
    pub empty_chunks: Vec<usize>,
}

impl ProcessingContext {
    pub fn new(history_window: usize) -> Self {
        Self {
            conversation: Conversation::new(history_window),
            decks: DeckMap::new(),
            empty_chunks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub decks: DeckMap,
    pub chunk_count: usize,
    pub empty_chunks: Vec<usize>,
    pub total_cards: usize,
}

pub fn generate_decks(
    text: &str,
    opts: &GenerateOptions,
    session: &ModelSession<'_>,
    parser: &ResponseParser,
    ctx: &mut ProcessingContext,
    progress: &dyn ProgressSink,
) -> Result<GenerationOutcome, AppError> {
    let mut snapshot = ProgressSnapshot::default();
    let result = run(text, opts, session, parser, ctx, progress, &mut snapshot);
    if let Err(e) = &result {
        snapshot.status = ProgressStatus::Error;
        snapshot.message = e.message.clone();
        snapshot.debug = e.to_string();
        progress.publish(&snapshot);
    }
    result
}

fn run(
    text: &str,
    opts: &GenerateOptions,
    session: &ModelSession<'_>,
    parser: &ResponseParser,
    ctx: &mut ProcessingContext,
    progress: &dyn ProgressSink,
    snapshot: &mut ProgressSnapshot,
) -> Result<GenerationOutcome, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::new(
            "GENERATE_EMPTY_TEXT",
            "No text could be extracted from the document",
        ));
    }

    let chunks = segment_text(text, opts.max_chars);
    let total = chunks.len();
    info!(chunks = total, max_chars = opts.max_chars, "processing document");

    snapshot.total = total;
    snapshot.current = 0;
    snapshot.status = ProgressStatus::Processing;
    snapshot.message = "Processing document".to_string();
    snapshot.debug = format!("Split into {total} chunks");
    progress.publish(snapshot);

    let prompt = system_prompt(opts.max_decks);
    for chunk in &chunks {
        let n = chunk.index + 1;
        snapshot.debug = format!("Sending chunk {n}/{total} to the model");
        progress.publish(snapshot);

        let first = chunk.index == 0;
        let reply = session.call(
            &mut ctx.conversation,
            &chunk.text,
            first,
            first.then_some(prompt.as_str()),
        )?;

        let parsed = parser.parse(&reply);
        if parsed.total_cards() == 0 {
            warn!(chunk = n, total, "chunk produced no cards");
            ctx.empty_chunks.push(n);
        }
        ctx.decks.merge(parsed);

        snapshot.current = n;
        snapshot.debug = format!("Chunk {n}/{total} processed");
        snapshot.partial_decks = ctx.decks.clone();
        progress.publish(snapshot);
        info!(chunk = n, total, cards = ctx.decks.total_cards(), "chunk processed");
    }

    let total_cards = ctx.decks.total_cards();
    if total_cards == 0 {
        return Err(AppError::new(
            "GENERATE_NO_CARDS",
            "No flashcards were generated from the text",
        )
        .with_details(format!("chunks={total}")));
    }

    let decks = limit_decks(ctx.decks.clone(), opts.max_decks);

    snapshot.status = ProgressStatus::Completed;
    snapshot.partial_decks = decks.clone();
    if ctx.empty_chunks.is_empty() {
        snapshot.message = "Flashcards generated".to_string();
        snapshot.debug = "Generation complete".to_string();
    } else {
        snapshot.message = format!(
            "Generation completed with warnings: {} chunks without cards",
            ctx.empty_chunks.len()
        );
        snapshot.debug = format!("Chunks without cards: {:?}", ctx.empty_chunks);
        warn!(empty_chunks = ?ctx.empty_chunks, "some chunks produced no cards");
    }
    progress.publish(snapshot);
    info!(decks = decks.len(), total_cards, "generation complete");

    Ok(GenerationOutcome {
        decks,
        chunk_count: total,
        empty_chunks: ctx.empty_chunks.clone(),
        total_cards,
    })
}
