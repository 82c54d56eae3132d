//! Recovers deck headings and question/answer pairs from free-text model replies.
//!
//! Parsing is line-oriented and never fails: lines that fit no pattern are ignored unless an
//! answer is being collected, in which case they extend it.

use once_cell::sync::Lazy;
use tracing::debug;

use crate::decks::DeckMap;
use crate::domain::{Card, DEFAULT_DECK};

pub mod matchers;

pub use matchers::{LineClass, LineKind, LineMatchers, PatternSpec};

static DEFAULT_PARSER: Lazy<ResponseParser> = Lazy::new(ResponseParser::default);

/// Parse one reply with the built-in Spanish/English matchers.
pub fn parse_reply(reply: &str) -> DeckMap {
    DEFAULT_PARSER.parse(reply)
}

#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    matchers: LineMatchers,
}

impl ResponseParser {
    pub fn new(matchers: LineMatchers) -> Self {
        Self { matchers }
    }

    pub fn parse(&self, reply: &str) -> DeckMap {
        let mut state = ParserState::new();
        for raw in reply.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("---") {
                continue;
            }
            state.step(line, self.matchers.classify(line));
        }
        let decks = state.finish();
        debug!(decks = decks.len(), cards = decks.total_cards(), "parsed model reply");
        decks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingAnswer,
    CollectingAnswer,
}

/// Per-reply state; nothing here outlives a single `parse` call.
struct ParserState {
    decks: DeckMap,
    current_deck: String,
    question: String,
    answer_lines: Vec<String>,
    phase: Phase,
}

impl ParserState {
    fn new() -> Self {
        Self {
            decks: DeckMap::new(),
            current_deck: DEFAULT_DECK.to_string(),
            question: String::new(),
            answer_lines: Vec::new(),
            phase: Phase::Idle,
        }
    }

    fn step(&mut self, line: &str, class: LineClass) {
        match class {
            LineClass::Question(text) => {
                self.flush();
                self.question = text;
                self.phase = Phase::AwaitingAnswer;
            }
            LineClass::Answer(text) => {
                if self.phase == Phase::CollectingAnswer {
                    // A second answer marker closes the previous pair; the new answer has no
                    // question left to attach to.
                    self.flush();
                }
                if self.question.is_empty() {
                    self.phase = Phase::Idle;
                    return;
                }
                self.answer_lines.clear();
                if !text.is_empty() {
                    self.answer_lines.push(text);
                }
                self.phase = Phase::CollectingAnswer;
            }
            LineClass::Heading(name) => match self.phase {
                Phase::CollectingAnswer => {
                    self.flush();
                    self.current_deck = name;
                }
                Phase::Idle => self.current_deck = name,
                Phase::AwaitingAnswer => {
                    if self.question.is_empty() {
                        self.question = line.to_string();
                    }
                }
            },
            LineClass::Text => match self.phase {
                Phase::CollectingAnswer => self.answer_lines.push(line.to_string()),
                Phase::AwaitingAnswer if self.question.is_empty() => {
                    self.question = line.to_string();
                }
                _ => {}
            },
        }
    }

    /// Emit the pending pair if it is complete, then clear it and return to idle.
    fn flush(&mut self) {
        let question = std::mem::take(&mut self.question);
        let answer = std::mem::take(&mut self.answer_lines).join(" ");
        let (question, answer) = (question.trim(), answer.trim());
        if !question.is_empty() && !answer.is_empty() {
            self.decks
                .push_card(&self.current_deck, Card::new(question, answer));
        }
        self.phase = Phase::Idle;
    }

    fn finish(mut self) -> DeckMap {
        self.flush();
        self.decks
    }
}
