use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::Chunk;

/// Default per-chunk character budget.
pub const DEFAULT_MAX_CHARS: usize = 1500;

const PARAGRAPH_SEP: &str = "\n\n";
const SENTENCE_SEP: &str = " ";

/// Blank line, possibly containing stray spaces or tabs.
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split `text` into reading-ordered chunks of at most `max_chars` characters.
///
/// Paragraphs (blank-line separated) are packed greedily. A paragraph longer than the budget is
/// split after `.`, `!` or `?` followed by whitespace and its sentences are packed the same way.
/// A single sentence longer than the budget is emitted alone rather than truncated.
pub fn segment_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let normalized = normalize_text(text);

    let mut packer = Packer::new(max_chars);
    for para in PARAGRAPH_BREAK
        .split(&normalized)
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        if char_len(para) > max_chars {
            packer.flush();
            for sentence in split_sentences(para) {
                packer.push(sentence, SENTENCE_SEP);
            }
        } else {
            packer.push(para, PARAGRAPH_SEP);
        }
    }
    let chunks = packer.finish();

    debug!(
        input_chars = char_len(&normalized),
        max_chars,
        chunks = chunks.len(),
        "segmented document"
    );
    chunks
}

/// Sentence split: a sentence ends after `.`, `!` or `?` when followed by whitespace.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        if let Some(&(_, next)) = chars.peek() {
            if next.is_whitespace() {
                let sentence = paragraph[start..end].trim();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

struct Packer {
    max_chars: usize,
    buf: String,
    buf_chars: usize,
    out: Vec<Chunk>,
}

impl Packer {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            buf: String::new(),
            buf_chars: 0,
            out: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str, sep: &str) {
        let piece_chars = char_len(piece);
        if !self.buf.is_empty() && self.buf_chars + sep.len() + piece_chars > self.max_chars {
            self.flush();
        }
        if !self.buf.is_empty() {
            self.buf.push_str(sep);
            self.buf_chars += sep.len();
        }
        self.buf.push_str(piece);
        self.buf_chars += piece_chars;
    }

    fn flush(&mut self) {
        let text = self.buf.trim();
        if !text.is_empty() {
            self.out.push(Chunk {
                index: self.out.len(),
                text: text.to_string(),
            });
        }
        self.buf.clear();
        self.buf_chars = 0;
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.out
    }
}
