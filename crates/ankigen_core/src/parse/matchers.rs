use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_DECK;
use crate::error::AppError;

/// Optional list bullet or ordinal before a marker: `- `, `* `, `3. `, `3) `.
const LIST_PREFIX: &str = r"(?:[-*•]\s+|\d{1,3}[.)]\s+)?";
/// Optional markdown emphasis around a marker.
const EMPHASIS: &str = r"(?:\*\*|__)?";

/// Question markers. Single-letter forms need an explicit `:`/`-`.
pub fn default_question_pattern() -> String {
    marker_pattern(&["pregunta", "preg", "question"], "q")
}

/// Answer markers, symmetric with [`default_question_pattern`].
pub fn default_answer_pattern() -> String {
    marker_pattern(&["respuesta", "resp", "answer"], "a")
}

/// Title-looking line: optional `NN.` or roman-numeral prefix, then only Spanish uppercase
/// letters, digits, spaces and `,.:-`. Case-sensitive.
pub const DEFAULT_HEADING_PATTERN: &str = r"^(?:\d{1,2}\.|[IVX]+\.)?\s*[A-ZÁÉÍÓÚÜÑ0-9 ,.:\-]+$";

fn marker_pattern(words: &[&str], letter: &str) -> String {
    format!(
        r"(?i)^{LIST_PREFIX}{EMPHASIS}\s*(?:(?:{words})\b\s*{EMPHASIS}\s*[:\-.]?|{letter}\s*{EMPHASIS}\s*[:\-]){EMPHASIS}\s*(.*)$",
        words = words.join("|"),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Question,
    Answer,
    Heading,
}

impl LineKind {
    fn priority(self) -> u8 {
        match self {
            LineKind::Question => 0,
            LineKind::Answer => 1,
            LineKind::Heading => 2,
        }
    }
}

/// Result of classifying one trimmed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Question(String),
    Answer(String),
    Heading(String),
    Text,
}

/// A user-supplied matcher definition, e.g. from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    pub kind: LineKind,
    pub pattern: String,
}

#[derive(Debug, Clone)]
struct LineMatcher {
    kind: LineKind,
    regex: Regex,
}

/// Ordered set of line matchers, evaluated Question → Answer → Heading.
///
/// Question and answer patterns must capture the marker's remainder as group 1.
#[derive(Debug, Clone)]
pub struct LineMatchers {
    matchers: Vec<LineMatcher>,
}

impl LineMatchers {
    pub fn spanish_default() -> Self {
        Self::from_specs(&Self::default_specs()).expect("built-in line patterns compile")
    }

    pub fn default_specs() -> Vec<PatternSpec> {
        vec![
            PatternSpec {
                kind: LineKind::Question,
                pattern: default_question_pattern(),
            },
            PatternSpec {
                kind: LineKind::Answer,
                pattern: default_answer_pattern(),
            },
            PatternSpec {
                kind: LineKind::Heading,
                pattern: DEFAULT_HEADING_PATTERN.to_string(),
            },
        ]
    }

    pub fn from_specs(specs: &[PatternSpec]) -> Result<Self, AppError> {
        let mut matchers = Vec::with_capacity(specs.len());
        for spec in specs {
            let regex = Regex::new(&spec.pattern).map_err(|e| {
                AppError::new("PARSE_PATTERN_INVALID", "Line pattern failed to compile")
                    .with_details(format!("kind={:?}; err={e}", spec.kind))
            })?;
            if spec.kind != LineKind::Heading && regex.captures_len() < 2 {
                return Err(AppError::new(
                    "PARSE_PATTERN_INVALID",
                    "Question/answer patterns must capture the line remainder",
                )
                .with_details(format!("kind={:?}; pattern={}", spec.kind, spec.pattern)));
            }
            matchers.push(LineMatcher {
                kind: spec.kind,
                regex,
            });
        }
        matchers.sort_by_key(|m| m.kind.priority());
        Ok(Self { matchers })
    }

    /// Classify an already-trimmed, non-empty line.
    pub fn classify(&self, line: &str) -> LineClass {
        for m in &self.matchers {
            let Some(caps) = m.regex.captures(line) else {
                continue;
            };
            let rest = || {
                caps.get(1)
                    .map(|g| g.as_str().trim().to_string())
                    .unwrap_or_default()
            };
            match m.kind {
                LineKind::Question => return LineClass::Question(rest()),
                LineKind::Answer => return LineClass::Answer(rest()),
                LineKind::Heading => {
                    if line.chars().any(char::is_alphabetic) {
                        return LineClass::Heading(heading_name(line));
                    }
                }
            }
        }
        LineClass::Text
    }
}

impl Default for LineMatchers {
    fn default() -> Self {
        Self::spanish_default()
    }
}

fn heading_name(line: &str) -> String {
    let name = line.trim().trim_end_matches(':').trim();
    if name.is_empty() {
        DEFAULT_DECK.to_string()
    } else {
        name.to_string()
    }
}
