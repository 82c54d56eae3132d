use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

use crate::llm::ChatRole;

/// Append-only log of every prompt and reply exchanged with the model.
///
/// Entries look like `[<rfc3339>] <role>` followed by the content and a blank line. Write
/// failures are logged and never interrupt generation.
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, role: ChatRole, content: &str) {
        let entry = format!("[{}] {}\n{}\n\n", now_rfc3339_utc(), role.as_str(), content);
        if let Err(e) = self.append(&entry) {
            warn!(path = %self.path.display(), error = %e, "failed to write transcript");
        }
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        f.write_all(entry.as_bytes())
    }
}

fn now_rfc3339_utc() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
