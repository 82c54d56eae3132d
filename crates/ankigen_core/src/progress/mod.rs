use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::decks::DeckMap;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
}

/// What a UI sees when it polls a running generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub current: usize,
    pub total: usize,
    pub status: ProgressStatus,
    pub message: String,
    pub debug: String,
    pub partial_decks: DeckMap,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.current.min(self.total) * 100) / self.total) as u8
    }
}

/// Write-only progress channel used by the generation driver.
pub trait ProgressSink {
    fn publish(&self, snapshot: &ProgressSnapshot);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn publish(&self, _snapshot: &ProgressSnapshot) {}
}

/// Latest snapshot behind a shared lock, readable from another thread while a request runs.
#[derive(Debug, Clone, Default)]
pub struct SharedProgress {
    inner: Arc<Mutex<ProgressSnapshot>>,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressSink for SharedProgress {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = snapshot.clone();
    }
}
