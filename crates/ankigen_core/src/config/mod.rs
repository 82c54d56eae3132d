//! Layered configuration: built-in defaults, then an optional TOML file, then environment
//! overrides for the model endpoint.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::parse::PatternSpec;
use crate::segment::DEFAULT_MAX_CHARS;

pub const DEFAULT_MAX_DECKS: usize = 6;
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "mixtral:8x22b";
pub const DEFAULT_VISION_MODEL: &str = "llava";
pub const DEFAULT_TIMEOUT_SECS: u64 = 240;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

pub const ENV_BASE_URL: &str = "ANKIGEN_BASE_URL";
pub const ENV_MODEL: &str = "ANKIGEN_MODEL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub segmenter: SegmenterConfig,
    pub decks: DecksConfig,
    pub model: ModelConfig,
    pub parser: ParserConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmenterConfig {
    pub max_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecksConfig {
    pub max_decks: usize,
}

impl Default for DecksConfig {
    fn default() -> Self {
        Self {
            max_decks: DEFAULT_MAX_DECKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    /// Non-system messages kept in the rolling conversation window.
    pub history_window: usize,
    /// Vision model used to read text from image inputs. Empty disables OCR.
    pub vision_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            history_window: DEFAULT_HISTORY_WINDOW,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

/// Optional replacement line patterns. Empty means the built-in matchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    pub patterns: Vec<PatternSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, every prompt and reply is appended here with a timestamp.
    pub transcript: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            transcript: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Failed to parse config file")
                .with_details(e.to_string())
        })
    }

    /// Apply `ANKIGEN_*` overrides from the given environment map. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, env: &HashMap<String, String>) {
        if let Some(v) = env.get(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.model.base_url = v.trim().to_string();
        }
        if let Some(v) = env.get(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.model.model = v.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |field: &str, value: String| {
            AppError::new("CONFIG_INVALID", "Config value out of range")
                .with_details(format!("{field}={value}"))
        };
        if self.segmenter.max_chars == 0 {
            return Err(invalid("segmenter.max_chars", "0".to_string()));
        }
        if self.decks.max_decks == 0 {
            return Err(invalid("decks.max_decks", "0".to_string()));
        }
        if self.model.max_attempts == 0 {
            return Err(invalid("model.max_attempts", "0".to_string()));
        }
        if self.model.history_window < 2 {
            return Err(invalid(
                "model.history_window",
                self.model.history_window.to_string(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(invalid("model.model", "\"\"".to_string()));
        }
        Ok(())
    }
}

/// Load config from `path` (defaults when `None` or the file does not exist), apply process
/// environment overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let mut cfg = match path {
        Some(p) if p.exists() => {
            let raw = fs::read_to_string(p).map_err(|e| {
                AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
                    .with_details(format!("path={}; err={e}", p.display()))
            })?;
            AppConfig::from_toml_str(&raw)?
        }
        _ => AppConfig::default(),
    };
    cfg.apply_env_overrides(&std::env::vars().collect());
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.segmenter.max_chars, 1500);
        assert_eq!(cfg.decks.max_decks, 6);
        assert_eq!(cfg.model.max_attempts, 5);
        assert_eq!(cfg.model.history_window, 10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_replace_model_endpoint() {
        let mut cfg = AppConfig::default();
        let env = HashMap::from([
            (ENV_BASE_URL.to_string(), "http://10.0.0.5:11434".to_string()),
            (ENV_MODEL.to_string(), "  ".to_string()),
        ]);
        cfg.apply_env_overrides(&env);
        assert_eq!(cfg.model.base_url, "http://10.0.0.5:11434");
        assert_eq!(cfg.model.model, DEFAULT_MODEL);
    }
}
