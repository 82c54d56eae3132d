use std::time::Duration;

use ankigen_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{ChatBackend, ChatMessage};
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: OllamaClient,
    timeout: Duration,
}

impl OllamaChat {
    pub fn new(client: OllamaClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

impl ChatResponse {
    fn into_text(self) -> String {
        self.message
            .map(|m| m.content)
            .filter(|c| !c.is_empty())
            .or(self.response)
            .unwrap_or_default()
    }
}

impl ChatBackend for OllamaChat {
    fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, AppError> {
        let url = format!("{}/api/chat", self.client.base_url());
        let req = ChatRequest {
            model,
            messages,
            stream: false,
        };

        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new("AI_MODEL_CALL_FAILED", "Failed to encode chat request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) if r.status() == 200 => {
                let v: ChatResponse = r.into_json().map_err(|e| {
                    AppError::new("AI_MODEL_CALL_FAILED", "Failed to decode chat response")
                        .with_details(e.to_string())
                })?;
                Ok(v.into_text())
            }
            Ok(r) => Err(
                AppError::new("AI_MODEL_CALL_FAILED", "Chat request failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(code, _)) => Err(AppError::new(
                "AI_MODEL_CALL_FAILED",
                "Chat request failed",
            )
            .with_details(format!("status={code}"))
            .with_retryable(code == 429 || code >= 500)),
            Err(e) => Err(
                AppError::new("AI_MODEL_CALL_FAILED", "Failed to call chat endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
