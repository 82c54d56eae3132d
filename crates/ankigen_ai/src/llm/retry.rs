use std::thread;
use std::time::Duration;

use ankigen_core::config::ModelConfig;
use ankigen_core::error::AppError;
use tracing::{debug, info, warn};

use super::{ChatBackend, ChatRole};
use crate::conversation::Conversation;
use crate::transcript::Transcript;

/// Exponential backoff across a fixed attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based): `initial * 2^(attempt-1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_delay.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// A model name, backend and retry policy bound together for one request.
pub struct ModelSession<'a> {
    backend: &'a dyn ChatBackend,
    model: String,
    policy: RetryPolicy,
    transcript: Option<Transcript>,
}

impl<'a> ModelSession<'a> {
    pub fn new(backend: &'a dyn ChatBackend, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            model: model.into(),
            policy,
            transcript: None,
        }
    }

    /// Append every prompt and reply of this session to `transcript`.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn from_config(backend: &'a dyn ChatBackend, cfg: &ModelConfig) -> Self {
        Self::new(
            backend,
            cfg.model.clone(),
            RetryPolicy {
                max_attempts: cfg.max_attempts,
                initial_delay: Duration::from_millis(cfg.initial_backoff_ms),
            },
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as the next user turn and return the assistant reply.
    ///
    /// With `reset`, history is cleared first and `system_prompt` installed. Transient failures
    /// are retried with exponential backoff; once the budget is spent the call fails with
    /// `AI_MODEL_RETRIES_EXHAUSTED`. Non-retryable failures are returned immediately.
    pub fn call(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
        reset: bool,
        system_prompt: Option<&str>,
    ) -> Result<String, AppError> {
        if reset {
            conversation.reset(system_prompt);
        }
        if let Some(t) = &self.transcript {
            if let Some(sys) = system_prompt.filter(|_| reset) {
                t.record(ChatRole::System, sys);
            }
            t.record(ChatRole::User, prompt);
        }
        conversation.push_user(prompt);
        let messages = conversation.window();

        let summary: String = prompt.chars().take(100).collect();
        info!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            messages = messages.len(),
            "sending prompt to model"
        );
        debug!(summary = %summary, "prompt summary");

        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.backend.complete(&self.model, &messages) {
                Ok(reply) => {
                    conversation.push_assistant(&reply);
                    if let Some(t) = &self.transcript {
                        t.record(ChatRole::Assistant, &reply);
                    }
                    debug!(attempt, reply_chars = reply.chars().count(), "model replied");
                    return Ok(reply);
                }
                Err(e) if !e.retryable => return Err(e),
                Err(e) if attempt >= attempts => {
                    warn!(attempts, error = %e, "model call failed after all attempts");
                    return Err(AppError::new(
                        "AI_MODEL_RETRIES_EXHAUSTED",
                        format!("Model call failed after {attempts} attempts"),
                    )
                    .with_details(e.to_string()));
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        attempts,
                        delay_ms = millis(delay),
                        error = %e,
                        "model call failed; retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_each_attempt() {
        let p = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
        };
        let delays: Vec<_> = (1..=4).map(|a| p.delay_after(a).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800]);
    }

    #[test]
    fn delay_does_not_overflow() {
        let p = RetryPolicy {
            max_attempts: u32::MAX,
            initial_delay: Duration::from_secs(u64::MAX / 2),
        };
        assert_eq!(p.delay_after(40), Duration::MAX);
    }

    #[test]
    fn logged_delay_saturates_instead_of_wrapping() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
