use std::collections::VecDeque;

use crate::llm::{ChatMessage, ChatRole};

/// Rolling chat history for one generation request.
///
/// The system prompt is pinned; only the last `window` user/assistant messages are kept and
/// sent, which bounds request size as the document progresses.
#[derive(Debug, Clone)]
pub struct Conversation {
    system: Option<ChatMessage>,
    history: VecDeque<ChatMessage>,
    window: usize,
}

impl Conversation {
    pub fn new(window: usize) -> Self {
        Self {
            system: None,
            history: VecDeque::new(),
            window: window.max(1),
        }
    }

    /// Drop all history and optionally install a new system prompt.
    pub fn reset(&mut self, system_prompt: Option<&str>) {
        self.history.clear();
        self.system = system_prompt.map(|s| ChatMessage::new(ChatRole::System, s));
    }

    pub fn push_user(&mut self, content: &str) {
        self.push(ChatMessage::new(ChatRole::User, content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.push(ChatMessage::new(ChatRole::Assistant, content));
    }

    fn push(&mut self, msg: ChatMessage) {
        self.history.push_back(msg);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
    }

    /// Messages to send: pinned system prompt first, then the retained history.
    pub fn window(&self) -> Vec<ChatMessage> {
        self.system
            .iter()
            .chain(self.history.iter())
            .cloned()
            .collect()
    }
}
