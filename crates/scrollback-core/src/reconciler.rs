//! Accumulation of the single in-progress streamed answer.

use scrollback_client::{ChatItem, StreamMeta};
use serde::{Deserialize, Serialize};

/// Observable state of the active exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Answer text received so far
    pub completion: String,
    /// Whether an exchange is in progress
    pub is_responding: bool,
    /// Backend id of the answer being streamed
    pub message_id: Option<String>,
    /// Conversation the backend attached the exchange to
    pub conversation_id: Option<String>,
    /// Backend task id of the generation
    pub task_id: Option<String>,
}

impl StreamState {
    /// The answer as a chat item, once the backend has named it
    pub fn to_answer_item(&self) -> Option<ChatItem> {
        self.message_id
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|id| ChatItem::answer(id.clone(), self.completion.clone()))
    }
}

/// Applies stream events, in delivery order, to the active exchange.
#[derive(Debug, Default)]
pub struct StreamReconciler {
    state: StreamState,
    buffer: Vec<String>,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_responding(&self) -> bool {
        self.state.is_responding
    }

    /// Claim the single exchange slot. Returns `false` while another
    /// exchange is still responding.
    pub fn try_begin(&mut self) -> bool {
        if self.state.is_responding {
            return false;
        }
        self.buffer.clear();
        self.state = StreamState {
            is_responding: true,
            conversation_id: self.state.conversation_id.take(),
            ..StreamState::default()
        };
        true
    }

    /// Append an incremental chunk.
    pub fn on_data(&mut self, chunk: &str, _is_first: bool, meta: &StreamMeta) {
        self.buffer.push(chunk.to_string());
        self.state.completion = self.buffer.concat();

        if let Some(ref id) = meta.message_id {
            self.state.message_id = Some(id.clone());
        }
        if let Some(ref id) = meta.conversation_id {
            self.state.conversation_id = Some(id.clone());
        }
        if let Some(ref id) = meta.task_id {
            self.state.task_id = Some(id.clone());
        }
    }

    /// Replace everything received so far with `answer`.
    pub fn on_message_replace(&mut self, answer: &str) {
        self.buffer = vec![answer.to_string()];
        self.state.completion = answer.to_string();
    }

    pub fn on_completed(&mut self) {
        self.state.is_responding = false;
    }

    /// Terminal failure; nothing is retried.
    pub fn on_error(&mut self, message: &str) {
        tracing::warn!("Answer stream failed: {}", message);
        self.state.is_responding = false;
    }
}
