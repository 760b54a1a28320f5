//! Shared utilities

use scrollback_client::ChatItem;
use scrollback_core::ControllerEvent;
use tokio::sync::broadcast::{self, error::RecvError};

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// One-line rendering of a chat item for history listings.
pub fn format_item(item: &ChatItem, max: usize) -> String {
    let role = if item.is_opening_statement {
        "intro"
    } else if item.is_answer {
        "bot"
    } else {
        "you"
    };
    let text = item.content.replace('\n', " ");
    format!("{:>5}: {}", role, truncate_chars(&text, max))
}

/// Request body for the streaming chat endpoint.
pub fn chat_request_body(query: &str, conversation_id: &str, user: &str) -> serde_json::Value {
    serde_json::json!({
        "inputs": {},
        "query": query,
        "response_mode": "streaming",
        "conversation_id": conversation_id,
        "user": user,
    })
}

/// Next controller event, skipping over any the receiver fell behind on.
/// Returns `None` once the controller is gone.
pub async fn next_event(receiver: &mut broadcast::Receiver<ControllerEvent>) -> Option<ControllerEvent> {
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Printer fell behind, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
