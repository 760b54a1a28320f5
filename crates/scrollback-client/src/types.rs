//! Core types for chat history

use serde::{Deserialize, Serialize};

/// Id given to the synthetic opening-statement item.
pub const OPENING_STATEMENT_ID: &str = "introduction";

/// Prefix for question item ids derived from a message record.
pub const QUESTION_ID_PREFIX: &str = "question-";

/// One turn in a conversation: either the user's question or an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatItem {
    /// Stable identity of the turn, unique within a conversation
    pub id: String,
    /// Whether this turn is an answer
    pub is_answer: bool,
    /// Text of the turn
    pub content: String,
    /// Synthetic introduction shown once history is exhausted
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_opening_statement: bool,
}

impl ChatItem {
    /// Create a question item
    pub fn question(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_answer: false,
            content: content.into(),
            is_opening_statement: false,
        }
    }

    /// Create an answer item
    pub fn answer(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_answer: true,
            content: content.into(),
            is_opening_statement: false,
        }
    }

    /// Create the opening-statement item
    pub fn opening_statement(content: impl Into<String>) -> Self {
        Self {
            id: OPENING_STATEMENT_ID.to_string(),
            is_answer: true,
            content: content.into(),
            is_opening_statement: true,
        }
    }
}

/// Parameters of one backward page fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageParams {
    pub conversation_id: String,
    pub limit: u32,
    /// Answer id to page back from; absent on the first fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
}

/// A batch of chat items returned by one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<ChatItem>,
    /// Whether older history exists beyond this page
    pub has_more: bool,
}

impl Page {
    /// Create a page with an explicit `has_more` flag
    pub fn new(items: Vec<ChatItem>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    /// Build a page from message records, inferring `has_more` from the batch
    /// size when the backend didn't report it.
    pub fn from_records(records: Vec<MessageRecord>, has_more: Option<bool>, limit: u32) -> Self {
        let has_more = has_more.unwrap_or(records.len() as u32 >= limit);
        let items = records.into_iter().flat_map(MessageRecord::into_items).collect();
        Self { items, has_more }
    }
}

/// A stored exchange as the backend returns it
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub answer: String,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl MessageRecord {
    /// Split the record into its question item followed by its answer item
    pub fn into_items(self) -> [ChatItem; 2] {
        [
            ChatItem::question(format!("{}{}", QUESTION_ID_PREFIX, self.id), self.query),
            ChatItem::answer(self.id, self.answer),
        ]
    }
}

/// Response body of the message list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct MessageListResponse {
    pub data: Vec<MessageRecord>,
    #[serde(default)]
    pub has_more: Option<bool>,
    #[serde(default)]
    pub limit: Option<u32>,
}
