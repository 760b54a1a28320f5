//! Backward pagination cursor.

use scrollback_client::ChatItem;
use serde::{Deserialize, Serialize};

/// Cursor for the next backward page fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    /// Oldest answer held; `None` means the next fetch is unanchored
    pub first_id: Option<String>,
}

/// Derive the cursor from history stored oldest first.
pub fn update_anchor(items: &[ChatItem]) -> PaginationCursor {
    PaginationCursor {
        first_id: items
            .iter()
            .find(|item| item.is_answer && !item.is_opening_statement)
            .map(|item| item.id.clone()),
    }
}
