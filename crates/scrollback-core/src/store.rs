//! Ordered, deduplicated chat history.

use std::collections::HashSet;

use scrollback_client::ChatItem;

/// Result of merging a page into existing history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: Vec<ChatItem>,
    /// Number of incoming items that were actually new
    pub unique_count: usize,
}

/// Merge an older page ahead of the history already held.
///
/// Incoming items whose id is already present are dropped; the rest keep
/// their relative order and are placed before `existing`. No sorting happens:
/// the caller supplies `incoming` in chronological order relative to
/// `existing`.
pub fn merge(existing: &[ChatItem], incoming: Vec<ChatItem>) -> MergeOutcome {
    let mut seen: HashSet<&str> = existing.iter().map(|item| item.id.as_str()).collect();

    let unique: Vec<ChatItem> = incoming
        .iter()
        .filter(|item| seen.insert(item.id.as_str()))
        .cloned()
        .collect();
    let unique_count = unique.len();

    let mut merged = unique;
    merged.extend_from_slice(existing);
    MergeOutcome {
        merged,
        unique_count,
    }
}

/// The canonical history of one conversation
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    items: Vec<ChatItem>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items oldest first
    pub fn items(&self) -> &[ChatItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Merge an older page; returns how many items were new.
    pub fn merge_page(&mut self, incoming: Vec<ChatItem>) -> usize {
        let outcome = merge(&self.items, incoming);
        self.items = outcome.merged;
        outcome.unique_count
    }

    /// Insert or update an item at the newest end of the history.
    ///
    /// An item whose id is already held is updated in place.
    pub fn upsert_latest(&mut self, item: ChatItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[ChatItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    fn q(id: &str) -> ChatItem {
        ChatItem::question(id, "")
    }

    #[test]
    fn test_merge_drops_known_ids_and_prepends() {
        let existing = vec![q("msg-1"), q("msg-2")];
        let incoming = vec![q("msg-2"), q("msg-3")];

        let outcome = merge(&existing, incoming);
        assert_eq!(outcome.unique_count, 1);
        assert_eq!(ids(&outcome.merged), vec!["msg-3", "msg-1", "msg-2"]);
    }

    #[test]
    fn test_merge_preserves_incoming_order() {
        let existing = vec![q("c")];
        let outcome = merge(&existing, vec![q("a"), q("b")]);
        assert_eq!(ids(&outcome.merged), vec!["a", "b", "c"]);
        assert_eq!(outcome.unique_count, 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![q("msg-1")];
        let incoming = vec![q("msg-0"), q("msg-1")];

        let first = merge(&existing, incoming.clone());
        let second = merge(&first.merged, incoming);
        assert_eq!(second.unique_count, 0);
        assert_eq!(second.merged, first.merged);
    }

    #[test]
    fn test_merge_dedups_within_incoming() {
        let outcome = merge(&[], vec![q("a"), q("a"), q("b")]);
        assert_eq!(ids(&outcome.merged), vec!["a", "b"]);
        assert_eq!(outcome.unique_count, 2);
    }

    #[test]
    fn test_merge_into_empty_and_from_empty() {
        let outcome = merge(&[], vec![q("a")]);
        assert_eq!(outcome.unique_count, 1);

        let outcome = merge(&[q("a")], vec![]);
        assert_eq!(outcome.unique_count, 0);
        assert_eq!(ids(&outcome.merged), vec!["a"]);
    }

    #[test]
    fn test_merged_ids_are_unique() {
        let existing = vec![q("1"), q("2"), q("3")];
        let incoming = vec![q("0"), q("2"), q("4"), q("0"), q("3")];
        let outcome = merge(&existing, incoming);

        let unique: HashSet<&str> = outcome.merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(unique.len(), outcome.merged.len());
        assert_eq!(outcome.unique_count, 2);
    }

    #[test]
    fn test_store_upsert_latest() {
        let mut store = MessageStore::new();
        store.merge_page(vec![q("q1"), ChatItem::answer("a1", "old")]);

        store.upsert_latest(ChatItem::answer("a2", "new"));
        assert_eq!(ids(store.items()), vec!["q1", "a1", "a2"]);

        store.upsert_latest(ChatItem::answer("a1", "rewritten"));
        assert_eq!(store.len(), 3);
        assert_eq!(store.items()[1].content, "rewritten");
    }
}
