//! In-window message search.
//!
//! Matches are case-insensitive substring hits on message bodies, restricted
//! to the currently materialized window. Hits are held in window order; the
//! cursor starts at the newest hit and moves without wraparound.

use driftline_core::{Message, MessageId};

/// Search state over the materialized window.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    query: String,
    hits: Vec<MessageId>,
    cursor: Option<usize>,
}

impl SearchIndex {
    /// Empty, inactive index.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a query is active.
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// The active query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of hits for the active query.
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// The hit under the cursor.
    pub fn current(&self) -> Option<MessageId> {
        self.cursor.and_then(|index| self.hits.get(index).copied())
    }

    /// Recompute hits for a query over the window.
    ///
    /// The cursor lands on the newest hit. A blank query deactivates the
    /// index.
    pub fn rebuild(&mut self, query: &str, window: &[Message]) {
        self.query = query.trim().to_string();
        if self.query.is_empty() {
            self.hits.clear();
            self.cursor = None;
            return;
        }

        let needle = self.query.to_lowercase();
        self.hits = window
            .iter()
            .filter(|m| m.body.to_lowercase().contains(&needle))
            .map(|m| m.id)
            .collect();
        self.cursor = self.hits.len().checked_sub(1);
    }

    /// Re-run the active query after the window changed.
    ///
    /// The cursor stays on the same message when it survives, otherwise it
    /// falls back to the newest hit.
    pub fn refresh(&mut self, window: &[Message]) {
        if !self.is_active() {
            return;
        }
        let anchored = self.current();
        let query = std::mem::take(&mut self.query);
        self.rebuild(&query, window);
        if let Some(id) = anchored
            && let Some(index) = self.hits.iter().position(|hit| *hit == id)
        {
            self.cursor = Some(index);
        }
    }

    /// Move the cursor one hit toward the oldest. Clamped, no wraparound.
    pub fn prev(&mut self) -> Option<MessageId> {
        if let Some(cursor) = self.cursor {
            self.cursor = Some(cursor.saturating_sub(1));
        }
        self.current()
    }

    /// Move the cursor one hit toward the newest. Clamped, no wraparound.
    pub fn next(&mut self) -> Option<MessageId> {
        if let Some(cursor) = self.cursor {
            self.cursor = Some((cursor + 1).min(self.hits.len().saturating_sub(1)));
        }
        self.current()
    }

    /// Deactivate the index.
    pub fn clear(&mut self) {
        self.query.clear();
        self.hits.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use driftline_core::{
        Author, ConversationId, Lifecycle, Message, MessageId, ServerId,
    };

    use super::*;

    fn message(id: u64, body: &str) -> Message {
        Message {
            id: MessageId::Server(ServerId(id)),
            conversation: ConversationId(1),
            author: Author { id: 2, display_name: "peer".to_string(), is_own: false },
            body: body.to_string(),
            attachment: None,
            reply_to: None,
            forwarded_from: None,
            timestamp: Utc
                .timestamp_millis_opt(1_704_067_200_000 + (id as i64) * 1_000)
                .single()
                .unwrap_or_default(),
            edited_at: None,
            lifecycle: Lifecycle::Confirmed,
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let window = vec![message(1, "Deploy finished"), message(2, "lunch?")];
        let mut search = SearchIndex::new();

        search.rebuild("DEPLOY", &window);

        assert_eq!(search.hit_count(), 1);
        assert_eq!(search.current(), Some(MessageId::Server(ServerId(1))));
    }

    #[test]
    fn cursor_starts_at_newest_hit_and_clamps() {
        let window = vec![message(1, "ping"), message(2, "other"), message(3, "ping again")];
        let mut search = SearchIndex::new();
        search.rebuild("ping", &window);

        assert_eq!(search.current(), Some(MessageId::Server(ServerId(3))));
        assert_eq!(search.prev(), Some(MessageId::Server(ServerId(1))));
        // Already at the oldest hit; no wraparound.
        assert_eq!(search.prev(), Some(MessageId::Server(ServerId(1))));
        assert_eq!(search.next(), Some(MessageId::Server(ServerId(3))));
        assert_eq!(search.next(), Some(MessageId::Server(ServerId(3))));
    }

    #[test]
    fn blank_query_deactivates() {
        let window = vec![message(1, "ping")];
        let mut search = SearchIndex::new();
        search.rebuild("ping", &window);
        search.rebuild("   ", &window);

        assert!(!search.is_active());
        assert_eq!(search.current(), None);
    }

    #[test]
    fn refresh_keeps_the_anchored_hit() {
        let mut window = vec![message(2, "ping"), message(4, "ping")];
        let mut search = SearchIndex::new();
        search.rebuild("ping", &window);
        let _ = search.prev();
        assert_eq!(search.current(), Some(MessageId::Server(ServerId(2))));

        // An older page prepends another hit; the cursor must not move.
        window.insert(0, message(1, "ping"));
        search.refresh(&window);

        assert_eq!(search.hit_count(), 3);
        assert_eq!(search.current(), Some(MessageId::Server(ServerId(2))));
    }

    #[test]
    fn refresh_falls_back_when_the_hit_is_deleted() {
        let mut window = vec![message(1, "ping"), message(2, "ping")];
        let mut search = SearchIndex::new();
        search.rebuild("ping", &window);

        window.remove(1);
        search.refresh(&window);

        assert_eq!(search.current(), Some(MessageId::Server(ServerId(1))));
    }
}
