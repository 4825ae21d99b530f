//! History fetch requests and completion correlation.

use driftline_core::{ConversationId, Generation, ServerId, TransportError};

use crate::wire::IncomingMessage;

/// Default page size for history fetches.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Which kind of fetch a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Most-recent page, replacing the window wholesale.
    Initial,
    /// Page strictly older than the current cursor, merged above the window.
    Older,
}

/// Correlates a history completion with the request that started it.
///
/// The generation is captured at issue time; a completion whose generation no
/// longer matches the store's targets a conversation that has since been
/// switched away and is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    /// Conversation generation at issue time.
    pub generation: Generation,
    /// Fetch kind.
    pub kind: FetchKind,
}

/// A paged history request against the REST channel.
///
/// Returns messages strictly older than `before` (or the most recent page if
/// unset), at most `limit` entries, in unspecified order; the store re-sorts.
/// An empty result signals "no more".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Conversation to page through.
    pub conversation: ConversationId,
    /// Exclusive upper bound; unset requests the most recent page.
    pub before: Option<ServerId>,
    /// Maximum number of entries.
    pub limit: usize,
}

/// Outcome of a history fetch.
pub type HistoryResult = Result<Vec<IncomingMessage>, TransportError>;
