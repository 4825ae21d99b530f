//! Side-effects requested by the timeline store.
//!
//! The store is sans-IO: every operation returns the actions the surrounding
//! runtime must execute (render a delta, issue a fetch, dispatch a send,
//! toggle the loading indicator, surface a notice). Actions are executed in
//! order.

use driftline_proto::{HistoryRequest, OutgoingMessage, RequestToken};

use crate::delta::TimelineDelta;

/// Instructions produced by the timeline store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Apply an incremental change through the rendering collaborator.
    Apply(TimelineDelta),

    /// Issue a history fetch. The completion re-enters the store through
    /// [`TimelineStore::handle_history`](crate::TimelineStore::handle_history)
    /// carrying the same token.
    FetchHistory {
        /// Correlation token for the completion.
        token: RequestToken,
        /// Page to request.
        request: HistoryRequest,
    },

    /// Dispatch an outgoing send over the live channel.
    Dispatch(OutgoingMessage),

    /// Show the history loading indicator.
    ShowLoading,

    /// Hide the history loading indicator.
    HideLoading,

    /// Surface a user-visible notification.
    Notify {
        /// Notification text.
        text: String,
        /// True for failure notices.
        is_error: bool,
    },

    /// Show the "empty conversation" marker.
    ShowEmptyMarker,

    /// Show the "start of conversation" marker. Emitted at most once per
    /// conversation session.
    ShowStartMarker,

    /// `count` messages were inserted above the viewport; the scroll anchor
    /// must be restored after materialization.
    Prepended {
        /// Number of newly materialized entries.
        count: usize,
    },

    /// The set of calendar days in the window changed; date separators must
    /// be rebuilt from
    /// [`TimelineStore::day_markers`](crate::TimelineStore::day_markers).
    RefreshMarkers,
}
