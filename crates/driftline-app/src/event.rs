//! Application input events.

use driftline_core::{ConversationId, ServerId};
use driftline_proto::{HistoryResult, LiveEvent, RequestToken};

use crate::viewport::ScrollMetrics;

/// Everything that can happen to the application.
///
/// Events come from three sources: the live channel, completions of work the
/// runtime started earlier, and the user. The application consumes them one
/// at a time and returns [`AppAction`](crate::AppAction)s.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Typed event from the live channel.
    Live(LiveEvent),

    /// A history fetch completed.
    HistoryFetched {
        /// Token issued when the fetch was requested.
        token: RequestToken,
        /// Page or transport error.
        result: HistoryResult,
    },

    /// Dispatch of an outgoing message failed.
    SendFailed {
        /// Correlation token of the failed send.
        correlation: u64,
    },

    /// The user opened a conversation.
    ConversationOpened(ConversationId),

    /// The user submitted the composer.
    Composed {
        /// Message body as typed.
        body: String,
        /// Message being replied to, if any.
        reply_to: Option<ServerId>,
    },

    /// The scroll container moved under user input.
    Scrolled(ScrollMetrics),

    /// Pull-to-refresh gesture at the top edge.
    PullToRefresh,

    /// Jump-to-bottom affordance invoked.
    JumpToBottom,

    /// Older content finished rendering above the viewport.
    PrependRendered {
        /// Content height after the prepend.
        new_scroll_height: f64,
    },

    /// A programmatic scroll finished animating.
    ScrollSettled,

    /// The user submitted a search query.
    SearchRequested(String),

    /// Advance the search cursor toward the newest hit.
    SearchNext,

    /// Advance the search cursor toward the oldest hit.
    SearchPrev,

    /// The search bar was dismissed.
    SearchClosed,

    /// Periodic sweep for watchdogs and expiries.
    Tick,

    /// Shut down.
    Quit,
}
