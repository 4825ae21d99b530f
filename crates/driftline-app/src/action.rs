//! Application output actions.

use driftline_core::{ConversationId, MessageId};
use driftline_proto::{HistoryRequest, OutgoingMessage, RequestToken};
use driftline_timeline::TimelineDelta;

/// Live-channel connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No channel; sends still render optimistically.
    #[default]
    Disconnected,
    /// Channel being established.
    Connecting,
    /// Channel up.
    Connected,
}

/// A scroll instruction for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollCommand {
    /// Scroll to the newest message.
    ToBottom {
        /// Animate the scroll.
        smooth: bool,
    },
    /// Set the scroll offset in pixels.
    ToOffset(f64),
    /// Bring a specific message into view.
    ToMessage {
        /// Target message.
        id: MessageId,
    },
}

/// Instructions the application hands back to the runtime.
///
/// Most variants are render commands the driver applies directly. The
/// exceptions are the I/O starters ([`FetchHistory`](Self::FetchHistory),
/// [`DispatchSend`](Self::DispatchSend),
/// [`JoinConversation`](Self::JoinConversation)) and
/// [`MeasureScrollHeight`](Self::MeasureScrollHeight), whose completions
/// re-enter as [`AppEvent`](crate::AppEvent)s.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Apply a structural change to the rendered timeline.
    Apply(TimelineDelta),

    /// Start a history fetch.
    FetchHistory {
        /// Token to echo back on completion.
        token: RequestToken,
        /// Page parameters.
        request: HistoryRequest,
    },

    /// Dispatch an outgoing message on the live channel.
    DispatchSend(OutgoingMessage),

    /// Subscribe the live channel to a conversation.
    JoinConversation(ConversationId),

    /// Surface a transient notice to the user.
    Notify {
        /// Human-readable text.
        text: String,
        /// Style as an error.
        is_error: bool,
    },

    /// Show or hide the loading indicator.
    SetLoading(bool),

    /// Move the scroll container.
    Scroll(ScrollCommand),

    /// Update the unread badge. Zero hides it.
    SetUnreadBadge(u32),

    /// Show or hide the jump-to-bottom affordance.
    SetJumpAffordance(bool),

    /// Render the empty-conversation placeholder.
    ShowEmptyMarker,

    /// Render the start-of-conversation marker.
    ShowStartMarker,

    /// Recompute date separators from the window.
    RefreshMarkers,

    /// Measure the content height and report back with
    /// [`AppEvent::PrependRendered`](crate::AppEvent::PrependRendered).
    MeasureScrollHeight,

    /// Highlight a search hit.
    Highlight(MessageId),

    /// Remove a search-hit highlight.
    ClearHighlight(MessageId),

    /// Replace the typing indicator line. Empty hides it.
    SetTyping(Vec<String>),

    /// Reflect the live-channel connection state.
    SetConnection(ConnectionState),

    /// Shut down.
    Quit,
}
