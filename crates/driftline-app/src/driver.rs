//! Driver trait for abstracting platform I/O.
//!
//! The [`Driver`] trait decouples the application runtime from a specific
//! frontend. Each frontend implements the trait to provide rendering and
//! transport, while the generic [`Runtime`](crate::Runtime) handles all
//! orchestration.

use std::future::Future;

use driftline_core::ConversationId;
use driftline_proto::{HistoryRequest, OutgoingMessage, RequestToken};

use crate::{AppAction, AppEvent};

/// Platform I/O for the application runtime.
///
/// A driver owns the live channel, the history endpoint, and the rendered
/// surface. Asynchronous work started through the driver completes by
/// surfacing an [`AppEvent`] from [`poll_event`](Driver::poll_event): history
/// fetches come back as [`AppEvent::HistoryFetched`] carrying the token they
/// were started with.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next event.
    ///
    /// Returns `None` when no event is ready this cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform event source fails.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Start a history fetch. Completion arrives via
    /// [`poll_event`](Driver::poll_event).
    fn start_history_fetch(&mut self, token: RequestToken, request: HistoryRequest);

    /// Send an outgoing message on the live channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is down or the send fails.
    fn send_live(
        &mut self,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Subscribe the live channel to a conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    fn join_conversation(
        &mut self,
        conversation: ConversationId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Apply a render command to the surface.
    ///
    /// Only render-side actions reach this method; the runtime intercepts
    /// the I/O starters.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, action: &AppAction) -> Result<(), Self::Error>;

    /// Measure the current content height of the scroll container, in
    /// pixels.
    fn measure_scroll_height(&mut self) -> f64;

    /// Check whether the live channel is up.
    fn is_connected(&self) -> bool;

    /// Tear down the channel and release resources.
    fn stop(&mut self);
}
