//! Incremental output of the timeline store.
//!
//! The store never renders. Every mutation of the materialized window is
//! described by a [`TimelineDelta`]; the rendering collaborator applies each
//! delta to exactly one display unit, in order.

use driftline_core::MessageId;

/// An incremental change to the materialized window.
///
/// Indices refer to the window's ordering at the moment the delta is applied,
/// so a batch of deltas must be applied in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineDelta {
    /// Whole window replaced (initial load or conversation switch).
    Reset,

    /// A message was inserted at `index`.
    Inserted {
        /// Position in the window.
        index: usize,
        /// Identity of the inserted message.
        id: MessageId,
    },

    /// The entry at `index` changed identity in place (optimistic entry
    /// acknowledged with its permanent id).
    Replaced {
        /// Position in the window, unchanged by the replacement.
        index: usize,
        /// Temporary identity before acknowledgment.
        old_id: MessageId,
        /// Permanent identity after acknowledgment.
        new_id: MessageId,
    },

    /// The entry at `index` mutated in place (edit, lifecycle change).
    /// Neighbors and scroll position are untouched.
    Updated {
        /// Position in the window.
        index: usize,
        /// Identity of the updated message.
        id: MessageId,
    },

    /// The entry at `index` was removed.
    Removed {
        /// Position the entry occupied.
        index: usize,
        /// Identity of the removed message.
        id: MessageId,
    },
}

/// Outcome of reconciling one live-channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Matched an optimistic entry; identity replaced in place.
    Replaced,
    /// Already present by id; nothing changed.
    Duplicate,
    /// New entry inserted in timestamp order.
    Inserted,
    /// Not addressed to the active conversation; window untouched.
    Ignored,
}
