//! Conversation identity and the stale-result guard.

use std::fmt;

/// Channel or direct-conversation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(pub u64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conv-{}", self.0)
    }
}

/// Monotonic counter bumped on every conversation switch.
///
/// Captured into in-flight history requests; a completion whose generation no
/// longer matches the store's current generation targets a conversation that
/// is no longer active and is silently discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    /// Advance to the next generation.
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}
