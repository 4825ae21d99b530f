//! Pending-send ledger.
//!
//! One entry per optimistic send still awaiting server acknowledgment, keyed
//! by correlation token. Entries leave the ledger on reconciliation, on
//! dispatch failure, or by bounded-wait expiry during the tick sweep.

use std::time::Duration;

use driftline_core::LocalId;

/// Correlation entry for one in-flight send.
#[derive(Debug, Clone)]
pub(crate) struct PendingSend<I> {
    /// Temporary id of the optimistic entry in the window.
    pub local: LocalId,
    /// Token dispatched with the send and echoed on the confirmation.
    pub correlation: u64,
    /// Trimmed body text, for the no-token heuristic match.
    pub body: String,
    /// When the send was dispatched.
    pub created_at: I,
}

/// FIFO ledger of in-flight sends.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingLedger<I> {
    entries: Vec<PendingSend<I>>,
}

impl<I> PendingLedger<I>
where
    I: Copy + Ord + std::ops::Sub<Output = Duration>,
{
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, entry: PendingSend<I>) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove and return the entry with the given correlation token.
    pub fn take_by_correlation(&mut self, correlation: u64) -> Option<PendingSend<I>> {
        let pos = self.entries.iter().position(|e| e.correlation == correlation)?;
        Some(self.entries.remove(pos))
    }

    /// Remove and return the oldest entry with an exact body match created
    /// within `window` of `now`.
    ///
    /// Fallback for transports that do not echo the correlation token;
    /// deliberately conservative to keep false positives rare.
    pub fn take_text_match(&mut self, body: &str, now: I, window: Duration) -> Option<PendingSend<I>> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.body == body && now - e.created_at <= window)?;
        Some(self.entries.remove(pos))
    }

    /// Drain entries that have waited longer than `timeout`.
    pub fn drain_expired(&mut self, now: I, timeout: Duration) -> Vec<PendingSend<I>> {
        let mut expired = Vec::new();
        self.entries.retain(|e| {
            if now - e.created_at > timeout {
                expired.push(e.clone());
                false
            } else {
                true
            }
        });
        expired
    }
}
