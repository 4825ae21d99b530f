//! Derived timeline markers.
//!
//! Date separators are a pure function of the materialized window: one
//! marker before the first message of each calendar day. Deriving them
//! instead of storing them means a delete can never leave an orphaned
//! separator behind; the store signals `RefreshMarkers` whenever the day set
//! changes and the renderer rebuilds from [`day_markers`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use driftline_core::Message;

/// A date separator slot in the rendered timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMarker {
    /// Calendar day (UTC) the separator introduces.
    pub date: NaiveDate,
    /// Index of the first message of that day.
    pub index: usize,
}

/// Compute date separators for an ordered window.
pub fn day_markers(messages: &[Message]) -> Vec<DayMarker> {
    let mut markers = Vec::new();
    let mut previous: Option<NaiveDate> = None;

    for (index, message) in messages.iter().enumerate() {
        let date = message.timestamp.date_naive();
        if previous != Some(date) {
            markers.push(DayMarker { date, index });
            previous = Some(date);
        }
    }

    markers
}

/// The set of calendar days present in the window.
///
/// Used to detect whether a mutation changed the separator layout.
pub(crate) fn day_set(messages: &[Message]) -> BTreeSet<NaiveDate> {
    messages.iter().map(|m| m.timestamp.date_naive()).collect()
}
