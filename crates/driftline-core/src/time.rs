//! Timestamp display formatting.
//!
//! Pure helpers turning message timestamps into the strings the renderer
//! shows: clock labels next to each message and day captions on date
//! separators.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};

/// Clock label shown next to a message, e.g. `14:05`.
pub fn clock_label(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%H:%M").to_string()
}

/// Caption for a date separator, relative to the viewer's current date.
///
/// Same day yields `Today`, the previous day `Yesterday`, anything older the
/// full date.
pub fn day_caption(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.checked_sub_days(Days::new(1)) == Some(day) {
        "Yesterday".to_string()
    } else if day.year() == today.year() {
        day.format("%B %-d").to_string()
    } else {
        day.format("%B %-d, %Y").to_string()
    }
}

/// Convert a raw wire timestamp (milliseconds since the Unix epoch) to a
/// typed timestamp. `None` for values outside the representable range.
pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
