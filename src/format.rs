//! Locale-independent rendering of field values.
//!
//! Integers render as plain decimal. Dates render as `yyyy-MM-dd` and times
//! as `HH:mm:ss`, both in one process-wide time zone shared by every builder.
//! The zone defaults to UTC and is changed with [`configure_formatting`];
//! a change applies to values formatted afterwards, never to strings that
//! were already rendered.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use std::sync::atomic::{AtomicI32, Ordering};

static ZONE_OFFSET_SECONDS: AtomicI32 = AtomicI32::new(0);

/// Sets the time zone used for all subsequently formatted dates and times.
pub fn configure_formatting(zone: FixedOffset) {
    tracing::debug!(zone = %zone, "Configured formatting time zone");
    ZONE_OFFSET_SECONDS.store(zone.local_minus_utc(), Ordering::SeqCst);
}

/// The time zone currently used for formatting.
pub fn formatting_time_zone() -> FixedOffset {
    let seconds = ZONE_OFFSET_SECONDS.load(Ordering::SeqCst);
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

/// Renders an integer without grouping or fractional digits.
pub fn format_integer(value: i64) -> String {
    value.to_string()
}

/// Renders the date part of `instant` as `yyyy-MM-dd` in the formatting zone.
pub fn format_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant
        .with_timezone(&formatting_time_zone())
        .format("%Y-%m-%d")
        .to_string()
}

/// Renders the time part of `instant` as `HH:mm:ss` in the formatting zone.
pub fn format_time<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant
        .with_timezone(&formatting_time_zone())
        .format("%H:%M:%S")
        .to_string()
}

/// Renders an offset as `GMT+H:MM`.
///
/// The sign belongs to the hour component; minutes are always two
/// non-negative digits.
pub fn format_offset(offset: &FixedOffset) -> String {
    let total_minutes = offset.local_minus_utc() / 60;
    let sign = if total_minutes < 0 { "-" } else { "+" };
    let total_minutes = total_minutes.abs();
    format!("GMT{}{}:{:02}", sign, total_minutes / 60, total_minutes % 60)
}
