//! Display formatting shared by the terminal UI and the CLI.

use std::borrow::Cow;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::models::{FieldChange, FormStatus, HistoryRevision};

/// Shown when a record carries no timestamp.
pub const UNKNOWN_TIME: &str = "Unknown";

/// Label for a missing or unrecognised form status.
pub const NOT_SET: &str = "Not set";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a server timestamp as UTC. The backend omits the zone marker, so a
/// `Z` is appended unless already present.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let iso: Cow<'_, str> = if raw.ends_with('Z') {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(format!("{raw}Z"))
    };
    DateTime::parse_from_rfc3339(&iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a server timestamp in the given time zone.
///
/// Missing values render as [`UNKNOWN_TIME`]; unparseable values are shown
/// as received.
pub fn format_timestamp_in<Tz>(raw: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return UNKNOWN_TIME.to_string();
    };
    match parse_utc(raw) {
        Some(dt) => dt.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Format a server timestamp in the local time zone.
pub fn format_timestamp(raw: Option<&str>) -> String {
    format_timestamp_in(raw, &Local)
}

/// Label for a raw status code: 1, 2 and 3 map to their names, everything
/// else (including null) is "Not set".
pub fn status_label(status: Option<i64>) -> &'static str {
    status
        .and_then(|code| FormStatus::try_from(code).ok())
        .map_or(NOT_SET, FormStatus::label)
}

/// Render an audit value: null as `null`, strings verbatim, anything else as
/// its JSON text.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn format_change(change: &FieldChange) -> String {
    format!(
        "{}: {} → {}",
        change.field,
        display_value(&change.old_value),
        display_value(&change.new_value)
    )
}

/// "Event: update (api)" style heading; the source is omitted when empty.
pub fn revision_heading(revision: &HistoryRevision) -> String {
    match revision.source.as_deref().filter(|s| !s.is_empty()) {
        Some(source) => format!("Event: {} ({source})", revision.event_type),
        None => format!("Event: {}", revision.event_type),
    }
}
