//! Human-readable timestamps for message bubbles and the conversation list.

use chrono::{DateTime, Local, TimeZone, Utc};

/// `09:05 PM` in the local timezone
pub fn format_message_time(timestamp: DateTime<Utc>) -> String {
    format_clock(&timestamp.with_timezone(&Local))
}

/// Relative age of a conversation: `Just now`, `5m ago`, `3h ago`, else `Mar 5`.
pub fn format_chat_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();

    if seconds < 60 {
        return "Just now".to_string();
    }
    if seconds < 3600 {
        return format!("{}m ago", seconds / 60);
    }
    if seconds < 86_400 {
        return format!("{}h ago", seconds / 3600);
    }

    format_day(&timestamp.with_timezone(&Local))
}

fn format_clock<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.format("%I:%M %p").to_string()
}

fn format_day<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.format("%b %-d").to_string()
}
