use chrono::{DateTime, NaiveDateTime};

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a server timestamp for display.
/// Accepts RFC 3339 and the zone-less `2024-03-01T14:05:09.123` form.
pub fn format_datetime(value: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        dt.format("%b %d, %Y %H:%M").to_string()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.format("%b %d, %Y %H:%M").to_string()
    } else {
        value.to_string()
    }
}

/// Number of display lines in a block of text (at least one)
pub fn line_count(text: &str) -> usize {
    text.lines().count().max(1)
}
