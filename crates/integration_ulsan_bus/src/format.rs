//! Arrival countdown formatting

/// Format a countdown in seconds as `"{s}초"` or `"{m}분{s}초"`
#[must_use]
pub fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}초")
    } else {
        format!("{}분{}초", seconds / 60, seconds % 60)
    }
}

/// Format a raw `ARRIVALTIME` value for display
///
/// `"0"` stays `"0"` (the bus is at the stop). Values that are not a
/// non-negative integer are passed through untouched.
#[must_use]
pub fn format_arrival(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "0" {
        return "0".to_string();
    }

    trimmed
        .parse::<u64>()
        .map_or_else(|_| raw.to_string(), format_seconds)
}
