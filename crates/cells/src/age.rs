//! Relative time formatting for age and timestamp cells.

use chrono::DateTime;

/// Epoch seconds of an RFC 3339 timestamp or a plain epoch number.
pub fn parse_timestamp(raw: &serde_json::Value) -> Option<i64> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64().filter(|t| *t > 0),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s.trim()).ok().map(|t| t.timestamp()),
        _ => None,
    }
}

/// Compact elapsed time between `at` and `now`: `3d4h`, `5h2m`, `12m`, `40s`.
pub fn render_age(at: i64, now: i64) -> String {
    if at <= 0 {
        return "-".to_string();
    }
    let mut secs = (now - at).max(0) as u64;
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3600;
    secs %= 3600;
    let mins = secs / 60;
    secs %= 60;
    if days > 0 {
        format!("{}d{}h", days, hours)
    } else if hours > 0 {
        format!("{}h{}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}

pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
