use std::time::Duration;

use crate::highlight::HIGHLIGHT_WINDOW;

/// Session settings, read from `GRIDWATCH_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Capacity of the command channel feeding the session.
    pub queue_cap: usize,
    pub highlight: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { queue_cap: 1024, highlight: HIGHLIGHT_WINDOW }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let queue_cap = get("GRIDWATCH_QUEUE_CAP")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(d.queue_cap);
        let highlight = get("GRIDWATCH_HIGHLIGHT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(d.highlight);
        Self { queue_cap, highlight }
    }
}
