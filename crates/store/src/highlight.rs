//! Highlight timers keyed by row id.
//!
//! One deadline per row. Re-arming a row replaces its deadline, so an older
//! change can never clear the flag set by a newer one. The registry knows nothing
//! about which rows are currently visible.

use std::time::Duration;

use gridwatch_core::RowId;
use rustc_hash::FxHashMap;
use tokio::time::Instant;

/// Fixed highlight window after a detected change.
pub const HIGHLIGHT_WINDOW: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct HighlightScheduler {
    window: Duration,
    deadlines: FxHashMap<RowId, Instant>,
}

impl Default for HighlightScheduler {
    fn default() -> Self {
        Self::new(HIGHLIGHT_WINDOW)
    }
}

impl HighlightScheduler {
    pub fn new(window: Duration) -> Self {
        Self { window, deadlines: FxHashMap::default() }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm (or restart) the timer for each id.
    pub fn arm<'a, I>(&mut self, ids: I, now: Instant)
    where
        I: IntoIterator<Item = &'a RowId>,
    {
        let deadline = now + self.window;
        for id in ids {
            self.deadlines.insert(id.clone(), deadline);
        }
    }

    pub fn cancel(&mut self, id: &RowId) {
        self.deadlines.remove(id);
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn is_armed(&self, id: &RowId) -> bool {
        self.deadlines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every id whose deadline is at or before `now`, sorted.
    pub fn expire(&mut self, now: Instant) -> Vec<RowId> {
        let mut due: Vec<RowId> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in due.iter() {
            self.deadlines.remove(id);
        }
        due.sort();
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_core::{ResourceKind, Scope};

    fn id(name: &str) -> RowId {
        RowId::new(&Scope::new("c", "k", None, ResourceKind::Pods), None, name)
    }

    #[test]
    fn expires_exactly_at_window_end() {
        let t0 = Instant::now();
        let mut s = HighlightScheduler::default();
        s.arm([id("a")].iter(), t0);
        assert_eq!(s.next_deadline(), Some(t0 + HIGHLIGHT_WINDOW));
        assert!(s.expire(t0 + Duration::from_millis(1999)).is_empty());
        assert_eq!(s.expire(t0 + HIGHLIGHT_WINDOW), vec![id("a")]);
        assert!(s.is_empty());
    }

    #[test]
    fn rearm_restarts_the_window() {
        let t0 = Instant::now();
        let mut s = HighlightScheduler::default();
        s.arm([id("a")].iter(), t0);
        s.arm([id("a")].iter(), t0 + Duration::from_millis(1500));
        assert!(s.expire(t0 + HIGHLIGHT_WINDOW).is_empty(), "earlier timer must not clear the later change");
        assert_eq!(s.expire(t0 + Duration::from_millis(3500)), vec![id("a")]);
    }

    #[test]
    fn cancel_and_clear_drop_timers() {
        let t0 = Instant::now();
        let mut s = HighlightScheduler::default();
        s.arm([id("a"), id("b")].iter(), t0);
        s.cancel(&id("a"));
        assert!(!s.is_armed(&id("a")));
        assert!(s.is_armed(&id("b")));
        s.clear();
        assert_eq!(s.next_deadline(), None);
        assert!(s.expire(t0 + HIGHLIGHT_WINDOW).is_empty());
    }
}
