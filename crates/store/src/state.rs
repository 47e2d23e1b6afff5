//! Scoped table state: the single owner of one table's rows and highlight timers.

use std::sync::Arc;

use gridwatch_core::{Diagnostic, RowId, Scope, Snapshot};
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::highlight::HighlightScheduler;
use crate::reconcile::{reconcile, RowSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Snapshot was tagged for a scope that is not the active subscription.
    Stale,
    Reconciled(ReconcileSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub changed: Vec<RowId>,
    pub removed: Vec<RowId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rows, scope and timers for one table. Every mutation swaps in a new `Arc<RowSet>`.
#[derive(Debug)]
pub struct TableState {
    scope: Option<Scope>,
    rows: Arc<RowSet>,
    highlights: HighlightScheduler,
    epoch: u64,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(HighlightScheduler::default())
    }
}

impl TableState {
    pub fn new(highlights: HighlightScheduler) -> Self {
        Self { scope: None, rows: Arc::new(RowSet::default()), highlights, epoch: 0 }
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn rows(&self) -> Arc<RowSet> {
        Arc::clone(&self.rows)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn highlights(&self) -> &HighlightScheduler {
        &self.highlights
    }

    /// Switch the active subscription. Rows and pending timers of the old scope
    /// are discarded. Returns false when `scope` is already active.
    pub fn subscribe(&mut self, scope: Scope) -> bool {
        if self.scope.as_ref() == Some(&scope) {
            return false;
        }
        info!(from = ?self.scope.as_ref().map(|s| s.key()), to = %scope, pending_highlights = self.highlights.len(), "scope changed");
        self.scope = Some(scope);
        self.rows = Arc::new(RowSet::default());
        self.highlights.clear();
        self.epoch += 1;
        true
    }

    /// Merge a snapshot for the active scope; snapshots for any other scope are ignored.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, now: Instant) -> Applied {
        let Some(active) = self.scope.as_ref() else {
            debug!(scope = %snapshot.scope, "snapshot before any subscription; ignored");
            counter!("snapshots_stale_total").increment(1);
            return Applied::Stale;
        };
        if *active != snapshot.scope {
            debug!(scope = %snapshot.scope, active = %active, "stale snapshot; ignored");
            counter!("snapshots_stale_total").increment(1);
            return Applied::Stale;
        }

        let out = reconcile(&self.rows, active, &snapshot.rows);
        for id in out.removed.iter() {
            self.highlights.cancel(id);
        }
        self.highlights.arm(out.changed.iter(), now);
        debug!(
            scope = %active,
            total = out.rows.len(),
            inserted = out.inserted.len(),
            changed = out.changed.len(),
            removed = out.removed.len(),
            "snapshot reconciled"
        );
        self.rows = Arc::new(out.rows);
        self.epoch += 1;
        Applied::Reconciled(ReconcileSummary {
            inserted: out.inserted.len(),
            changed: out.changed,
            removed: out.removed,
            diagnostics: out.diagnostics,
        })
    }

    /// Clear `has_updated` on every row whose highlight window ended by `now`.
    pub fn expire_highlights(&mut self, now: Instant) -> Vec<RowId> {
        let due = self.highlights.expire(now);
        if due.is_empty() {
            return due;
        }
        counter!("highlights_expired_total").increment(due.len() as u64);
        self.rows = Arc::new(self.rows.with_highlight_cleared(&due));
        self.epoch += 1;
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.highlights.next_deadline()
    }
}
