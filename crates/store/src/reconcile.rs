//! Snapshot reconciliation: merge a full listing into the current row set.

use gridwatch_core::{parse_row, Diagnostic, Row, RowId, Scope};
use metrics::{counter, gauge, histogram};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, warn};

/// Rows of one table in insertion order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    rows: Vec<Row>,
    index: FxHashMap<RowId, usize>,
}

impl RowSet {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let index = rows.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();
        Self { rows, index }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, id: &RowId) -> Option<&Row> {
        self.index.get(id).and_then(|i| self.rows.get(*i))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Copy of this set with `has_updated` cleared on `ids`.
    pub fn with_highlight_cleared(&self, ids: &[RowId]) -> RowSet {
        let mut rows = self.rows.clone();
        for id in ids {
            if let Some(i) = self.index.get(id) {
                rows[*i].has_updated = false;
            }
        }
        RowSet { rows, index: self.index.clone() }
    }
}

impl Serialize for RowSet {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(s)
    }
}

/// Outcome of merging one snapshot.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub rows: RowSet,
    /// Ids first seen in this snapshot (never flagged).
    pub inserted: Vec<RowId>,
    /// Ids whose content differs from the previous snapshot.
    pub changed: Vec<RowId>,
    pub removed: Vec<RowId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Merge `incoming` (the complete listing for `scope`) into `previous`.
///
/// Surviving rows keep their position, new rows are appended in snapshot order,
/// rows missing from the snapshot are dropped. Malformed rows are skipped and
/// reported without aborting the merge.
pub fn reconcile(previous: &RowSet, scope: &Scope, incoming: &[serde_json::Value]) -> Reconciled {
    let started = std::time::Instant::now();
    let mut diagnostics = Vec::new();
    let mut fresh: FxHashMap<RowId, Row> = FxHashMap::default();
    let mut order: Vec<RowId> = Vec::with_capacity(incoming.len());

    for (i, raw) in incoming.iter().enumerate() {
        match parse_row(scope, i, raw) {
            Ok(row) => {
                let id = row.id.clone();
                if fresh.insert(id.clone(), row).is_some() {
                    debug!(id = %id, scope = %scope, "duplicate row id in snapshot; keeping last");
                } else {
                    order.push(id);
                }
            }
            Err(e) => {
                warn!(scope = %scope, error = %e, "dropping malformed row");
                counter!("rows_malformed_total").increment(1);
                diagnostics.push(Diagnostic::MalformedRow(e));
            }
        }
    }

    let mut rows = Vec::with_capacity(order.len());
    let mut changed = Vec::new();
    let mut removed = Vec::new();
    for prev in previous.rows.iter() {
        match fresh.remove(&prev.id) {
            Some(next) if next.fields != prev.fields => {
                changed.push(prev.id.clone());
                rows.push(Row { has_updated: true, ..next });
            }
            Some(_) => rows.push(prev.clone()),
            None => removed.push(prev.id.clone()),
        }
    }
    let mut inserted = Vec::new();
    for id in order {
        if let Some(row) = fresh.remove(&id) {
            inserted.push(id);
            rows.push(row);
        }
    }

    gauge!("table_rows").set(rows.len() as f64);
    histogram!("reconcile_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
    Reconciled { rows: RowSet::from_rows(rows), inserted, changed, removed, diagnostics }
}
