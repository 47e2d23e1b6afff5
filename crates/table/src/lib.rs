//! gridwatch table: filter, sort and facet rows for display.

#![forbid(unsafe_code)]

use std::sync::Arc;

use gridwatch_core::columns::{columns_for, ColumnDef};
use gridwatch_core::ResourceKind;
use gridwatch_search::Ranker;
use gridwatch_store::RowSet;
use tracing::trace;

pub mod filter;
pub mod pipeline;

pub use filter::{FilterState, SortDirection, SortDirective};
pub use pipeline::{compare_values, compute, EmptyState, Facet, TableContext, TableView};

struct Memo {
    rows: Arc<RowSet>,
    filter: Arc<FilterState>,
    view: Arc<TableView>,
}

/// One table: fixed columns, its empty-state context and the last computed view.
pub struct TableModel {
    kind: ResourceKind,
    columns: Vec<ColumnDef>,
    context: TableContext,
    ranker: Ranker,
    memo: Option<Memo>,
    recomputations: u64,
}

impl TableModel {
    pub fn new(kind: ResourceKind, columns: Vec<ColumnDef>, context: TableContext) -> Self {
        Self { kind, columns, context, ranker: Ranker::new(), memo: None, recomputations: 0 }
    }

    /// Columns from the registry; event tables get the events empty state.
    pub fn for_kind(kind: ResourceKind) -> Self {
        let context = if kind == ResourceKind::Events { TableContext::Events } else { TableContext::Resources };
        let columns = columns_for(&kind);
        Self::new(kind, columns, context)
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn context(&self) -> TableContext {
        self.context
    }

    /// Number of full pipeline runs so far.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Visible rows and facets for `rows` under `filter`. Reuses the previous
    /// result while both inputs are the same allocations as last time.
    pub fn view(&mut self, rows: &Arc<RowSet>, filter: &Arc<FilterState>) -> Arc<TableView> {
        if let Some(m) = &self.memo {
            if Arc::ptr_eq(&m.rows, rows) && Arc::ptr_eq(&m.filter, filter) {
                trace!(kind = %self.kind, "table view reused");
                return Arc::clone(&m.view);
            }
        }
        let view = Arc::new(compute(rows.rows(), &self.columns, filter, self.context, &self.ranker));
        self.recomputations += 1;
        self.memo = Some(Memo { rows: Arc::clone(rows), filter: Arc::clone(filter), view: Arc::clone(&view) });
        view
    }
}
