//! Per-table filter state. Independent of row data; every edit yields a new value.

use std::collections::{BTreeMap, BTreeSet};

use gridwatch_core::columns::ColumnDef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    pub key: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Free text matched fuzzily across facetable fields.
    #[serde(default)]
    pub global_query: String,
    /// Column key -> accepted values. An empty set places no constraint.
    #[serde(default)]
    pub column_filters: BTreeMap<String, BTreeSet<String>>,
    /// Multi-key sort, most significant first.
    #[serde(default)]
    pub sort: SmallVec<[SortDirective; 2]>,
    /// Column key -> shown. Columns not listed use their definition's default.
    #[serde(default)]
    pub visibility: BTreeMap<String, bool>,
}

impl FilterState {
    pub fn with_query(&self, query: &str) -> Self {
        Self { global_query: query.to_string(), ..self.clone() }
    }

    pub fn with_column_filter<I, S>(&self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            next.column_filters.remove(key);
        } else {
            next.column_filters.insert(key.to_string(), set);
        }
        next
    }

    /// Header click: unsorted -> ascending -> descending -> unsorted.
    /// Replaces any other sort keys.
    pub fn toggle_sort(&self, key: &str) -> Self {
        let current = self.sort.iter().find(|d| d.key == key).map(|d| d.direction);
        let mut next = self.clone();
        next.sort.clear();
        match current {
            None => next.sort.push(SortDirective { key: key.to_string(), direction: SortDirection::Asc }),
            Some(SortDirection::Asc) => next.sort.push(SortDirective { key: key.to_string(), direction: SortDirection::Desc }),
            Some(SortDirection::Desc) => {}
        }
        next
    }

    /// Append (or re-point) a less significant sort key.
    pub fn then_sort(&self, key: &str, direction: SortDirection) -> Self {
        let mut next = self.clone();
        next.sort.retain(|d| d.key != key);
        next.sort.push(SortDirective { key: key.to_string(), direction });
        next
    }

    pub fn with_visibility(&self, key: &str, shown: bool) -> Self {
        let mut next = self.clone();
        next.visibility.insert(key.to_string(), shown);
        next
    }

    pub fn is_visible(&self, col: &ColumnDef) -> bool {
        self.visibility.get(&col.key).copied().unwrap_or(col.visible)
    }
}
