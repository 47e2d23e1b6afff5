//! Row model pipeline: column filter -> global filter -> sort, plus facets.
//!
//! Stages are pure. Facet counts for a column are taken over rows that pass the
//! global filter and every column filter except that column's own.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use gridwatch_core::columns::ColumnDef;
use gridwatch_core::{display_text, Row};
use gridwatch_search::{Rank, Ranker, NEUTRAL_RANK};
use metrics::histogram;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::debug;

use crate::filter::{FilterState, SortDirection};

/// Distinct value -> occurrence count.
pub type Facet = BTreeMap<String, usize>;

/// Which kind of table is being shown; only affects the empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TableContext {
    #[default]
    Resources,
    Events,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmptyState {
    NoResources,
    NoEvents,
}

impl EmptyState {
    pub fn message(&self) -> &'static str {
        "No results."
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    /// Visible rows in display order.
    pub rows: Vec<Row>,
    pub visible_columns: Vec<ColumnDef>,
    pub facets: BTreeMap<String, Facet>,
    /// Set when no row survived the filters.
    pub empty: Option<EmptyState>,
    /// Row count before filtering.
    pub total: usize,
}

struct Candidate<'a> {
    pos: usize,
    rank: Rank,
    row: &'a Row,
}

/// Run every stage over `rows` (in insertion order).
pub fn compute(rows: &[Row], columns: &[ColumnDef], filter: &FilterState, ctx: TableContext, ranker: &Ranker) -> TableView {
    let started = std::time::Instant::now();
    let query = filter.global_query.trim();
    let facetable: Vec<&ColumnDef> = columns.iter().filter(|c| c.facetable).collect();
    let active: Vec<(&str, &BTreeSet<String>)> = filter
        .column_filters
        .iter()
        .filter(|(_, set)| !set.is_empty())
        .filter(|(key, _)| {
            let known = columns.iter().any(|c| &c.key == *key);
            if !known {
                debug!(column = %key, "column filter on unknown column ignored");
            }
            known
        })
        .map(|(k, set)| (k.as_str(), set))
        .collect();

    let mut facets: BTreeMap<String, Facet> = facetable.iter().map(|c| (c.key.clone(), Facet::new())).collect();
    let mut passing: Vec<Candidate<'_>> = Vec::new();

    for (pos, row) in rows.iter().enumerate() {
        let texts: Vec<String> = facetable.iter().map(|c| row.text(&c.key)).collect();
        let rank = if query.is_empty() {
            Some(NEUTRAL_RANK)
        } else {
            ranker.best(texts.iter().map(|s| s.as_str()), query)
        };
        let Some(rank) = rank else { continue };

        let failed: SmallVec<[&str; 2]> = active
            .iter()
            .filter(|(key, accepted)| !accepted.contains(&row.text(key)))
            .map(|(key, _)| *key)
            .collect();
        match failed.as_slice() {
            [] => {
                for (col, text) in facetable.iter().zip(texts.iter()) {
                    bump(&mut facets, &col.key, text);
                }
                passing.push(Candidate { pos, rank, row });
            }
            [only] => {
                if let Some(i) = facetable.iter().position(|c| c.key == *only) {
                    bump(&mut facets, only, &texts[i]);
                }
            }
            _ => {}
        }
    }

    let sort_keys: Vec<(&str, SortDirection)> = filter
        .sort
        .iter()
        .filter(|d| columns.iter().any(|c| c.key == d.key && c.sortable))
        .map(|d| (d.key.as_str(), d.direction))
        .collect();
    if !sort_keys.is_empty() {
        // Keys are built once per row; text is case-folded here, not per comparison.
        let mut keyed: Vec<(SmallVec<[SortKey<'_>; 2]>, Candidate<'_>)> = passing
            .into_iter()
            .map(|c| {
                let row = c.row;
                (sort_keys.iter().map(|(key, _)| sort_key(row.get(key))).collect(), c)
            })
            .collect();
        keyed.sort_by(|(ka, a), (kb, b)| {
            ka.iter()
                .zip(kb.iter())
                .zip(sort_keys.iter())
                .map(|((x, y), (_, dir))| {
                    let ord = compare_keys(x, y);
                    match dir {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
                .then(a.pos.cmp(&b.pos))
        });
        passing = keyed.into_iter().map(|(_, c)| c).collect();
    } else if !query.is_empty() {
        passing.sort_by(|a, b| b.rank.cmp(&a.rank).then(a.pos.cmp(&b.pos)));
    }

    let visible_rows: Vec<Row> = passing.into_iter().map(|c| c.row.clone()).collect();
    let empty = if visible_rows.is_empty() {
        Some(match ctx {
            TableContext::Resources => EmptyState::NoResources,
            TableContext::Events => EmptyState::NoEvents,
        })
    } else {
        None
    };
    histogram!("pipeline_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
    TableView {
        rows: visible_rows,
        visible_columns: columns.iter().filter(|c| filter.is_visible(c)).cloned().collect(),
        facets,
        empty,
        total: rows.len(),
    }
}

fn bump(facets: &mut BTreeMap<String, Facet>, key: &str, value: &str) {
    if let Some(f) = facets.get_mut(key) {
        *f.entry(value.to_string()).or_insert(0) += 1;
    }
}

#[derive(Debug, PartialEq)]
enum SortKey<'a> {
    Missing,
    Bool(bool),
    Number(f64),
    Text { folded: String, exact: Cow<'a, str> },
}

impl SortKey<'_> {
    fn class(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Bool(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::Text { .. } => 3,
        }
    }
}

fn text_key(exact: Cow<'_, str>) -> SortKey<'_> {
    SortKey::Text { folded: exact.to_lowercase(), exact }
}

fn sort_key(v: Option<&serde_json::Value>) -> SortKey<'_> {
    use serde_json::Value;
    match v {
        None | Some(Value::Null) => SortKey::Missing,
        Some(Value::Bool(b)) => SortKey::Bool(*b),
        Some(Value::Number(n)) => n.as_f64().map(SortKey::Number).unwrap_or(SortKey::Missing),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => SortKey::Number(n),
            _ => text_key(Cow::Borrowed(s.as_str())),
        },
        Some(other) => text_key(Cow::Owned(display_text(other))),
    }
}

fn compare_keys(a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
    match (a, b) {
        (SortKey::Bool(x), SortKey::Bool(y)) => x.cmp(y),
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Text { folded: fx, exact: x }, SortKey::Text { folded: fy, exact: y }) => fx.cmp(fy).then_with(|| x.cmp(y)),
        _ => a.class().cmp(&b.class()),
    }
}

/// Ordering used by the sort stage: missing < bool < number < text.
/// Numeric-looking strings compare as numbers; text compares case-insensitively first.
pub fn compare_values(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    compare_keys(&sort_key(a), &sort_key(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_order_by_class_then_content() {
        assert_eq!(compare_values(None, Some(&json!(false))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!("10"))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("9")), Some(&json!("10"))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("beta")), Some(&json!("Alpha"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(3)), Some(&json!("abc"))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(null)), None), Ordering::Equal);
    }

    #[test]
    fn sort_keys_fold_case_once_at_construction() {
        let v = json!("Web-API");
        assert_eq!(sort_key(Some(&v)), SortKey::Text { folded: "web-api".into(), exact: Cow::Borrowed("Web-API") });
        assert_eq!(sort_key(Some(&json!(" 42 "))), SortKey::Number(42.0));
        assert_eq!(sort_key(Some(&json!(["a", "B"]))), SortKey::Text { folded: "a,b".into(), exact: Cow::Owned("a,B".into()) });
    }

    #[test]
    fn mixed_case_names_sort_case_insensitively_with_stable_ties() {
        use gridwatch_core::columns::columns_for;
        use gridwatch_core::{parse_row, ResourceKind, Scope};
        let scope = Scope::new("c", "k", None, ResourceKind::Pods);
        let rows: Vec<Row> = ["beta", "Alpha", "alpha", "Beta", "gamma"]
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let status = if i % 2 == 0 { "Running" } else { "Pending" };
                parse_row(&scope, i, &json!({"name": n, "status": status})).unwrap()
            })
            .collect();
        let columns = columns_for(&ResourceKind::Pods);
        let filter = FilterState::default().then_sort("status", SortDirection::Desc).then_sort("name", SortDirection::Asc);
        let view = compute(&rows, &columns, &filter, TableContext::Resources, &Ranker::default());
        let names: Vec<&str> = view.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma", "Alpha", "Beta"]);

        let by_name = FilterState::default().then_sort("name", SortDirection::Asc);
        let view = compute(&rows, &columns, &by_name, TableContext::Resources, &Ranker::default());
        let names: Vec<&str> = view.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "alpha", "Beta", "beta", "gamma"]);
    }
}
