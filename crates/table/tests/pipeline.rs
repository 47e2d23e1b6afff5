use std::collections::BTreeSet;

use gridwatch_core::columns::columns_for;
use gridwatch_core::{parse_row, ResourceKind, Row, Scope};
use gridwatch_search::Ranker;
use gridwatch_table::{compute, FilterState, SortDirection, TableContext, TableView};
use serde_json::{json, Value};

fn pods(raw: Vec<Value>) -> Vec<Row> {
    let scope = Scope::new("c", "k", None, ResourceKind::Pods);
    raw.iter().enumerate().map(|(i, r)| parse_row(&scope, i, r).unwrap()).collect()
}

fn fixture() -> Vec<Row> {
    pods(vec![
        json!({"name": "nginx-1", "namespace": "default", "status": "Running"}),
        json!({"name": "redis", "namespace": "default", "status": "Pending"}),
        json!({"name": "nginx-2", "namespace": "web", "status": "Running"}),
        json!({"name": "coredns", "namespace": "kube-system", "status": "Failed"}),
        json!({"name": "nginx-3", "namespace": "web", "status": "Pending"}),
    ])
}

fn run(rows: &[Row], filter: &FilterState) -> TableView {
    compute(rows, &columns_for(&ResourceKind::Pods), filter, TableContext::Resources, &Ranker::new())
}

fn names(view: &TableView) -> Vec<&str> {
    view.rows.iter().map(|r| r.name.as_str()).collect()
}

#[test]
fn column_and_global_filters_commute() {
    let rows = fixture();
    let by_col = FilterState::default().with_column_filter("status", ["Running"]);
    let by_query = FilterState::default().with_query("nginx");
    let both = by_col.with_query("nginx");

    let a: BTreeSet<String> = run(&rows, &by_col).rows.iter().map(|r| r.name.clone()).collect();
    let b: BTreeSet<String> = run(&rows, &by_query).rows.iter().map(|r| r.name.clone()).collect();
    let c: BTreeSet<String> = run(&rows, &both).rows.iter().map(|r| r.name.clone()).collect();
    assert_eq!(c, a.intersection(&b).cloned().collect());
    assert_eq!(c, BTreeSet::from(["nginx-1".to_string(), "nginx-2".to_string()]));
}

#[test]
fn facets_ignore_the_columns_own_filter() {
    let rows = fixture();
    let f = FilterState::default().with_column_filter("status", ["Running"]);
    let view = run(&rows, &f);

    assert_eq!(names(&view), vec!["nginx-1", "nginx-2"]);
    let status = &view.facets["status"];
    assert_eq!(status.get("Running"), Some(&2));
    assert_eq!(status.get("Pending"), Some(&2));
    assert_eq!(status.get("Failed"), Some(&1));
    // other columns only see rows that pass the status filter
    let ns = &view.facets["namespace"];
    assert_eq!(ns.get("default"), Some(&1));
    assert_eq!(ns.get("web"), Some(&1));
    assert_eq!(ns.get("kube-system"), None);
}

#[test]
fn facets_respect_global_query_and_other_filters() {
    let rows = fixture();
    let f = FilterState::default()
        .with_query("nginx")
        .with_column_filter("status", ["Running"])
        .with_column_filter("namespace", ["web"]);
    let view = run(&rows, &f);
    assert_eq!(names(&view), vec!["nginx-2"]);
    // status facet: nginx rows in namespace web
    let status = &view.facets["status"];
    assert_eq!(status.get("Running"), Some(&1));
    assert_eq!(status.get("Pending"), Some(&1));
    // namespace facet: nginx rows that are Running
    let ns = &view.facets["namespace"];
    assert_eq!(ns.get("default"), Some(&1));
    assert_eq!(ns.get("web"), Some(&1));
}

#[test]
fn sort_keeps_insertion_order_for_ties_in_both_directions() {
    let rows = fixture();
    let asc = FilterState::default().toggle_sort("status");
    assert_eq!(names(&run(&rows, &asc)), vec!["coredns", "redis", "nginx-3", "nginx-1", "nginx-2"]);
    let desc = asc.toggle_sort("status");
    assert_eq!(names(&run(&rows, &desc)), vec!["nginx-1", "nginx-2", "redis", "nginx-3", "coredns"]);
    let none = desc.toggle_sort("status");
    assert_eq!(names(&run(&rows, &none)), vec!["nginx-1", "redis", "nginx-2", "coredns", "nginx-3"]);
}

#[test]
fn secondary_sort_key_breaks_ties() {
    let rows = fixture();
    let f = FilterState::default().toggle_sort("status").then_sort("name", SortDirection::Desc);
    assert_eq!(names(&run(&rows, &f)), vec!["coredns", "redis", "nginx-3", "nginx-2", "nginx-1"]);
}

#[test]
fn numeric_strings_sort_numerically() {
    let rows = pods(vec![
        json!({"name": "a", "restarts": "10"}),
        json!({"name": "b", "restarts": 9}),
        json!({"name": "c"}),
    ]);
    let view = run(&rows, &FilterState::default().toggle_sort("restarts"));
    assert_eq!(names(&view), vec!["c", "b", "a"]);
}

#[test]
fn query_without_sort_orders_by_rank() {
    let rows = pods(vec![json!({"name": "nxgxixnxx"}), json!({"name": "nginx"}), json!({"name": "redis"})]);
    let view = run(&rows, &FilterState::default().with_query("nginx"));
    assert_eq!(names(&view), vec!["nginx", "nxgxixnxx"]);
}

#[test]
fn unknown_filter_and_unsortable_sort_are_ignored() {
    let rows = fixture();
    let f = FilterState::default().with_column_filter("nope", ["x"]);
    assert_eq!(run(&rows, &f).rows.len(), 5);

    let deployments = columns_for(&ResourceKind::Deployments);
    let conditions = deployments.iter().find(|c| c.key == "conditions").unwrap();
    assert!(!conditions.sortable);
    let view = compute(&rows, &deployments, &FilterState::default().toggle_sort("conditions"), TableContext::Resources, &Ranker::new());
    assert_eq!(names(&view), vec!["nginx-1", "redis", "nginx-2", "coredns", "nginx-3"]);
}

#[test]
fn visibility_overrides_column_default() {
    let cols = columns_for(&ResourceKind::Deployments);
    let view = compute(&[], &cols, &FilterState::default(), TableContext::Resources, &Ranker::new());
    assert!(view.visible_columns.iter().all(|c| c.key != "desired"));
    let shown = FilterState::default().with_visibility("desired", true).with_visibility("age", false);
    let view = compute(&[], &cols, &shown, TableContext::Resources, &Ranker::new());
    assert!(view.visible_columns.iter().any(|c| c.key == "desired"));
    assert!(view.visible_columns.iter().all(|c| c.key != "age"));
}

#[test]
fn empty_result_is_explicit() {
    let rows = fixture();
    let view = run(&rows, &FilterState::default().with_query("zzzz"));
    assert!(view.rows.is_empty());
    assert_eq!(view.total, 5);
    assert!(view.empty.is_some());
    assert!(run(&rows, &FilterState::default()).empty.is_none());
}
