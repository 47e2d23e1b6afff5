//! gridwatch cells: decide how each table cell is rendered.
//!
//! `dispatch` walks an ordered rule table and returns the `RenderSpec` of the first
//! rule that applies. Rule order is significant: an earlier rule always wins,
//! so a missing value short-circuits before any type-specific handling.

#![forbid(unsafe_code)]

use gridwatch_core::columns::ColumnType;
use gridwatch_core::{display_text, Fields, ResourceKind};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub mod age;

pub use age::{parse_timestamp, render_age};

/// Shown in place of an empty value.
pub const PLACEHOLDER_DASH: &str = "\u{2014}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Ok,
    Warning,
    Error,
    Neutral,
}

impl Tone {
    pub fn of(status: &str) -> Tone {
        match status {
            "Running" | "Ready" | "Active" | "Bound" | "Succeeded" | "Completed" | "True" | "Normal" => Tone::Ok,
            "Pending" | "ContainerCreating" | "Terminating" | "Unknown" | "Warning" => Tone::Warning,
            "Failed" | "Error" | "CrashLoopBackOff" | "ImagePullBackOff" | "ErrImagePull" | "NotReady" | "False" | "Lost"
            | "Evicted" => Tone::Error,
            _ => Tone::Neutral,
        }
    }
}

/// Rendering chosen for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "render", rename_all = "snake_case")]
pub enum RenderSpec {
    /// Row data is still loading.
    Placeholder,
    Default { text: String, truncate: bool },
    Conditions { items: Vec<String> },
    /// `at` is epoch seconds when `raw` parsed as a timestamp.
    RelativeTime { raw: String, at: Option<i64> },
    /// `current/desired`, kept verbatim in `raw`.
    Ratio { raw: String, current: Option<u64>, desired: Option<u64> },
    Status { text: String, tone: Tone },
    Link { text: String, target: String },
    MultiValue { items: Vec<String> },
}

impl RenderSpec {
    fn empty() -> Self {
        RenderSpec::Default { text: String::new(), truncate: true }
    }

    /// Plain-text form, with relative times measured against `now` (epoch seconds).
    pub fn text(&self, now: i64) -> String {
        match self {
            RenderSpec::Placeholder => "...".to_string(),
            RenderSpec::Default { text, .. } => text.clone(),
            RenderSpec::Conditions { items } | RenderSpec::MultiValue { items } => items.join(", "),
            RenderSpec::RelativeTime { at: Some(at), .. } => render_age(*at, now),
            RenderSpec::RelativeTime { raw, at: None } => {
                if raw.is_empty() {
                    "-".to_string()
                } else {
                    raw.clone()
                }
            }
            RenderSpec::Ratio { raw, .. } => raw.clone(),
            RenderSpec::Status { text, .. } => text.clone(),
            RenderSpec::Link { text, .. } => text.clone(),
        }
    }
}

/// Per-row context a cell may need to build links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowContext {
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub config_name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Extra query string appended to custom resource links.
    #[serde(default)]
    pub query_params: Option<String>,
}

/// Which dispatch rule produced a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Loading,
    Missing,
    Conditions,
    Time,
    Ratio,
    Status,
    Name,
    EventsOrHpa,
    MultiValue,
    Fallback,
}

struct Cell<'a> {
    declared: &'a ColumnType,
    kind: &'a ResourceKind,
    raw: Option<&'a serde_json::Value>,
    /// `raw` as text; empty when `raw` is absent.
    text: String,
    ctx: &'a RowContext,
}

type Handler = fn(&Cell<'_>) -> Option<RenderSpec>;

const RULES: &[(Rule, Handler)] = &[
    (Rule::Loading, loading),
    (Rule::Missing, missing),
    (Rule::Conditions, conditions),
    (Rule::Time, time),
    (Rule::Ratio, ratio),
    (Rule::Status, status),
    (Rule::Name, name),
    (Rule::EventsOrHpa, events_or_hpa),
    (Rule::MultiValue, multi_value),
    (Rule::Fallback, fallback),
];

fn loading(c: &Cell<'_>) -> Option<RenderSpec> {
    c.ctx.loading.then_some(RenderSpec::Placeholder)
}

fn missing(c: &Cell<'_>) -> Option<RenderSpec> {
    (c.raw.is_none() || c.text == "undefined").then(RenderSpec::empty)
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn list_items(c: &Cell<'_>) -> Vec<String> {
    match c.raw {
        Some(serde_json::Value::Array(items)) => items.iter().map(display_text).filter(|s| !s.is_empty()).collect(),
        _ => split_list(&c.text),
    }
}

fn conditions(c: &Cell<'_>) -> Option<RenderSpec> {
    (*c.declared == ColumnType::Conditions).then(|| RenderSpec::Conditions { items: list_items(c) })
}

fn time(c: &Cell<'_>) -> Option<RenderSpec> {
    let applies = match c.declared {
        ColumnType::Age | ColumnType::Duration => true,
        ColumnType::EventTime | ColumnType::FirstTimestamp | ColumnType::LastTimestamp => c.text != "null",
        _ => false,
    };
    applies.then(|| RenderSpec::RelativeTime { raw: c.text.clone(), at: c.raw.and_then(parse_timestamp) })
}

fn ratio(c: &Cell<'_>) -> Option<RenderSpec> {
    if !matches!(c.declared, ColumnType::Ready | ColumnType::Current) {
        return None;
    }
    let (current, desired) = match c.text.split_once('/') {
        Some((a, b)) => (a.trim().parse().ok(), b.trim().parse().ok()),
        None => (c.text.trim().parse().ok(), None),
    };
    Some(RenderSpec::Ratio { raw: c.text.clone(), current, desired })
}

fn status(c: &Cell<'_>) -> Option<RenderSpec> {
    matches!(c.declared, ColumnType::Status | ColumnType::Reason | ColumnType::ConditionStatus)
        .then(|| RenderSpec::Status { text: c.text.clone(), tone: Tone::of(c.text.trim()) })
}

fn name(c: &Cell<'_>) -> Option<RenderSpec> {
    if *c.declared != ColumnType::Name {
        return None;
    }
    Some(RenderSpec::Link { text: c.text.clone(), target: detail_link(c.kind, &c.text, c.ctx) })
}

/// Detail page path for a named resource.
pub fn detail_link(kind: &ResourceKind, name: &str, ctx: &RowContext) -> String {
    let mut link = format!(
        "{}/{}/details?resourcekind={}&resourcename={}",
        ctx.config_name,
        ctx.cluster_name,
        kind.as_str().to_lowercase(),
        name
    );
    if *kind == ResourceKind::CustomResources {
        if let Some(params) = ctx.query_params.as_deref().map(|p| p.trim_start_matches('&')).filter(|p| !p.is_empty()) {
            link.push('&');
            link.push_str(params);
        }
    }
    if let Some(ns) = ctx.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        link.push_str("&namespace=");
        link.push_str(ns);
    }
    link
}

/// Query string addressing a custom resource row: its own `queryParam` when it
/// carries one, otherwise built from its `group`, `version` and `resource` fields.
pub fn query_params_for(fields: &Fields) -> Option<String> {
    if let Some(q) = fields.get("queryParam").and_then(|v| v.as_str()).filter(|q| !q.is_empty()) {
        return Some(q.to_string());
    }
    let parts: Vec<String> = ["group", "version", "resource"]
        .iter()
        .filter_map(|k| fields.get(*k).and_then(|v| v.as_str()).filter(|v| !v.is_empty()).map(|v| format!("{}={}", k, v)))
        .collect();
    (!parts.is_empty()).then(|| parts.join("&"))
}

fn events_or_hpa(c: &Cell<'_>) -> Option<RenderSpec> {
    if !matches!(c.kind, ResourceKind::Events | ResourceKind::HorizontalPodAutoscalers) {
        return None;
    }
    let text = if c.text == "null" { PLACEHOLDER_DASH.to_string() } else { c.text.clone() };
    Some(RenderSpec::Default { text, truncate: false })
}

fn multi_value(c: &Cell<'_>) -> Option<RenderSpec> {
    let list_column =
        matches!(c.declared, ColumnType::Rules | ColumnType::Ports | ColumnType::Bindings | ColumnType::Roles | ColumnType::Keys);
    let list_kind = matches!(
        c.kind,
        ResourceKind::Ingresses
            | ResourceKind::Endpoints
            | ResourceKind::Services
            | ResourceKind::RoleBindings
            | ResourceKind::Nodes
            | ResourceKind::Secrets
            | ResourceKind::ConfigMaps
    );
    (list_column && list_kind && !c.text.is_empty()).then(|| RenderSpec::MultiValue { items: list_items(c) })
}

fn fallback(c: &Cell<'_>) -> Option<RenderSpec> {
    let text = if c.text.is_empty() { PLACEHOLDER_DASH.to_string() } else { c.text.clone() };
    Some(RenderSpec::Default { text, truncate: true })
}

/// Pick the rendering for one cell. Never fails; unknown column types fall
/// through to the plain default.
pub fn dispatch(declared: &ColumnType, kind: &ResourceKind, raw: Option<&serde_json::Value>, ctx: &RowContext) -> RenderSpec {
    dispatch_with_rule(declared, kind, raw, ctx).1
}

/// Like [`dispatch`], also reporting which rule matched.
pub fn dispatch_with_rule(
    declared: &ColumnType,
    kind: &ResourceKind,
    raw: Option<&serde_json::Value>,
    ctx: &RowContext,
) -> (Rule, RenderSpec) {
    let cell = Cell { declared, kind, raw, text: raw.map(display_text).unwrap_or_default(), ctx };
    for (rule, handler) in RULES {
        if let Some(spec) = handler(&cell) {
            trace!(?rule, column = ?declared, kind = %kind, "cell dispatched");
            return (*rule, spec);
        }
    }
    (Rule::Fallback, RenderSpec::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rule_table_is_in_priority_order() {
        let order: Vec<Rule> = RULES.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            order,
            vec![
                Rule::Loading,
                Rule::Missing,
                Rule::Conditions,
                Rule::Time,
                Rule::Ratio,
                Rule::Status,
                Rule::Name,
                Rule::EventsOrHpa,
                Rule::MultiValue,
                Rule::Fallback
            ]
        );
    }

    #[test]
    fn loading_wins_over_everything() {
        let ctx = RowContext { loading: true, ..Default::default() };
        let (rule, spec) = dispatch_with_rule(&ColumnType::Name, &ResourceKind::Pods, None, &ctx);
        assert_eq!(rule, Rule::Loading);
        assert_eq!(spec, RenderSpec::Placeholder);
    }

    #[test]
    fn undefined_literal_is_missing() {
        let ctx = RowContext::default();
        let (rule, spec) = dispatch_with_rule(&ColumnType::Conditions, &ResourceKind::Deployments, Some(&json!("undefined")), &ctx);
        assert_eq!(rule, Rule::Missing);
        assert_eq!(spec.text(0), "");
    }

    #[test]
    fn custom_resource_links_carry_query_params() {
        let ctx = RowContext {
            config_name: "c".into(),
            cluster_name: "k".into(),
            namespace: None,
            query_params: Some("group=cert-manager.io&version=v1&resource=certificates".into()),
            ..Default::default()
        };
        let spec = dispatch(&ColumnType::Name, &ResourceKind::CustomResources, Some(&json!("cert")), &ctx);
        assert_eq!(
            spec,
            RenderSpec::Link {
                text: "cert".into(),
                target: "c/k/details?resourcekind=customresources&resourcename=cert&group=cert-manager.io&version=v1&resource=certificates"
                    .into()
            }
        );
    }

    #[test]
    fn custom_resource_link_without_params_has_no_empty_segment() {
        let ctx = RowContext { config_name: "c".into(), cluster_name: "k".into(), namespace: Some("ns".into()), ..Default::default() };
        let link = detail_link(&ResourceKind::CustomResources, "cert", &ctx);
        assert_eq!(link, "c/k/details?resourcekind=customresources&resourcename=cert&namespace=ns");
        assert!(!link.contains("&&"));

        let blank = RowContext { query_params: Some(String::new()), ..ctx };
        assert_eq!(detail_link(&ResourceKind::CustomResources, "cert", &blank), link);
    }

    #[test]
    fn query_params_come_from_row_fields() {
        let mut fields = Fields::new();
        assert_eq!(query_params_for(&fields), None);
        fields.insert("group".into(), json!("cert-manager.io"));
        fields.insert("version".into(), json!("v1"));
        fields.insert("resource".into(), json!("certificates"));
        assert_eq!(query_params_for(&fields).as_deref(), Some("group=cert-manager.io&version=v1&resource=certificates"));
        fields.insert("queryParam".into(), json!("group=acme.cert-manager.io&version=v1&resource=orders"));
        assert_eq!(query_params_for(&fields).as_deref(), Some("group=acme.cert-manager.io&version=v1&resource=orders"));
    }

    #[test]
    fn status_tone_follows_value() {
        let ctx = RowContext::default();
        let tone = |v: &str| match dispatch(&ColumnType::Status, &ResourceKind::Pods, Some(&json!(v)), &ctx) {
            RenderSpec::Status { tone, .. } => tone,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(tone("Running"), Tone::Ok);
        assert_eq!(tone("Pending"), Tone::Warning);
        assert_eq!(tone("CrashLoopBackOff"), Tone::Error);
        assert_eq!(tone("Whatever"), Tone::Neutral);
    }
}
