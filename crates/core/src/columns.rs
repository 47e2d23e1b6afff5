//! Built-in columns and projectors for core Kubernetes kinds.
//!
//! This module provides:
//! - Declared column types used by cell dispatch
//! - A registry mapping resource kinds to fixed column sets
//! - JSON projectors turning raw objects into flat row fields

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

use crate::{Diagnostic, Fields, ResourceKind};

/// Semantic tag of a column. Drives how its cells are rendered.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Name,
    Age,
    Duration,
    EventTime,
    FirstTimestamp,
    LastTimestamp,
    Ready,
    Current,
    Status,
    Reason,
    ConditionStatus,
    Conditions,
    Rules,
    Ports,
    Bindings,
    Roles,
    Keys,
    /// Plain value column with no special rendering.
    Generic,
    /// Header label the dispatcher does not know.
    Other(String),
}

// Header labels that are plain on purpose.
const PLAIN_LABELS: &[&str] = &[
    "Namespace", "Node", "Restarts", "Desired", "Up-to-date", "Available", "Type", "Cluster IP",
    "External IP", "Version", "Message", "Object", "Source", "Count", "Schedule", "Suspend",
    "Active", "Last Schedule", "Completions", "Class", "Hosts", "Address", "MinPods", "MaxPods",
    "Replicas", "Scope", "Versions", "Group", "Kind",
];

impl ColumnType {
    /// Parse a header label the way tables name their columns.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Name" => ColumnType::Name,
            "Age" => ColumnType::Age,
            "Duration" => ColumnType::Duration,
            "eventTime" => ColumnType::EventTime,
            "firstTimestamp" => ColumnType::FirstTimestamp,
            "lastTimestamp" => ColumnType::LastTimestamp,
            "Ready" => ColumnType::Ready,
            "Current" => ColumnType::Current,
            "Status" => ColumnType::Status,
            "reason" => ColumnType::Reason,
            "Condition Status" => ColumnType::ConditionStatus,
            "Conditions" => ColumnType::Conditions,
            "Rules" => ColumnType::Rules,
            "Ports" => ColumnType::Ports,
            "Bindings" => ColumnType::Bindings,
            "Roles" => ColumnType::Roles,
            "Keys" => ColumnType::Keys,
            l if PLAIN_LABELS.contains(&l) => ColumnType::Generic,
            other => ColumnType::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ColumnType::Other(_))
    }
}

/// Static column definition; fixed for the lifetime of one table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Accessor into `Row.fields`.
    pub key: String,
    pub label: String,
    pub declared: ColumnType,
    pub sortable: bool,
    /// Initial visibility; the user toggles it through filter state.
    pub visible: bool,
    pub facetable: bool,
    pub width: f32,
}

impl ColumnDef {
    pub fn new(key: &str, label: &str, width: f32) -> Self {
        let declared = ColumnType::from_label(label);
        let sortable = !matches!(declared, ColumnType::Conditions | ColumnType::Rules | ColumnType::Bindings | ColumnType::Keys);
        Self { key: key.to_string(), label: label.to_string(), declared, sortable, visible: true, facetable: true, width }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

fn col(key: &str, label: &str, width: f32) -> ColumnDef {
    ColumnDef::new(key, label, width)
}

/// Return the full column set for a kind, including Namespace/Name/Age.
/// Unknown kinds get just Namespace/Name/Age.
pub fn columns_for(kind: &ResourceKind) -> Vec<ColumnDef> {
    let mut cols: Vec<ColumnDef> = Vec::new();
    if kind.namespaced() {
        cols.push(col("namespace", "Namespace", 160.0));
    }
    if *kind != ResourceKind::Events {
        cols.push(col("name", "Name", 240.0));
    }

    match kind {
        ResourceKind::Pods => {
            cols.push(col("node", "Node", 140.0));
            cols.push(col("ready", "Ready", 80.0));
            cols.push(col("restarts", "Restarts", 80.0));
            cols.push(col("status", "Status", 100.0));
        }
        ResourceKind::Deployments => {
            cols.push(col("ready", "Ready", 90.0));
            cols.push(col("desired", "Desired", 80.0).hidden());
            cols.push(col("updated", "Up-to-date", 90.0));
            cols.push(col("available", "Available", 90.0));
            cols.push(col("conditions", "Conditions", 180.0));
        }
        ResourceKind::DaemonSets => {
            cols.push(col("desired", "Desired", 80.0));
            cols.push(col("current", "Current", 80.0));
            cols.push(col("ready", "Ready", 80.0));
            cols.push(col("updated", "Up-to-date", 90.0));
            cols.push(col("available", "Available", 90.0));
        }
        ResourceKind::StatefulSets => {
            cols.push(col("ready", "Ready", 90.0));
        }
        ResourceKind::ReplicaSets => {
            cols.push(col("desired", "Desired", 80.0));
            cols.push(col("current", "Current", 80.0));
            cols.push(col("ready", "Ready", 80.0));
        }
        ResourceKind::Jobs => {
            cols.push(col("completions", "Completions", 100.0));
            cols.push(col("duration", "Duration", 90.0));
            cols.push(col("conditions", "Conditions", 160.0));
        }
        ResourceKind::CronJobs => {
            cols.push(col("schedule", "Schedule", 120.0));
            cols.push(col("suspend", "Suspend", 80.0));
            cols.push(col("active", "Active", 70.0));
            cols.push(col("lastSchedule", "Last Schedule", 140.0));
        }
        ResourceKind::Services => {
            cols.push(col("type", "Type", 80.0));
            cols.push(col("clusterIP", "Cluster IP", 120.0));
            cols.push(col("externalIP", "External IP", 160.0));
            cols.push(col("ports", "Ports", 140.0));
        }
        ResourceKind::Ingresses => {
            cols.push(col("class", "Class", 100.0));
            cols.push(col("rules", "Rules", 200.0));
        }
        ResourceKind::Endpoints => {
            cols.push(col("ports", "Ports", 160.0));
        }
        ResourceKind::ConfigMaps => {
            cols.push(col("keys", "Keys", 200.0));
        }
        ResourceKind::Secrets => {
            cols.push(col("type", "Type", 160.0));
            cols.push(col("keys", "Keys", 200.0));
        }
        ResourceKind::Nodes => {
            cols.push(col("roles", "Roles", 120.0));
            cols.push(col("conditionStatus", "Condition Status", 110.0));
            cols.push(col("version", "Version", 110.0));
        }
        ResourceKind::Namespaces => {
            cols.push(col("status", "Status", 90.0));
        }
        ResourceKind::Events => {
            cols.push(col("type", "Type", 80.0));
            cols.push(col("reason", "reason", 120.0));
            cols.push(col("object", "Object", 200.0));
            cols.push(col("message", "Message", 320.0));
            cols.push(col("count", "Count", 60.0));
            cols.push(col("firstTimestamp", "firstTimestamp", 110.0));
            cols.push(col("lastTimestamp", "lastTimestamp", 110.0));
            return cols;
        }
        ResourceKind::HorizontalPodAutoscalers => {
            cols.push(col("minPods", "MinPods", 80.0));
            cols.push(col("maxPods", "MaxPods", 80.0));
            cols.push(col("current", "Current", 80.0));
        }
        ResourceKind::RoleBindings => {
            cols.push(col("bindings", "Bindings", 220.0));
        }
        ResourceKind::Roles => {
            cols.push(col("rules", "Rules", 220.0));
        }
        ResourceKind::CustomResources | ResourceKind::Other(_) => {}
    }

    cols.push(col("age", "Age", 70.0));
    cols
}

/// Column set for a custom resource: the base columns plus its printer columns
/// given as `(key, label)` pairs. Labels the dispatcher does not know are kept
/// (they render as plain values) and reported.
pub fn columns_from_labels(kind: &ResourceKind, extra: &[(&str, &str)]) -> (Vec<ColumnDef>, Vec<Diagnostic>) {
    let mut cols = columns_for(kind);
    let age = cols.pop();
    let mut diags = Vec::new();
    for (key, label) in extra {
        let def = ColumnDef::new(key, label, 120.0);
        if !def.declared.is_known() {
            warn!(column = %key, label = %label, "unknown column type; rendering as plain value");
            diags.push(Diagnostic::UnknownColumnType { column: key.to_string(), label: label.to_string() });
        }
        cols.push(def);
    }
    cols.extend(age);
    (cols, diags)
}

/// Projector takes a raw JSON object and yields flat row fields.
pub trait Projector: Send + Sync {
    fn project(&self, raw: &serde_json::Value) -> Fields;
}

/// Return a JSON projector for a supported built-in kind.
pub fn builtin_projector_for(kind: &ResourceKind) -> Option<std::sync::Arc<dyn Projector>> {
    match kind {
        ResourceKind::Pods
        | ResourceKind::Deployments
        | ResourceKind::Services
        | ResourceKind::Nodes
        | ResourceKind::Namespaces => Some(std::sync::Arc::new(BuiltinProjector { kind: kind.clone() })),
        _ => None,
    }
}

struct BuiltinProjector {
    kind: ResourceKind,
}

fn str_at<'a>(raw: &'a serde_json::Value, ptr: &str) -> Option<&'a str> {
    raw.pointer(ptr).and_then(|v| v.as_str())
}

fn u64_at(raw: &serde_json::Value, ptr: &str) -> u64 {
    raw.pointer(ptr).and_then(|v| v.as_u64()).unwrap_or(0)
}

impl BuiltinProjector {
    fn project_meta(&self, raw: &serde_json::Value, out: &mut Fields) {
        if let Some(name) = str_at(raw, "/metadata/name") {
            out.insert("name".into(), name.into());
        }
        if let Some(ns) = str_at(raw, "/metadata/namespace") {
            out.insert("namespace".into(), ns.into());
        }
        if let Some(ts) = str_at(raw, "/metadata/creationTimestamp") {
            out.insert("age".into(), ts.into());
        }
    }

    fn project_pod(&self, raw: &serde_json::Value, out: &mut Fields) {
        let mut ready = 0u64;
        let mut total = 0u64;
        let mut restarts = 0u64;
        if let Some(cs) = raw.pointer("/status/containerStatuses").and_then(|v| v.as_array()) {
            total = cs.len() as u64;
            for c in cs {
                if c.get("ready").and_then(|v| v.as_bool()).unwrap_or(false) {
                    ready += 1;
                }
                restarts += c.get("restartCount").and_then(|v| v.as_u64()).unwrap_or(0);
            }
        }
        out.insert("ready".into(), format!("{}/{}", ready, total).into());
        out.insert("restarts".into(), restarts.into());
        let phase = str_at(raw, "/status/phase").unwrap_or("");
        let reason = str_at(raw, "/status/reason").unwrap_or("");
        let status = if !reason.is_empty() { reason } else { phase };
        out.insert("status".into(), status.into());
        if let Some(node) = str_at(raw, "/spec/nodeName") {
            out.insert("node".into(), node.into());
        }
    }

    fn project_deployment(&self, raw: &serde_json::Value, out: &mut Fields) {
        let replicas = u64_at(raw, "/status/replicas");
        out.insert("ready".into(), format!("{}/{}", u64_at(raw, "/status/readyReplicas"), replicas).into());
        out.insert("desired".into(), replicas.into());
        out.insert("updated".into(), u64_at(raw, "/status/updatedReplicas").into());
        out.insert("available".into(), u64_at(raw, "/status/availableReplicas").into());
        let conds: SmallVec<[&str; 4]> = raw
            .pointer("/status/conditions")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|c| c.get("type").and_then(|v| v.as_str())).collect())
            .unwrap_or_default();
        out.insert("conditions".into(), conds.join(",").into());
    }

    fn project_service(&self, raw: &serde_json::Value, out: &mut Fields) {
        if let Some(t) = str_at(raw, "/spec/type") {
            out.insert("type".into(), t.into());
        }
        if let Some(ip) = str_at(raw, "/spec/clusterIP") {
            out.insert("clusterIP".into(), ip.into());
        }
        // External IPs from spec.externalIPs or status.loadBalancer.ingress
        let mut eps: Vec<String> = Vec::new();
        if let Some(arr) = raw.pointer("/spec/externalIPs").and_then(|v| v.as_array()) {
            eps.extend(arr.iter().filter_map(|it| it.as_str().map(|s| s.to_string())));
        }
        if eps.is_empty() {
            if let Some(arr) = raw.pointer("/status/loadBalancer/ingress").and_then(|v| v.as_array()) {
                for it in arr {
                    if let Some(ip) = it.get("ip").and_then(|v| v.as_str()) {
                        eps.push(ip.to_string());
                    } else if let Some(h) = it.get("hostname").and_then(|v| v.as_str()) {
                        eps.push(h.to_string());
                    }
                }
            }
        }
        out.insert("externalIP".into(), eps.join(",").into());
        if let Some(ports) = raw.pointer("/spec/ports").and_then(|v| v.as_array()) {
            let v: Vec<String> = ports
                .iter()
                .map(|p| {
                    let port = p.get("port").and_then(|v| v.as_u64()).unwrap_or(0);
                    let proto = p.get("protocol").and_then(|v| v.as_str()).unwrap_or("TCP");
                    format!("{}/{}", port, proto)
                })
                .collect();
            out.insert("ports".into(), v.join(",").into());
        }
    }

    fn project_node(&self, raw: &serde_json::Value, out: &mut Fields) {
        let mut status = "Unknown";
        if let Some(conds) = raw.pointer("/status/conditions").and_then(|v| v.as_array()) {
            if let Some(c) = conds.iter().find(|c| c.get("type").and_then(|v| v.as_str()) == Some("Ready")) {
                status = if c.get("status").and_then(|v| v.as_str()) == Some("True") { "Ready" } else { "NotReady" };
            }
        }
        out.insert("conditionStatus".into(), status.into());
        let mut roles: Vec<String> = Vec::new();
        if let Some(lbls) = raw.pointer("/metadata/labels").and_then(|v| v.as_object()) {
            for k in lbls.keys() {
                if let Some(role) = k.strip_prefix("node-role.kubernetes.io/") {
                    roles.push(if role.is_empty() { "node".into() } else { role.to_string() });
                }
            }
            if roles.is_empty() {
                if let Some(r) = lbls.get("kubernetes.io/role").and_then(|v| v.as_str()) {
                    roles.push(r.to_string());
                }
            }
        }
        if roles.is_empty() {
            roles.push("none".into());
        }
        out.insert("roles".into(), roles.join(",").into());
        if let Some(v) = str_at(raw, "/status/nodeInfo/kubeletVersion") {
            out.insert("version".into(), v.into());
        }
    }

    fn project_namespace(&self, raw: &serde_json::Value, out: &mut Fields) {
        if let Some(s) = str_at(raw, "/status/phase") {
            out.insert("status".into(), s.into());
        }
    }
}

impl Projector for BuiltinProjector {
    fn project(&self, raw: &serde_json::Value) -> Fields {
        let mut out = Fields::new();
        self.project_meta(raw, &mut out);
        match self.kind {
            ResourceKind::Pods => self.project_pod(raw, &mut out),
            ResourceKind::Deployments => self.project_deployment(raw, &mut out),
            ResourceKind::Services => self.project_service(raw, &mut out),
            ResourceKind::Nodes => self.project_node(raw, &mut out),
            ResourceKind::Namespaces => self.project_namespace(raw, &mut out),
            _ => {}
        }
        out
    }
}
