//! gridwatch core types: scopes, rows, snapshots and diagnostics.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod columns;
pub mod kind;

pub use kind::ResourceKind;

/// Column key -> typed value for one row.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// Key carried by incoming rows that the core owns itself and never stores as a field.
const TRANSIENT_UPDATED_KEY: &str = "hasUpdated";

/// Subscription scope: which listing a snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub config: String,
    pub cluster: String,
    /// Absent and empty both mean all namespaces.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub namespace: Option<String>,
    pub kind: ResourceKind,
}

fn empty_as_none<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|s| !s.is_empty()))
}

impl Scope {
    pub fn new(config: impl Into<String>, cluster: impl Into<String>, namespace: Option<&str>, kind: ResourceKind) -> Self {
        Self {
            config: config.into(),
            cluster: cluster.into(),
            namespace: namespace.filter(|s| !s.is_empty()).map(|s| s.to_string()),
            kind,
        }
    }

    /// Stable textual key, e.g. `config/cluster/pods@default`.
    pub fn key(&self) -> String {
        match self.namespace.as_deref() {
            Some(ns) => format!("{}/{}/{}@{}", self.config, self.cluster, self.kind, ns),
            None => format!("{}/{}/{}", self.config, self.cluster, self.kind),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeParseError {
    #[error("scope `{0}`: expected config/cluster/kind[@namespace]")]
    Shape(String),
    #[error("scope `{0}`: empty segment")]
    EmptySegment(String),
}

impl FromStr for Scope {
    type Err = ScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, namespace) = match s.split_once('@') {
            Some((p, ns)) => (p, Some(ns)),
            None => (s, None),
        };
        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            [config, cluster, kind] => {
                if config.is_empty() || cluster.is_empty() || kind.is_empty() {
                    return Err(ScopeParseError::EmptySegment(s.to_string()));
                }
                Ok(Scope::new(*config, *cluster, namespace, ResourceKind::from(*kind)))
            }
            _ => Err(ScopeParseError::Shape(s.to_string())),
        }
    }
}

/// Stable row identity: cluster + kind + namespace + name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(scope: &Scope, namespace: Option<&str>, name: &str) -> Self {
        Self(format!("{}/{}/{}/{}", scope.cluster, scope.kind, namespace.unwrap_or(""), name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One resource instance as held by a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id: RowId,
    pub name: String,
    pub namespace: Option<String>,
    /// Replaced as a whole on every content change; never edited in place.
    pub fields: Arc<Fields>,
    /// True only inside the highlight window following a content change.
    pub has_updated: bool,
}

impl Row {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Text of a field as used by filters and facets. Missing fields read as empty.
    pub fn text(&self, key: &str) -> String {
        self.fields.get(key).map(display_text).unwrap_or_default()
    }
}

/// Full, authoritative listing for one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub scope: Scope,
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum RowError {
    #[error("row {index}: not a JSON object")]
    NotAnObject { index: usize },
    #[error("row {index}: missing identity field `name`")]
    MissingIdentity { index: usize },
}

/// Developer-facing diagnostics. Never surfaced to users as failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    MalformedRow(RowError),
    UnknownColumnType { column: String, label: String },
}

/// Parse an incoming raw row into a `Row` for `scope`.
pub fn parse_row(scope: &Scope, index: usize, raw: &serde_json::Value) -> Result<Row, RowError> {
    let obj = raw.as_object().ok_or(RowError::NotAnObject { index })?;
    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(RowError::MissingIdentity { index })?
        .to_string();
    let namespace = obj
        .get("namespace")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    let fields: Fields = obj
        .iter()
        .filter(|(k, _)| k.as_str() != TRANSIENT_UPDATED_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(Row {
        id: RowId::new(scope, namespace.as_deref(), &name),
        name,
        namespace,
        fields: Arc::new(fields),
        has_updated: false,
    })
}

/// Plain-text form of a field value, the way values are shown in a cell.
///
/// Strings are returned as-is, `null` reads as the literal `null`, arrays are
/// joined with `,` and objects fall back to compact JSON.
pub fn display_text(v: &serde_json::Value) -> String {
    use serde_json::Value;
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => v.to_string(),
    }
}

pub mod prelude {
    pub use super::{display_text, parse_row, Diagnostic, Fields, ResourceKind, Row, RowError, RowId, Scope, Snapshot};
    pub use super::columns::{ColumnDef, ColumnType};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> Scope {
        Scope::new("c", "k", Some("default"), ResourceKind::Pods)
    }

    #[test]
    fn empty_namespace_deserializes_as_all_namespaces() {
        let all = Scope::new("c", "k", None, ResourceKind::Pods);
        let blank: Scope = serde_json::from_value(json!({"config": "c", "cluster": "k", "namespace": "", "kind": "pods"})).unwrap();
        assert_eq!(blank, all);
        let absent: Scope = serde_json::from_value(json!({"config": "c", "cluster": "k", "kind": "pods"})).unwrap();
        assert_eq!(absent, all);
        let null: Scope = serde_json::from_value(json!({"config": "c", "cluster": "k", "namespace": null, "kind": "pods"})).unwrap();
        assert_eq!(null, all);
        let set: Scope = serde_json::from_value(json!({"config": "c", "cluster": "k", "namespace": "default", "kind": "pods"})).unwrap();
        assert_eq!(set, scope());
    }

    #[test]
    fn parse_row_builds_identity_and_drops_transient_flag() {
        let row = parse_row(&scope(), 0, &json!({"name": "nginx-1", "namespace": "default", "hasUpdated": true, "ready": "1/1"})).unwrap();
        assert_eq!(row.id.as_str(), "k/pods/default/nginx-1");
        assert!(!row.has_updated);
        assert!(row.get("hasUpdated").is_none());
        assert_eq!(row.text("ready"), "1/1");
    }

    #[test]
    fn parse_row_rejects_missing_identity() {
        assert_eq!(parse_row(&scope(), 3, &json!({"ready": "1/1"})), Err(RowError::MissingIdentity { index: 3 }));
        assert_eq!(parse_row(&scope(), 1, &json!({"name": ""})), Err(RowError::MissingIdentity { index: 1 }));
        assert_eq!(parse_row(&scope(), 2, &json!("nginx")), Err(RowError::NotAnObject { index: 2 }));
    }

    #[test]
    fn display_text_flattens_values() {
        assert_eq!(display_text(&json!(null)), "null");
        assert_eq!(display_text(&json!(3)), "3");
        assert_eq!(display_text(&json!(["Available", "Progressing"])), "Available,Progressing");
    }

    #[test]
    fn scope_parses_from_path() {
        let s: Scope = "prod/east/pods@default".parse().unwrap();
        assert_eq!(s, scope_with("prod", "east", Some("default")));
        let s: Scope = "prod/east/nodes".parse().unwrap();
        assert_eq!(s.namespace, None);
        assert_eq!(s.kind, ResourceKind::Nodes);
        assert!("prod/pods".parse::<Scope>().is_err());
        assert!("prod//pods".parse::<Scope>().is_err());
    }

    fn scope_with(config: &str, cluster: &str, ns: Option<&str>) -> Scope {
        Scope::new(config, cluster, ns, ResourceKind::Pods)
    }
}
