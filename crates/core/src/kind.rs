//! Resource kinds, named by their lower-case list endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Pods,
    Deployments,
    DaemonSets,
    StatefulSets,
    ReplicaSets,
    Jobs,
    CronJobs,
    Services,
    Ingresses,
    Endpoints,
    ConfigMaps,
    Secrets,
    Nodes,
    Namespaces,
    Events,
    HorizontalPodAutoscalers,
    RoleBindings,
    Roles,
    /// Generic custom-resource listing; rows are addressed with group/version/kind.
    CustomResources,
    Other(String),
}

const KNOWN: &[(ResourceKind, &str)] = &[
    (ResourceKind::Pods, "pods"),
    (ResourceKind::Deployments, "deployments"),
    (ResourceKind::DaemonSets, "daemonsets"),
    (ResourceKind::StatefulSets, "statefulsets"),
    (ResourceKind::ReplicaSets, "replicasets"),
    (ResourceKind::Jobs, "jobs"),
    (ResourceKind::CronJobs, "cronjobs"),
    (ResourceKind::Services, "services"),
    (ResourceKind::Ingresses, "ingresses"),
    (ResourceKind::Endpoints, "endpoints"),
    (ResourceKind::ConfigMaps, "configmaps"),
    (ResourceKind::Secrets, "secrets"),
    (ResourceKind::Nodes, "nodes"),
    (ResourceKind::Namespaces, "namespaces"),
    (ResourceKind::Events, "events"),
    (ResourceKind::HorizontalPodAutoscalers, "horizontalpodautoscalers"),
    (ResourceKind::RoleBindings, "rolebindings"),
    (ResourceKind::Roles, "roles"),
    (ResourceKind::CustomResources, "customresources"),
];

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        if let ResourceKind::Other(s) = self {
            return s.as_str();
        }
        KNOWN
            .iter()
            .find(|(k, _)| k == self)
            .map(|(_, s)| *s)
            .unwrap_or("")
    }

    /// Cluster-scoped kinds have no namespace column.
    pub fn namespaced(&self) -> bool {
        !matches!(self, ResourceKind::Nodes | ResourceKind::Namespaces)
    }

    pub fn all() -> impl Iterator<Item = &'static ResourceKind> {
        KNOWN.iter().map(|(k, _)| k)
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        KNOWN
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| ResourceKind::Other(s.to_string()))
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        ResourceKind::from(s.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(k: ResourceKind) -> Self {
        k.as_str().to_string()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
