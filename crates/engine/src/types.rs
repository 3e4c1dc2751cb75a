//! Shared value types threaded between tasks via the reference registry.

use serde::{Deserialize, Serialize};

/// Group/Version/Resource — the cluster API addressing tuple for a
/// namespaced dynamic resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Gvr {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl Gvr {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Group/Version/Kind, parsed out of a rendered template document's
/// `apiVersion`/`kind` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn from_api_version_and_kind(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Gvk {
                group: group.to_string(),
                version: version.to_string(),
                kind: kind.to_string(),
            },
            None => Gvk {
                group: String::new(),
                version: api_version.to_string(),
                kind: kind.to_string(),
            },
        }
    }
}

/// One document within a (possibly multi-document) object template, plus
/// the GVK discovered from its `apiVersion`/`kind` header.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    /// Raw YAML source of this document, pre-parameter-substitution.
    pub source: String,
    pub gvk: Gvk,
}

/// Registered object type: the output of a `Register` task, consumed by
/// `SubmitObj`. `gvr` is populated at `Register` execution time (resolved
/// via discovery, or hard-mapped for `batch/v1 Kind=Job`) and is parallel
/// to `documents`.
#[derive(Debug, Clone)]
pub struct RegisteredType {
    pub template_path: String,
    pub documents: Vec<CompiledDocument>,
    pub gvr: Vec<Gvr>,
    pub name_format: String,
    pub pod_name_format: Option<String>,
    pub pod_count_expr: Option<String>,
}

/// Instance record published by a `SubmitObj` task and consulted by every
/// task downstream that references it.
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    pub names: Vec<String>,
    pub namespace: String,
    pub gvr: Vec<Gvr>,
    pub expected_pod_count: usize,
    pub pod_name_regexes: Vec<String>,
}
