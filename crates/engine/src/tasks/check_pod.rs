//! `CheckPod`: asserts that the expected number of pods spawned by a
//! submission reach a phase (and, optionally, land on nodes with exact
//! label matches) (spec §4.10). Grounded on `newCheckPodTask`
//! (`pkg/engine/check_pod_task.go`).

use super::{task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fleetbench_config::{parse_duration, Task};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::runtime::{watcher, WatchStreamExt};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Params {
    #[serde(rename = "refTaskId")]
    ref_task_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "nodeLabels")]
    node_labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    timeout: Option<String>,
}

pub struct CheckPodTask {
    id: String,
    ref_task_id: String,
    expected_status: Option<String>,
    node_labels: Option<BTreeMap<String, String>>,
    timeout: Option<Duration>,
}

impl CheckPodTask {
    pub fn new(cfg: &Task, ctx: &Context) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;
        if !ctx.registry.has_info(&params.ref_task_id) {
            return Err(Error::UnreferencedTaskId(cfg.id.clone(), params.ref_task_id));
        }
        let timeout = params
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| Error::Validation(cfg.id.clone(), e))?;

        Ok(Self {
            id: cfg.id.clone(),
            ref_task_id: params.ref_task_id,
            expected_status: params.status,
            node_labels: params.node_labels,
            timeout,
        })
    }

    fn matches(&self, pod: &Pod, regexes: &[Regex], nodes: &BTreeMap<String, Node>) -> bool {
        let Some(name) = pod.metadata.name.as_deref() else {
            return false;
        };
        if !regexes.iter().any(|r| r.is_match(name)) {
            return false;
        }

        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("");
        if let Some(expected) = &self.expected_status {
            if phase != expected {
                return false;
            }
        }

        if let Some(node_labels) = &self.node_labels {
            if phase != "Running" {
                return false;
            }
            let Some(node_name) = pod.spec.as_ref().and_then(|s| s.node_name.as_deref()) else {
                return false;
            };
            let Some(node) = nodes.get(node_name) else {
                return false;
            };
            let labels = node.metadata.labels.clone().unwrap_or_default();
            if labels.len() != node_labels.len()
                || !node_labels.iter().all(|(k, v)| labels.get(k) == Some(v))
            {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl Runnable for CheckPodTask {
    fn id(&self) -> String {
        task_label("CheckPod", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let info = ctx.registry.get_info(&self.ref_task_id)?;
        let regexes = info
            .pod_name_regexes
            .iter()
            .map(|r| Regex::new(r))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let pods: Api<Pod> = Api::namespaced(ctx.client.clone(), &info.namespace);
        let node_api: Api<Node> = Api::all(ctx.client.clone());

        let fetch_nodes = |needed: bool| {
            let node_api = node_api.clone();
            async move {
                if !needed {
                    return Ok::<_, Error>(BTreeMap::new());
                }
                let list = node_api.list(&ListParams::default()).await?;
                Ok(list
                    .items
                    .into_iter()
                    .filter_map(|n| n.metadata.name.clone().map(|name| (name, n)))
                    .collect())
            }
        };

        let count_matches = |pods: &[Pod], nodes: &BTreeMap<String, Node>| -> HashSet<String> {
            pods.iter()
                .filter(|p| self.matches(p, &regexes, nodes))
                .filter_map(|p| p.metadata.name.clone())
                .collect()
        };

        let nodes = fetch_nodes(self.node_labels.is_some()).await?;
        let initial = pods.list(&ListParams::default()).await?;
        let mut matched = count_matches(&initial.items, &nodes);
        if matched.len() == info.expected_pod_count {
            return Ok(());
        }

        let Some(timeout) = self.timeout else {
            return Err(Error::Assertion(
                self.id.clone(),
                format!(
                    "expected {} matching pods, found {}",
                    info.expected_pod_count,
                    matched.len()
                ),
            ));
        };

        let stream = watcher::watcher(pods.clone(), watcher::Config::default()).applied_objects();
        tokio::pin!(stream);

        let result = tokio::time::timeout(timeout, async {
            while let Some(event) = stream.next().await {
                if let Ok(pod) = event {
                    let nodes = fetch_nodes(self.node_labels.is_some()).await.unwrap_or_default();
                    if self.matches(&pod, &regexes, &nodes) {
                        if let Some(name) = &pod.metadata.name {
                            matched.insert(name.clone());
                        }
                    }
                    if matched.len() == info.expected_pod_count {
                        return;
                    }
                }
            }
        })
        .await;

        if matched.len() == info.expected_pod_count {
            return Ok(());
        }

        match result {
            Ok(()) | Err(_) => Err(Error::DeadlineExceeded(
                self.id.clone(),
                vec![format!(
                    "{}/{} pods matched",
                    matched.len(),
                    info.expected_pod_count
                )],
            )),
        }
    }
}
