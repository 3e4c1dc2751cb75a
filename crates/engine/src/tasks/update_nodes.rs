//! `UpdateNodes`: patches every node whose labels are a superset of at
//! least one selector (OR across selectors, AND within each selector's
//! key/value pairs) (spec §4.9). Grounded on `newUpdateNodesTask`
//! (`pkg/engine/update_nodes_task.go`).

use super::{task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::patch::PatchData;
use async_trait::async_trait;
use fleetbench_config::Task;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams, Patch, PatchParams};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct Params {
    selectors: Vec<BTreeMap<String, String>>,
    state: Value,
}

pub struct UpdateNodesTask {
    id: String,
    selectors: Vec<BTreeMap<String, String>>,
    patch: PatchData,
}

impl UpdateNodesTask {
    pub fn new(cfg: &Task) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;

        if params.selectors.is_empty() {
            return Err(Error::Validation(cfg.id.clone(), "'selectors' must be non-empty".into()));
        }
        if !params.state.is_object() || params.state.as_object().is_some_and(|m| m.is_empty()) {
            return Err(Error::Validation(cfg.id.clone(), "'state' must be non-empty".into()));
        }

        Ok(Self {
            id: cfg.id.clone(),
            patch: PatchData::new(&params.state),
            selectors: params.selectors,
        })
    }
}

#[async_trait]
impl Runnable for UpdateNodesTask {
    fn id(&self) -> String {
        task_label("UpdateNodes", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let api: Api<Node> = Api::all(ctx.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        let patch_params = PatchParams::default();

        for node in &nodes.items {
            let Some(name) = &node.metadata.name else {
                continue;
            };
            let labels = node.metadata.labels.clone().unwrap_or_default();
            let matches = self
                .selectors
                .iter()
                .any(|selector| selector.iter().all(|(k, v)| labels.get(k) == Some(v)));
            if !matches {
                continue;
            }

            if let Some(root) = &self.patch.root {
                api.patch(name, &patch_params, &Patch::Merge(root)).await?;
            }
            if let Some(status) = &self.patch.status {
                api.patch_status(name, &patch_params, &Patch::Merge(status))
                    .await?;
            }
        }
        Ok(())
    }
}
