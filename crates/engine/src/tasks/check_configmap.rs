//! `CheckConfigmap`: compares a target ConfigMap's data against an
//! expected map, either for exact equality or as a subset (spec §8
//! scenario 6; `pkg/engine/check_configmap_task.go`). Not part of the
//! reference registry — it addresses the configmap by name directly.

use super::{task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fleetbench_config::Task;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Op {
    Equal,
    Subset,
}

#[derive(Debug, Deserialize)]
struct Params {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    op: Op,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

pub struct CheckConfigmapTask {
    id: String,
    name: String,
    namespace: Option<String>,
    op: Op,
    expected: BTreeMap<String, String>,
}

impl CheckConfigmapTask {
    pub fn new(cfg: &Task) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;
        if params.name.is_empty() {
            return Err(Error::Validation(cfg.id.clone(), "'name' is required".into()));
        }
        Ok(Self {
            id: cfg.id.clone(),
            name: params.name,
            namespace: params.namespace,
            op: params.op,
            expected: params.data,
        })
    }
}

#[async_trait]
impl Runnable for CheckConfigmapTask {
    fn id(&self) -> String {
        task_label("CheckConfigmap", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let namespace = self.namespace.as_deref().unwrap_or(&ctx.default_namespace);
        let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), namespace);
        let cm = api.get(&self.name).await?;
        let actual = cm.data.unwrap_or_default();

        let ok = match self.op {
            Op::Equal => actual == self.expected,
            Op::Subset => self.expected.iter().all(|(k, v)| actual.get(k) == Some(v)),
        };

        if ok {
            Ok(())
        } else {
            Err(Error::Assertion(
                self.id.clone(),
                format!(
                    "configmap {}/{}: expected ({:?}) {:?}, found {:?}",
                    namespace, self.name, self.op, self.expected, actual
                ),
            ))
        }
    }
}
