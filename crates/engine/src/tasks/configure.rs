//! `Configure`: applies bulk cluster-level preconditions — namespaces,
//! configmaps, priority classes and virtual nodes — via four concurrent
//! workers joined under a shared deadline, then sequentially restarts a
//! set of deployments (spec §4.4). Grounded on `newConfigureTask`
//! (`pkg/engine/configure_task.go`) for the virtual-node helm shellout,
//! generalized to the richer four-worker variant the workflow language
//! calls for.

use super::{task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fleetbench_config::{parse_duration, Task as TaskCfg};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use k8s_openapi::api::scheduling::v1::PriorityClass;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Op {
    Create,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
struct NamespaceOp {
    name: String,
    op: Op,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigmapOp {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    op: Op,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PriorityClassOp {
    name: String,
    op: Op,
    #[serde(default)]
    value: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VirtualNode {
    #[serde(rename = "type")]
    node_type: String,
    count: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct DeploymentRestart {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    selector: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct Params {
    timeout: String,
    #[serde(default)]
    namespaces: Vec<NamespaceOp>,
    #[serde(default)]
    configmaps: Vec<ConfigmapOp>,
    #[serde(default, rename = "priorityClasses")]
    priority_classes: Vec<PriorityClassOp>,
    #[serde(default)]
    nodes: Vec<VirtualNode>,
    #[serde(default)]
    deployments: Vec<DeploymentRestart>,
}

pub struct ConfigureTask {
    id: String,
    timeout: Duration,
    namespaces: Vec<NamespaceOp>,
    configmaps: Vec<ConfigmapOp>,
    priority_classes: Vec<PriorityClassOp>,
    nodes: Vec<VirtualNode>,
    deployments: Vec<DeploymentRestart>,
}

impl ConfigureTask {
    pub fn new(cfg: &TaskCfg) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;
        if params.timeout.is_empty() {
            return Err(Error::Validation(cfg.id.clone(), "missing parameter 'timeout'".into()));
        }
        let timeout = parse_duration(&params.timeout)
            .map_err(|e| Error::Validation(cfg.id.clone(), e))?;

        for d in &params.deployments {
            match (&d.name, &d.selector) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(Error::Validation(
                        cfg.id.clone(),
                        "each deployment entry requires exactly one of 'name' or 'selector'".into(),
                    ))
                }
            }
        }
        for p in &params.priority_classes {
            if p.op == Op::Create && p.value.is_none() {
                return Err(Error::Validation(
                    cfg.id.clone(),
                    format!("priority class {}: 'value' is required for create", p.name),
                ));
            }
        }

        Ok(Self {
            id: cfg.id.clone(),
            timeout,
            namespaces: params.namespaces,
            configmaps: params.configmaps,
            priority_classes: params.priority_classes,
            nodes: params.nodes,
            deployments: params.deployments,
        })
    }

    async fn run_namespaces(&self, ctx: &Context) -> Result<()> {
        let api: Api<Namespace> = Api::all(ctx.client.clone());
        for entry in &self.namespaces {
            match entry.op {
                Op::Create => {
                    if api.get_opt(&entry.name).await?.is_none() {
                        let ns = Namespace {
                            metadata: kube::api::ObjectMeta {
                                name: Some(entry.name.clone()),
                                ..Default::default()
                            },
                            ..Default::default()
                        };
                        api.create(&PostParams::default(), &ns).await?;
                    }
                }
                Op::Delete => {
                    api.delete(&entry.name, &DeleteParams::default()).await?;
                }
            }
        }
        Ok(())
    }

    async fn run_configmaps(&self, ctx: &Context) -> Result<()> {
        for entry in &self.configmaps {
            let namespace = entry.namespace.as_deref().unwrap_or(&ctx.default_namespace);
            let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), namespace);
            match entry.op {
                Op::Create => {
                    let cm = ConfigMap {
                        metadata: kube::api::ObjectMeta {
                            name: Some(entry.name.clone()),
                            namespace: Some(namespace.to_string()),
                            ..Default::default()
                        },
                        data: Some(entry.data.clone()),
                        ..Default::default()
                    };
                    if api.get_opt(&entry.name).await?.is_some() {
                        api.replace(&entry.name, &PostParams::default(), &cm).await?;
                    } else {
                        api.create(&PostParams::default(), &cm).await?;
                    }
                }
                Op::Delete => {
                    if let Err(kube::Error::Api(e)) = api.delete(&entry.name, &DeleteParams::default()).await {
                        if e.code != 404 {
                            return Err(kube::Error::Api(e).into());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_priority_classes(&self, ctx: &Context) -> Result<()> {
        let api: Api<PriorityClass> = Api::all(ctx.client.clone());
        for entry in &self.priority_classes {
            match entry.op {
                Op::Create => {
                    let value = entry.value.unwrap_or(0);
                    let existing = api.get_opt(&entry.name).await?;
                    let needs_write = existing.as_ref().map(|pc| pc.value != value).unwrap_or(true);
                    if needs_write {
                        let pc = PriorityClass {
                            metadata: kube::api::ObjectMeta {
                                name: Some(entry.name.clone()),
                                ..Default::default()
                            },
                            value,
                            ..Default::default()
                        };
                        if existing.is_some() {
                            api.replace(&entry.name, &PostParams::default(), &pc).await?;
                        } else {
                            api.create(&PostParams::default(), &pc).await?;
                        }
                    }
                }
                Op::Delete => {
                    api.delete(&entry.name, &DeleteParams::default()).await?;
                }
            }
        }
        Ok(())
    }

    async fn run_virtual_nodes(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let node_json = serde_json::to_string(&self.nodes)?;
        let node_expr = format!("nodes={node_json}");

        run_command(
            "helm",
            &[
                "repo",
                "add",
                "--force-update",
                "knavigator",
                "https://nvidia.github.io/knavigator/helm-charts",
            ],
        )
        .await?;

        run_command(
            "helm",
            &[
                "upgrade",
                "--install",
                "virtual-nodes",
                "knavigator/virtual-nodes",
                "--wait",
                "--set-json",
                &node_expr,
            ],
        )
        .await
    }

    async fn restart_deployments(&self, ctx: &Context) -> Result<()> {
        for entry in &self.deployments {
            let namespace = entry.namespace.as_deref().unwrap_or(&ctx.default_namespace);
            let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), namespace);

            let names: Vec<String> = if let Some(name) = &entry.name {
                vec![name.clone()]
            } else {
                let selector = entry.selector.clone().unwrap_or_default();
                let label_selector = selector
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(",");
                let lp = kube::api::ListParams::default().labels(&label_selector);
                api.list(&lp)
                    .await?
                    .items
                    .into_iter()
                    .filter_map(|d| d.metadata.name)
                    .collect()
            };

            for name in names {
                let patch = json!({
                    "spec": {
                        "template": {
                            "metadata": {
                                "annotations": {
                                    "kubectl.kubernetes.io/restartedAt": chrono::Utc::now().to_rfc3339(),
                                }
                            }
                        }
                    }
                });
                api.patch(&name, &PatchParams::default(), &Patch::Strategic(&patch))
                    .await?;

                loop {
                    let deployment = api.get(&name).await?;
                    let unavailable = deployment
                        .status
                        .as_ref()
                        .and_then(|s| s.unavailable_replicas)
                        .unwrap_or(0);
                    if unavailable == 0 {
                        break;
                    }
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
        Ok(())
    }
}

async fn run_command(exe: &str, args: &[&str]) -> Result<()> {
    let output = tokio::process::Command::new(exe)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Other(anyhow::anyhow!("failed to run {exe}: {e}")))?;

    if !output.status.success() {
        return Err(Error::Other(anyhow::anyhow!(
            "{exe} {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    tracing::debug!(exe, ?args, stdout = %String::from_utf8_lossy(&output.stdout), "ran command");
    Ok(())
}

#[async_trait]
impl Runnable for ConfigureTask {
    fn id(&self) -> String {
        task_label("Configure", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let work = async {
            let (ns, cm, pc, vn) = tokio::join!(
                self.run_namespaces(ctx),
                self.run_configmaps(ctx),
                self.run_priority_classes(ctx),
                self.run_virtual_nodes(),
            );

            let mut last_err = None;
            for result in [ns, cm, pc, vn] {
                if let Err(e) = result {
                    last_err = Some(e);
                }
            }
            if let Some(e) = last_err {
                return Err(e);
            }

            self.restart_deployments(ctx).await
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(Error::DeadlineExceeded(self.id.clone(), vec!["configure did not complete in time".into()])),
        }
    }
}
