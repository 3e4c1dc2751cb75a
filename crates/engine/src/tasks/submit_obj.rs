//! `SubmitObj`: instantiates a registered type `count` times, rendering
//! every template document per instance, creating each against its GVR,
//! and publishing the resulting `InstanceInfo` (spec §4.5). Grounded on
//! `newSubmitObjTask` (`pkg/engine/submit_object_task.go`).

use super::{task_label, Runnable};
use crate::arith::eval as eval_arith;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::naming::generate_names;
use crate::template::render_object;
use crate::types::{Gvr, InstanceInfo, RegisteredType};
use async_trait::async_trait;
use fleetbench_config::Task;
use kube::api::{Api, ApiResource, DynamicObject, PostParams};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct Params {
    #[serde(rename = "refTaskId")]
    ref_task_id: String,
    #[serde(default = "default_count")]
    count: usize,
    #[serde(default, rename = "canExist")]
    can_exist: bool,
    #[serde(default)]
    params: Value,
}

fn default_count() -> usize {
    1
}

struct Instance {
    name: String,
    namespace: String,
    docs: Vec<Value>,
}

pub struct SubmitObjTask {
    id: String,
    ref_task_id: String,
    can_exist: bool,
    registered: RegisteredType,
    instances: Vec<Instance>,
    expected_pod_count: usize,
    pod_name_regexes: Vec<String>,
}

impl SubmitObjTask {
    pub fn new(cfg: &Task, ctx: &Context) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;

        if params.count == 0 {
            return Err(Error::Validation(cfg.id.clone(), "'count' must be a positive number".into()));
        }

        let registered = ctx
            .registry
            .get_type(&params.ref_task_id)
            .map_err(|_| Error::UnreferencedTaskId(cfg.id.clone(), params.ref_task_id.clone()))?;

        if params.count > 1 && registered.name_format.is_empty() {
            return Err(Error::Validation(
                cfg.id.clone(),
                "must specify name format for multiple object submissions".into(),
            ));
        }

        let mut overrides = if params.params.is_object() {
            params.params.clone()
        } else {
            json!({})
        };

        let names = generate_names(&registered.name_format, params.count, &mut overrides)?;

        let mut instances = Vec::with_capacity(params.count);
        let mut pod_name_regexes = Vec::with_capacity(params.count);

        for name in &names {
            if let Value::Object(map) = &mut overrides {
                map.insert("_NAME_".to_string(), Value::from(name.clone()));
            }

            let mut docs = Vec::with_capacity(registered.documents.len());
            let mut namespace = ctx.default_namespace.clone();
            for doc in &registered.documents {
                let obj = render_object(&doc.source, &overrides)?;
                if let Some(ns) = &obj.metadata.namespace {
                    namespace = ns.clone();
                }
                docs.push(json!({
                    "apiVersion": obj.api_version,
                    "kind": obj.kind,
                    "metadata": obj.metadata,
                    "spec": obj.spec,
                }));
            }

            if let Some(pod_name_format) = &registered.pod_name_format {
                let rendered = crate::template::render_raw(pod_name_format, &overrides)?;
                pod_name_regexes.push(rendered);
            }

            instances.push(Instance {
                name: name.clone(),
                namespace,
                docs,
            });
        }

        let expected_pod_count = match &registered.pod_count_expr {
            Some(expr) => {
                let rendered = crate::template::render_raw(expr, &overrides)?;
                eval_arith(rendered.trim())? as usize * params.count
            }
            None => 0,
        };

        Ok(Self {
            id: cfg.id.clone(),
            ref_task_id: params.ref_task_id,
            can_exist: params.can_exist,
            registered,
            instances,
            expected_pod_count,
            pod_name_regexes,
        })
    }
}

#[async_trait]
impl Runnable for SubmitObjTask {
    fn id(&self) -> String {
        task_label("SubmitObj", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        for instance in &self.instances {
            for (doc, gvr) in instance.docs.iter().zip(self.registered.gvr.iter()) {
                let api = dynamic_api(ctx, gvr, &instance.namespace);
                let obj: DynamicObject = serde_json::from_value(doc.clone())?;

                match api.create(&PostParams::default(), &obj).await {
                    Ok(_) => {}
                    Err(kube::Error::Api(err)) if err.code == 409 && self.can_exist => {
                        tracing::info!(
                            task_id = %self.id,
                            name = %instance.name,
                            "object already exists, canExist short-circuits submission"
                        );
                        return Ok(());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        let names: Vec<String> = self.instances.iter().map(|i| i.name.clone()).collect();
        let namespace = self
            .instances
            .first()
            .map(|i| i.namespace.clone())
            .unwrap_or_else(|| ctx.default_namespace.clone());

        ctx.registry.set_info(
            &self.id,
            InstanceInfo {
                names,
                namespace,
                gvr: self.registered.gvr.clone(),
                expected_pod_count: self.expected_pod_count,
                pod_name_regexes: self.pod_name_regexes.clone(),
            },
        )?;

        tracing::debug!(ref_task_id = %self.ref_task_id, "submission complete");
        Ok(())
    }
}

pub(crate) fn dynamic_api(ctx: &Context, gvr: &Gvr, namespace: &str) -> Api<DynamicObject> {
    let ar = ApiResource {
        group: gvr.group.clone(),
        version: gvr.version.clone(),
        api_version: gvr.api_version(),
        kind: String::new(),
        plural: gvr.resource.clone(),
    };
    Api::namespaced_with(ctx.client.clone(), namespace, &ar)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_context() -> Context {
        let config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
        let client = kube::Client::try_from(config).expect("client built without network I/O");
        Context::new(client, "default", fleetbench_config::CleanupConfig::default())
    }

    #[test]
    fn rejects_zero_count() {
        let ctx = fake_context();
        let cfg = Task {
            id: "s1".into(),
            task_type: "SubmitObj".into(),
            description: String::new(),
            params: serde_json::json!({"refTaskId": "r1", "count": 0}),
        };
        assert!(SubmitObjTask::new(&cfg, &ctx).is_err());
    }

    #[test]
    fn rejects_unregistered_ref_task_id() {
        let ctx = fake_context();
        let cfg = Task {
            id: "s1".into(),
            task_type: "SubmitObj".into(),
            description: String::new(),
            params: serde_json::json!({"refTaskId": "missing", "count": 1}),
        };
        assert!(SubmitObjTask::new(&cfg, &ctx).is_err());
    }
}
