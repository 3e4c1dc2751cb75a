//! `CheckObj`: asserts that a structural state fragment is a subset of
//! every object in a referenced instance record, either as a single
//! synchronous pass or, with a timeout, racing that pass against an
//! informer stream (spec §4.7). Grounded on `newCheckObjTask`
//! (`pkg/engine/check_object_task.go`).

use super::{submit_obj::dynamic_api, task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::subset::is_subset;
use crate::watch::watch_until_satisfied;
use async_trait::async_trait;
use fleetbench_config::{parse_duration, Task};
use kube::api::ListParams;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Params {
    #[serde(rename = "refTaskId")]
    ref_task_id: String,
    state: Value,
    #[serde(default)]
    timeout: Option<String>,
    #[serde(default)]
    index: usize,
}

pub struct CheckObjTask {
    id: String,
    ref_task_id: String,
    state: Value,
    timeout: Option<Duration>,
    index: usize,
}

impl CheckObjTask {
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
            state: params.state,
            timeout,
            index: params.index,
        })
    }
}

#[async_trait]
impl Runnable for CheckObjTask {
    fn id(&self) -> String {
        task_label("CheckObj", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let info = ctx.registry.get_info(&self.ref_task_id)?;
        let gvr = info
            .gvr
            .get(self.index)
            .ok_or_else(|| Error::Validation(self.id.clone(), format!("no GVR at index {}", self.index)))?;
        let api = dynamic_api(ctx, gvr, &info.namespace);

        let outstanding: HashSet<String> = info.names.iter().cloned().collect();
        let state = self.state.clone();

        watch_until_satisfied(&api, ListParams::default(), self.timeout, outstanding, {
            let state = state.clone();
            move |obj, outstanding| {
                let Some(name) = obj.metadata.name.as_deref() else {
                    return;
                };
                if !outstanding.contains(name) {
                    return;
                }
                // DynamicObject splits types/metadata/data apart; the original
                // compares against the whole unstructured object, so rebuild it
                // here rather than matching against `data` alone.
                let Ok(full) = serde_json::to_value(obj) else {
                    return;
                };
                if is_subset(&full, &state) {
                    outstanding.remove(name);
                }
            }
        })
        .await
        .map_err(|e| rename_subject(e, &self.id))
    }
}

fn rename_subject(err: Error, task_id: &str) -> Error {
    match err {
        Error::Assertion(_, msg) => Error::Assertion(task_id.to_string(), msg),
        Error::DeadlineExceeded(_, outstanding) => Error::DeadlineExceeded(task_id.to_string(), outstanding),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::DynamicObject;
    use serde_json::json;

    #[test]
    fn subset_check_sees_metadata_and_type_header() {
        let obj: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {"name": "job1", "labels": {"role": "worker"}},
            "spec": {"replicas": 2},
        }))
        .unwrap();

        let full = serde_json::to_value(&obj).unwrap();

        // A fragment referencing metadata/apiVersion/kind must match, even
        // though none of those live under `DynamicObject::data`.
        assert!(is_subset(
            &full,
            &json!({"metadata": {"labels": {"role": "worker"}}})
        ));
        assert!(is_subset(&full, &json!({"apiVersion": "batch/v1", "kind": "Job"})));
        assert!(is_subset(&full, &json!({"spec": {"replicas": 2}})));
        assert!(!is_subset(&full, &json!({"metadata": {"labels": {"role": "other"}}})));
    }
}
