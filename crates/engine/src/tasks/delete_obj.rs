//! `DeleteObj`: deletes every name in a referenced instance record with
//! background propagation (spec §4.8). Does not remove the registry
//! entry — cleanup remains authoritative. Grounded on `newDeleteObjTask`
//! (`pkg/engine/delete_object_task.go`).

use super::{submit_obj::dynamic_api, task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fleetbench_config::Task;
use kube::api::{DeleteParams, PropagationPolicy};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Params {
    #[serde(rename = "refTaskId")]
    ref_task_id: String,
}

pub struct DeleteObjTask {
    id: String,
    ref_task_id: String,
}

impl DeleteObjTask {
    pub fn new(cfg: &Task, ctx: &Context) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;
        if !ctx.registry.has_info(&params.ref_task_id) {
            return Err(Error::UnreferencedTaskId(cfg.id.clone(), params.ref_task_id));
        }
        Ok(Self {
            id: cfg.id.clone(),
            ref_task_id: params.ref_task_id,
        })
    }
}

#[async_trait]
impl Runnable for DeleteObjTask {
    fn id(&self) -> String {
        task_label("DeleteObj", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let info = ctx.registry.get_info(&self.ref_task_id)?;
        let delete_params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };

        for gvr in &info.gvr {
            let api = dynamic_api(ctx, gvr, &info.namespace);
            for name in &info.names {
                api.delete(name, &delete_params).await?;
            }
        }
        Ok(())
    }
}
