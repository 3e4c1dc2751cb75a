//! `UpdateObj`: patches every object in a referenced instance record with
//! a root merge-patch and, if present, a status merge-patch (spec §4.6).
//! Grounded on `newUpdateObjTask` (`pkg/engine/update_object_task.go`).

use super::{task_label, submit_obj::dynamic_api, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::patch::PatchData;
use async_trait::async_trait;
use fleetbench_config::Task;
use kube::api::{Patch, PatchParams};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Params {
    #[serde(rename = "refTaskId")]
    ref_task_id: String,
    state: Value,
    #[serde(default)]
    index: usize,
}

pub struct UpdateObjTask {
    id: String,
    ref_task_id: String,
    patch: PatchData,
    index: usize,
}

impl UpdateObjTask {
    pub fn new(cfg: &Task, ctx: &Context) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;

        if !ctx.registry.has_info(&params.ref_task_id) {
            return Err(Error::UnreferencedTaskId(cfg.id.clone(), params.ref_task_id));
        }

        Ok(Self {
            id: cfg.id.clone(),
            patch: PatchData::new(&params.state),
            index: params.index,
            ref_task_id: params.ref_task_id,
        })
    }
}

#[async_trait]
impl Runnable for UpdateObjTask {
    fn id(&self) -> String {
        task_label("UpdateObj", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let info = ctx.registry.get_info(&self.ref_task_id)?;
        let gvr = info
            .gvr
            .get(self.index)
            .ok_or_else(|| Error::Validation(self.id.clone(), format!("no GVR at index {}", self.index)))?;
        let api = dynamic_api(ctx, gvr, &info.namespace);
        let params = PatchParams::default();

        for name in &info.names {
            if let Some(root) = &self.patch.root {
                api.patch(name, &params, &Patch::Merge(root)).await?;
            }
            if let Some(status) = &self.patch.status {
                api.patch_status(name, &params, &Patch::Merge(status)).await?;
            }
        }
        Ok(())
    }
}
