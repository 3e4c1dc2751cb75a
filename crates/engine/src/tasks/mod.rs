//! One module per task kind, each owning a `*Params` struct projected from
//! the workflow's free-form `params` via `serde_json::from_value`, plus a
//! constructor that validates eagerly (including registry references) and
//! an `exec` that performs the cluster operation.

pub mod check_configmap;
pub mod check_obj;
pub mod check_pod;
pub mod configure;
pub mod delete_obj;
pub mod pause;
pub mod register;
pub mod sleep;
pub mod submit_obj;
pub mod update_nodes;
pub mod update_obj;

use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fleetbench_config::Task;

/// A constructed, ready-to-run task. Mirrors `Runnable` (`pkg/engine/types.go`):
/// `ID()` for logging, `Exec(ctx)` for the cluster operation.
#[async_trait]
pub trait Runnable: Send + Sync {
    fn id(&self) -> String;
    async fn exec(&self, ctx: &Context) -> Result<()>;
}

/// Builds a runnable task from its workflow config, performing every
/// reference-integrity and cross-field validation up front (spec §3
/// invariant 1, §4.2).
pub async fn build(cfg: &Task, ctx: &Context) -> Result<Box<dyn Runnable>> {
    tracing::info!(task_type = %cfg.task_type, task_id = %cfg.id, "constructing task");
    match cfg.task_type.as_str() {
        "Register" => Ok(Box::new(register::RegisterObjTask::new(cfg)?)),
        "Configure" => Ok(Box::new(configure::ConfigureTask::new(cfg)?)),
        "SubmitObj" => Ok(Box::new(submit_obj::SubmitObjTask::new(cfg, ctx)?)),
        "UpdateObj" => Ok(Box::new(update_obj::UpdateObjTask::new(cfg, ctx)?)),
        "CheckObj" => Ok(Box::new(check_obj::CheckObjTask::new(cfg, ctx)?)),
        "DeleteObj" => Ok(Box::new(delete_obj::DeleteObjTask::new(cfg, ctx)?)),
        "UpdateNodes" => Ok(Box::new(update_nodes::UpdateNodesTask::new(cfg)?)),
        "CheckPod" => Ok(Box::new(check_pod::CheckPodTask::new(cfg, ctx)?)),
        "CheckConfigmap" => Ok(Box::new(check_configmap::CheckConfigmapTask::new(cfg)?)),
        "Sleep" => Ok(Box::new(sleep::SleepTask::new(cfg)?)),
        "Pause" => Ok(Box::new(pause::PauseTask::new(cfg))),
        other => Err(Error::UnsupportedTaskType(cfg.id.clone(), other.to_string())),
    }
}

pub(crate) fn task_label(task_type: &str, id: &str) -> String {
    format!("{task_type}/{id}")
}
