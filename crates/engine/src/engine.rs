//! The orchestrator: builds each task lazily at the execution boundary,
//! runs the workflow's tasks in program order, and performs a deadline-
//! bounded cleanup pass regardless of outcome (spec §4.14). Grounded on
//! `Eng`/`Run`/`RunTask`/`Reset`/`DeleteAllObjects` (`pkg/engine/engine.go`).

use crate::context::{Context, EngineExecutor, SharedDeferrer};
use crate::deferrer::Deferrer;
use crate::error::Result;
use crate::metrics::{RunReport, TaskOutcome};
use crate::tasks;
use fleetbench_config::{CleanupConfig, Task, Workflow};
use kube::api::{Api, DeleteParams, DynamicObject, PropagationPolicy};
use kube::Client;
use std::sync::Arc;
use std::time::Instant;

/// Owns the shared [`Context`] and the deferrer that tasks may schedule
/// delayed cleanup units onto. One instance per workflow run.
pub struct Eng {
    ctx: Context,
    deferrer: std::sync::OnceLock<SharedDeferrer>,
}

impl Eng {
    /// Constructs an engine over `client`, wiring its own deferrer back to
    /// itself via a weak reference so the deferrer can invoke `CheckPod`
    /// and `DeleteObj` without an ownership cycle.
    pub fn new(client: Client, default_namespace: impl Into<String>, cleanup: CleanupConfig) -> Arc<Self> {
        let ctx = Context::new(client, default_namespace, cleanup);
        let eng = Arc::new(Self {
            ctx,
            deferrer: std::sync::OnceLock::new(),
        });

        let executor = Arc::new(EngineExecutor {
            engine: Arc::downgrade(&eng),
        });
        let deferrer = Deferrer::new(executor);
        deferrer.start(crate::deferrer::tokio_util_context::Handle::new());
        let _ = eng.deferrer.set(deferrer);

        eng
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn deferrer(&self) -> &SharedDeferrer {
        self.deferrer.get().expect("deferrer initialized in new()")
    }

    /// Builds and executes a single task against the engine's context.
    /// Construction performs every reference-integrity check; execution
    /// then runs the cluster operation.
    pub async fn run_task(&self, cfg: &Task) -> Result<()> {
        let runnable = tasks::build(cfg, &self.ctx).await?;
        let id = runnable.id();
        let start = Instant::now();
        tracing::info!(task = %id, "starting task");

        let result = runnable.exec(&self.ctx).await;
        let duration = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(task = %id, duration = ?duration, "task completed"),
            Err(err) => tracing::error!(task = %id, duration = ?duration, error = %err, "task failed"),
        }
        result
    }

    /// Re-initializes the engine for the next run: waits for the deferrer
    /// to drain, then deletes every recorded object if cleanup is enabled.
    /// No-op (beyond a log line) when cleanup is disabled.
    pub async fn reset(&self) -> Result<()> {
        tracing::info!("reset engine");

        if !self.ctx.cleanup.enabled {
            return Ok(());
        }

        tracing::info!("cleaning up objects");
        match tokio::time::timeout(self.ctx.cleanup.timeout, self.delete_all_objects()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(crate::error::Error::DeadlineExceeded(
                "cleanup".to_string(),
                vec![],
            )),
        }
    }

    async fn delete_all_objects(&self) {
        let delete_params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };

        for info in self.ctx.registry.all_info() {
            for gvr in &info.gvr {
                let ar = kube::api::ApiResource {
                    group: gvr.group.clone(),
                    version: gvr.version.clone(),
                    api_version: gvr.api_version(),
                    kind: String::new(),
                    plural: gvr.resource.clone(),
                };
                let api: Api<DynamicObject> =
                    Api::namespaced_with(self.ctx.client.clone(), &info.namespace, &ar);
                for name in &info.names {
                    if let Err(err) = api.delete(name, &delete_params).await {
                        tracing::warn!(name, error = %err, "cannot delete object");
                    }
                }
            }
        }

        tracing::info!("deleted all objects");
    }
}

/// Runs every task in `workflow` sequentially, short-circuiting on the
/// first failure; regardless of outcome, runs the deadline-bounded
/// cleanup pass. The combined error surface is the execution error if
/// any, else the cleanup error.
pub async fn run(eng: &Arc<Eng>, workflow: &Workflow) -> Result<RunReport> {
    let mut report = RunReport::default();
    let mut exec_err = None;

    for cfg in &workflow.tasks {
        let start = Instant::now();
        let result = eng.run_task(cfg).await;
        let succeeded = result.is_ok();
        let error = result.as_ref().err().map(|e| e.to_string());

        report.record(TaskOutcome {
            task_id: cfg.id.clone(),
            task_type: cfg.task_type.clone(),
            succeeded,
            duration: start.elapsed(),
            error,
        });

        if let Err(err) = result {
            exec_err = Some(err);
            break;
        }
    }

    let reset_err = eng.reset().await;

    if let Some(err) = exec_err {
        return Err(err);
    }
    reset_err.map(|_| report)
}
