//! Shared execution context threaded into every task, following
//! `controller::tasks::types::Context`'s shape (client + namespace +
//! shared config) generalized with the registry and deferrer this engine
//! adds.

use crate::deferrer::{Deferrer, TaskExecutor};
use crate::registry::Registry;
use fleetbench_config::CleanupConfig;
use kube::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct Context {
    pub client: Client,
    pub default_namespace: String,
    pub registry: Arc<Registry>,
    pub cleanup: CleanupConfig,
}

impl Context {
    pub fn new(client: Client, default_namespace: impl Into<String>, cleanup: CleanupConfig) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
            registry: Arc::new(Registry::new()),
            cleanup,
        }
    }
}

/// Adapter letting the deferrer call back into the engine without a
/// circular module dependency.
pub struct EngineExecutor {
    pub engine: std::sync::Weak<crate::engine::Eng>,
}

#[async_trait::async_trait]
impl TaskExecutor for EngineExecutor {
    async fn run_task(&self, task: &fleetbench_config::Task) -> crate::error::Result<()> {
        let engine = self
            .engine
            .upgrade()
            .ok_or_else(|| crate::error::Error::Validation("deferrer".into(), "engine dropped".into()))?;
        engine.run_task(task).await
    }
}

pub type SharedDeferrer = Arc<Deferrer<EngineExecutor>>;
