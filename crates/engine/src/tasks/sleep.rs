//! `Sleep`: pauses the workflow for a fixed duration. Grounded on
//! `newSleepTask` (`pkg/engine/sleep_task.go`).

use super::{task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fleetbench_config::{parse_duration, Task};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Params {
    duration: String,
}

pub struct SleepTask {
    id: String,
    duration: Duration,
}

impl SleepTask {
    pub fn new(cfg: &Task) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;
        let duration = parse_duration(&params.duration)
            .map_err(|e| Error::Validation(cfg.id.clone(), e))?;
        Ok(Self {
            id: cfg.id.clone(),
            duration,
        })
    }
}

#[async_trait]
impl Runnable for SleepTask {
    fn id(&self) -> String {
        task_label("Sleep", &self.id)
    }

    async fn exec(&self, _ctx: &Context) -> Result<()> {
        tracing::info!(task_id = %self.id, duration = ?self.duration, "sleeping");
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}
