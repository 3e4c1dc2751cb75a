//! `Pause`: blocks the workflow until the operator presses Enter,
//! printing an optional message directly to stdout (the one place this
//! engine talks to the terminal instead of `tracing`, matching the
//! original's direct stdin/stdout interaction). Grounded on `newPauseTask`
//! (`pkg/engine/pause_task.go`).

use super::{task_label, Runnable};
use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use fleetbench_config::Task;
use tokio::io::{AsyncBufReadExt, BufReader};

pub struct PauseTask {
    id: String,
    message: String,
}

impl PauseTask {
    pub fn new(cfg: &Task) -> Self {
        let message = cfg
            .params
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("press Enter to continue...")
            .to_string();
        Self {
            id: cfg.id.clone(),
            message,
        }
    }
}

#[async_trait]
impl Runnable for PauseTask {
    fn id(&self) -> String {
        task_label("Pause", &self.id)
    }

    async fn exec(&self, _ctx: &Context) -> Result<()> {
        println!("{}", self.message);
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        reader.read_line(&mut line).await.ok();
        Ok(())
    }
}
