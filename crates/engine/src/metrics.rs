//! Run-level outcome reporting. The original ships `pkg/metrics` (counters
//! plus a textual report of task outcomes); the distillation drops it as an
//! external collaborator, but ambient observability is carried regardless
//! (`SPEC_FULL.md` §A.4). Structured counters go through `tracing`, in the
//! same style `controller`'s task modules emit `info!`/`warn!` events;
//! `RunReport` is the in-memory summary rendered at the end of a run,
//! grounded in `pkg/metrics/report.go`'s per-task outcome list.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: String,
    pub task_type: String,
    pub succeeded: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: TaskOutcome) {
        tracing::info!(
            counter.tasks_total = 1,
            counter.tasks_failed = i32::from(!outcome.succeeded),
            task_id = %outcome.task_id,
            task_type = %outcome.task_type,
            duration_ms = outcome.duration.as_millis() as u64,
            "task completed"
        );
        self.outcomes.push(outcome);
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }

    pub fn total_duration(&self) -> Duration {
        self.outcomes.iter().map(|o| o.duration).sum()
    }

    /// Renders a short human-readable summary, one line per task.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.outcomes.len() + 1);
        lines.push(format!(
            "ran {} tasks, {} failed, total {:.2}s",
            self.outcomes.len(),
            self.failed_count(),
            self.total_duration().as_secs_f64()
        ));
        for outcome in &self.outcomes {
            let status = if outcome.succeeded { "ok" } else { "FAILED" };
            let mut line = format!(
                "  {} {}/{} ({:.3}s)",
                status,
                outcome.task_type,
                outcome.task_id,
                outcome.duration.as_secs_f64()
            );
            if let Some(err) = &outcome.error {
                line.push_str(&format!(": {err}"));
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_failures_and_duration() {
        let mut report = RunReport::new();
        report.record(TaskOutcome {
            task_id: "t1".into(),
            task_type: "Sleep".into(),
            succeeded: true,
            duration: Duration::from_millis(100),
            error: None,
        });
        report.record(TaskOutcome {
            task_id: "t2".into(),
            task_type: "CheckObj".into(),
            succeeded: false,
            duration: Duration::from_millis(200),
            error: Some("timeout".into()),
        });
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.total_duration(), Duration::from_millis(300));
        assert!(report.render().contains("FAILED"));
    }
}
