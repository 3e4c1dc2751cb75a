//! Delay queue that executes deferred units after a wall-clock delay, with
//! a join barrier callers can block on. Grounded on `Deferrer`
//! (`pkg/engine/deferrer.go`): a `workqueue.DelayingInterface` plus a
//! `sync.WaitGroup` become a `tokio::sync::Mutex<BinaryHeap>` drained by a
//! single worker, plus an atomic counter signaled by a `Notify`.

use async_trait::async_trait;
use fleetbench_config::Task;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

/// Anything capable of running a single constructed task. Implemented by
/// the engine; kept as a trait so the deferrer can be unit-tested against
/// a fake.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn run_task(&self, task: &Task) -> crate::error::Result<()>;
}

#[derive(Debug, Clone)]
enum Unit {
    /// Wait for `refTaskId`'s pods to reach Running, then schedule its
    /// deletion 5 seconds later.
    WaitForPods(String),
    Task(Task),
}

struct DelayedUnit {
    due: Instant,
    unit: Unit,
}

impl PartialEq for DelayedUnit {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due
    }
}
impl Eq for DelayedUnit {}
impl PartialOrd for DelayedUnit {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for DelayedUnit {
    // Reversed so `BinaryHeap` (a max-heap) pops the earliest due time first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.due.cmp(&self.due)
    }
}

pub struct Deferrer<E: TaskExecutor + 'static> {
    executor: Arc<E>,
    queue: Mutex<BinaryHeap<DelayedUnit>>,
    wake: Notify,
    outstanding: AtomicI64,
    idle: Notify,
    stopped: AtomicBool,
}

impl<E: TaskExecutor + 'static> Deferrer<E> {
    pub fn new(executor: Arc<E>) -> Arc<Self> {
        Arc::new(Self {
            executor,
            queue: Mutex::new(BinaryHeap::new()),
            wake: Notify::new(),
            outstanding: AtomicI64::new(0),
            idle: Notify::new(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Schedules a "wait for `task_id`'s pods, then delete" unit. Adds one
    /// to the outstanding counter, matching `wg.Add(1)` in the original —
    /// released only once the resulting delete task has run (or the wait
    /// itself failed).
    pub async fn schedule_termination(&self, task_id: &str) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.push(Unit::WaitForPods(task_id.to_string()), Instant::now())
            .await;
    }

    async fn push(&self, unit: Unit, due: Instant) {
        let mut queue = self.queue.lock().await;
        queue.push(DelayedUnit { due, unit });
        self.wake.notify_one();
    }

    /// Spawns the single worker that drains the queue in delay order.
    pub fn start(self: &Arc<Self>, ctx: tokio_util_context::Handle) {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(ctx).await });
    }

    async fn run(self: Arc<Self>, ctx: tokio_util_context::Handle) {
        loop {
            if ctx.is_cancelled() {
                break;
            }
            let next_due = {
                let queue = self.queue.lock().await;
                queue.peek().map(|u| u.due)
            };

            match next_due {
                None => {
                    if self.stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    self.wake.notified().await;
                }
                Some(due) => {
                    let now = Instant::now();
                    if due > now {
                        tokio::select! {
                            _ = tokio::time::sleep(due - now) => {}
                            _ = self.wake.notified() => {}
                        }
                        continue;
                    }
                    let item = {
                        let mut queue = self.queue.lock().await;
                        queue.pop()
                    };
                    if let Some(item) = item {
                        self.process(item.unit).await;
                    }
                }
            }
        }
    }

    async fn process(self: &Arc<Self>, unit: Unit) {
        match unit {
            Unit::WaitForPods(task_id) => {
                tracing::info!(task_id = %task_id, "deferrer waiting for pods");
                let wait_task = Task {
                    id: "status".to_string(),
                    task_type: "CheckPod".to_string(),
                    description: String::new(),
                    params: serde_json::json!({
                        "refTaskId": task_id,
                        "status": "Running",
                        "timeout": "24h",
                    }),
                };
                match self.executor.run_task(&wait_task).await {
                    Ok(()) => {
                        self.push(
                            Unit::Task(Task {
                                id: "delete".to_string(),
                                task_type: "DeleteObj".to_string(),
                                description: String::new(),
                                params: serde_json::json!({"refTaskId": task_id}),
                            }),
                            Instant::now() + Duration::from_secs(5),
                        )
                        .await;
                    }
                    Err(err) => {
                        tracing::error!(task_id = %task_id, error = %err, "failed to watch pods");
                        self.complete_one();
                    }
                }
            }
            Unit::Task(task) => {
                if let Err(err) = self.executor.run_task(&task).await {
                    tracing::error!(task_type = %task.task_type, id = %task.id, error = %err, "deferred task failed");
                }
                self.complete_one();
            }
        }
    }

    fn complete_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) - 1 == 0 {
            self.idle.notify_waiters();
        }
    }

    /// Blocks until the outstanding counter reaches zero or `timeout`
    /// elapses, then shuts the queue down.
    pub async fn wait(&self, timeout: Duration) -> crate::error::Result<()> {
        tracing::info!("waiting for deferrer to complete task");
        let outcome = tokio::time::timeout(timeout, async {
            loop {
                // Register for notification before checking the counter: a
                // `Notified` future observes any `notify_waiters()` call made
                // after it was created, even if that happens before this
                // `.await`. Checking the counter first and awaiting second
                // would let a `complete_one()` that lands in between go
                // unseen until `timeout` expires.
                let notified = self.idle.notified();
                if self.outstanding.load(Ordering::SeqCst) == 0 {
                    break;
                }
                notified.await;
            }
        })
        .await;

        self.stopped.store(true, Ordering::SeqCst);
        self.wake.notify_one();

        match outcome {
            Ok(()) => {
                tracing::info!("deferrer stopped");
                Ok(())
            }
            Err(_) => Err(crate::error::Error::DeadlineExceeded(
                "deferrer".to_string(),
                vec![],
            )),
        }
    }
}

/// A minimal cooperative cancellation handle, standing in for the
/// engine-derived context the original threads through every blocking
/// call. Kept separate from `tokio_util::sync::CancellationToken` so the
/// deferrer has no hard dependency on `tokio-util`.
pub mod tokio_util_context {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct Handle(Arc<AtomicBool>);

    impl Handle {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cancel(&self) {
            self.0.store(true, Ordering::SeqCst);
        }

        pub fn is_cancelled(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingExecutor {
        ran: AtomicUsize,
    }

    #[async_trait]
    impl TaskExecutor for CountingExecutor {
        async fn run_task(&self, _task: &Task) -> crate::error::Result<()> {
            self.ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn runs_immediate_task_and_joins() {
        let executor = Arc::new(CountingExecutor {
            ran: AtomicUsize::new(0),
        });
        let deferrer = Deferrer::new(Arc::clone(&executor));
        deferrer.start(tokio_util_context::Handle::new());

        deferrer
            .push(
                Unit::Task(Task {
                    id: "t1".into(),
                    task_type: "Sleep".into(),
                    description: String::new(),
                    params: serde_json::json!({}),
                }),
                Instant::now(),
            )
            .await;
        deferrer.outstanding.fetch_add(1, Ordering::SeqCst);

        deferrer.wait(Duration::from_secs(2)).await.unwrap();
        assert_eq!(executor.ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_times_out_when_nothing_completes() {
        let executor = Arc::new(CountingExecutor {
            ran: AtomicUsize::new(0),
        });
        let deferrer = Deferrer::new(executor);
        deferrer.outstanding.fetch_add(1, Ordering::SeqCst);
        let result = deferrer.wait(Duration::from_millis(50)).await;
        assert!(result.is_err());
    }
}
