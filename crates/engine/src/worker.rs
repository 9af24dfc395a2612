use crate::channel::TaskSource;
use crate::decision::ScanContext;
use derive_more::Display;
use std::sync::Arc;

/// How a worker left its loop.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum WorkerExit {
    /// Found the queue empty after a graceful shutdown was requested.
    #[display("drained")]
    Drained,
    /// Saw the run flag cleared.
    #[display("halted")]
    Halted,
    /// Hit a task-fatal error.
    #[display("faulted")]
    Faulted,
    /// Panicked; reported by the supervisor, never returned by a worker.
    #[display("panicked")]
    Panicked,
}

pub(crate) struct ScanWorker {
    pub(crate) id: usize,
    pub(crate) source: Arc<dyn TaskSource>,
    pub(crate) context: Arc<ScanContext>,
}

impl ScanWorker {
    pub(crate) async fn run(self) -> WorkerExit {
        let state = &self.context.state;
        let interval = self.context.options.poll_interval;
        tracing::debug!(worker = self.id, "Worker started");
        while state.is_running() {
            let Some(task) = self.source.pop(interval).await else {
                if state.stop_on_empty() {
                    tracing::debug!(worker = self.id, "Queue empty, worker exiting");
                    return WorkerExit::Drained;
                }
                continue;
            };
            if let Err(err) = self.context.process(&task).await {
                if err.is_task_fatal() {
                    tracing::error!(
                        worker = self.id,
                        path = %task.base_path.display(),
                        error = ?err,
                        "Task failed, stopping worker",
                    );
                    return WorkerExit::Faulted;
                }
                tracing::warn!(path = %task.base_path.display(), error = ?err, "Task failed");
            }
        }
        tracing::debug!(worker = self.id, "Run halted, worker exiting");
        WorkerExit::Halted
    }
}
