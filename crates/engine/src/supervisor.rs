use crate::channel::{ResultSink, TaskSource};
use crate::decision::ScanContext;
use crate::error::{ErrorKind, Result};
use crate::options::{Collaborators, ScanOptions};
use crate::state::RunState;
use crate::worker::{ScanWorker, WorkerExit};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{Id, JoinSet};
use tracing::{Instrument, info_span, instrument};

/// How every worker of a pool ended, ordered by worker id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub exits: Vec<WorkerExit>,
}

impl PoolReport {
    pub fn count(&self, exit: WorkerExit) -> usize {
        self.exits.iter().filter(|e| **e == exit).count()
    }

    /// Every worker drained the queue.
    pub fn is_clean(&self) -> bool {
        self.exits.iter().all(|e| *e == WorkerExit::Drained)
    }
}

/// Owns a fixed pool of scan workers for one run.
///
/// Must be started from within a Tokio runtime; use the multi-threaded
/// runtime for workers to run in parallel. Both shutdown modes consume the
/// supervisor. Dropping it, including dropping an unfinished
/// [`graceful_shutdown`](Self::graceful_shutdown), halts the run: container
/// scans already handed to the blocking pool stop after their current entry.
pub struct PoolSupervisor {
    state: RunState,
    workers: JoinSet<WorkerExit>,
    ids: HashMap<Id, usize>,
}

impl PoolSupervisor {
    /// Spawn `worker_count` workers bound to the shared source and sink.
    #[instrument(level = "info", skip_all, fields(workers = worker_count))]
    pub fn start(
        worker_count: usize,
        options: ScanOptions,
        source: Arc<dyn TaskSource>,
        sink: Arc<dyn ResultSink>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        if worker_count == 0 {
            exn::bail!(ErrorKind::InvalidConfig("worker count must be at least 1"));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            exn::bail!(ErrorKind::InvalidConfig("must be started inside a Tokio runtime"));
        }
        let state = RunState::default();
        let context = Arc::new(ScanContext::new(options, state.clone(), sink, collaborators));
        let mut workers = JoinSet::new();
        let mut ids = HashMap::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker = ScanWorker { id, source: Arc::clone(&source), context: Arc::clone(&context) };
            let handle = workers.spawn(worker.run().instrument(info_span!("worker", id)));
            ids.insert(handle.id(), id);
        }
        tracing::info!(workers = worker_count, "Scan pool started");
        Ok(Self { state, workers, ids })
    }

    /// Read-only view of the pool's control flags.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Ask every worker to stop after its current step, without draining the
    /// queue. Returns immediately.
    pub fn halt_early(&self) {
        if self.state.is_running() {
            tracing::info!("Halting scan pool");
        }
        self.state.halt();
    }

    /// Let the workers drain the queue, then wait for all of them to exit.
    #[instrument(level = "info", skip_all)]
    pub async fn graceful_shutdown(mut self) -> PoolReport {
        self.state.request_stop_on_empty();
        let mut exits = vec![WorkerExit::Halted; self.ids.len()];
        while let Some(joined) = self.workers.join_next_with_id().await {
            let (task, exit) = match joined {
                Ok((task, exit)) => (task, exit),
                Err(err) if err.is_panic() => {
                    tracing::error!(error = %err, "Worker panicked");
                    (err.id(), WorkerExit::Panicked)
                },
                Err(err) => (err.id(), WorkerExit::Halted),
            };
            if let Some(id) = self.ids.get(&task) {
                exits[*id] = exit;
            }
        }
        let report = PoolReport { exits };
        tracing::info!(
            drained = report.count(WorkerExit::Drained),
            halted = report.count(WorkerExit::Halted),
            faulted = report.count(WorkerExit::Faulted),
            panicked = report.count(WorkerExit::Panicked),
            "Scan pool shut down",
        );
        report
    }

    /// Stop every worker immediately. In-flight tasks are abandoned.
    pub async fn close(mut self) {
        self.state.halt();
        self.workers.shutdown().await;
        tracing::info!("Scan pool closed");
    }
}

impl Drop for PoolSupervisor {
    fn drop(&mut self) {
        self.state.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ResultRecord, Task, result_channel, task_queue};
    use crate::testing::{drain, options};
    use crate::testing::zip_bytes;
    use hashscan_hasher::{HashComputer, Hashes, ImageHasher, error::Result as HashResult};
    use hashscan_store::{MockStore, StoreHandle};
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn store(items: &[(&str, &str, &str)]) -> StoreHandle {
        Arc::new(MockStore::with_items(items.iter().copied()))
    }

    struct PanickingHasher;

    impl HashComputer for PanickingHasher {
        fn compute(&self, _: &Path, _: &str, _: &[u8], _: bool) -> HashResult<Hashes> {
            panic!("hasher exploded");
        }
    }

    struct SlowHasher;

    impl HashComputer for SlowHasher {
        fn compute(&self, path: &Path, name: &str, data: &[u8], perceptual: bool) -> HashResult<Hashes> {
            std::thread::sleep(Duration::from_millis(20));
            ImageHasher.compute(path, name, data, perceptual)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zero_workers_is_rejected() {
        let (_tx, queue) = task_queue(1);
        let (sink, _rx) = result_channel();
        let err = PoolSupervisor::start(0, options(), Arc::new(queue), Arc::new(sink), Collaborators::new(store(&[])))
            .err()
            .unwrap();
        assert!(matches!(*err, ErrorKind::InvalidConfig(_)));
    }

    #[test]
    fn test_start_outside_runtime_is_rejected() {
        let (_tx, queue) = task_queue(1);
        let (sink, _rx) = result_channel();
        let result = PoolSupervisor::start(1, options(), Arc::new(queue), Arc::new(sink), Collaborators::new(store(&[])));
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_graceful_shutdown_processes_every_task() {
        let dir = TempDir::new().unwrap();
        let (tx, queue) = task_queue(64);
        let (sink, mut rx) = result_channel();
        let pool = PoolSupervisor::start(4, options(), Arc::new(queue), Arc::new(sink), Collaborators::new(store(&[])))
            .unwrap();
        for i in 0..20 {
            let path = dir.path().join(format!("{i}.txt"));
            std::fs::write(&path, format!("file number {i}")).unwrap();
            tx.send(Task::new(path)).await.unwrap();
        }

        let report = pool.graceful_shutdown().await;
        assert_eq!(report.exits.len(), 4);
        assert!(report.is_clean());
        let records = drain(&mut rx);
        assert_eq!(records.len(), 20);
        assert!(records.iter().all(|r| matches!(r, ResultRecord::Hashed(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_graceful_shutdown_on_empty_queue_is_prompt() {
        let (_tx, queue) = task_queue(4);
        let (sink, _rx) = result_channel();
        let pool = PoolSupervisor::start(3, options(), Arc::new(queue), Arc::new(sink), Collaborators::new(store(&[])))
            .unwrap();
        let started = Instant::now();
        let report = pool.graceful_shutdown().await;
        assert!(report.is_clean());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fatal_task_stops_only_its_worker() {
        let (tx, queue) = task_queue(16);
        let (sink, mut rx) = result_channel();
        let items = [("/nonexistent/a.txt", "", "h"), ("/nonexistent/b.txt", "", "h"), ("/nonexistent/c.txt", "", "h")];
        let pool = PoolSupervisor::start(2, options(), Arc::new(queue), Arc::new(sink), Collaborators::new(store(&items)))
            .unwrap();
        tx.send(Task::new("/content/forbidden.txt")).await.unwrap();
        for (path, _, _) in items {
            tx.send(Task::new(path)).await.unwrap();
        }

        let report = pool.graceful_shutdown().await;
        assert_eq!(report.count(WorkerExit::Faulted), 1);
        assert_eq!(report.count(WorkerExit::Drained), 1);
        assert_eq!(drain(&mut rx), vec![ResultRecord::Skipped; 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_worker_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("boom.txt");
        std::fs::write(&path, b"boom").unwrap();
        let (tx, queue) = task_queue(4);
        let (sink, _rx) = result_channel();
        let collaborators = Collaborators::new(store(&[])).with_hasher(Arc::new(PanickingHasher));
        let pool = PoolSupervisor::start(2, options(), Arc::new(queue), Arc::new(sink), collaborators).unwrap();
        tx.send(Task::new(&path)).await.unwrap();

        let report = pool.graceful_shutdown().await;
        assert_eq!(report.count(WorkerExit::Panicked), 1);
        assert_eq!(report.count(WorkerExit::Drained), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_halt_early_leaves_queue_undrained() {
        let (tx, queue) = task_queue(16);
        let (sink, _rx) = result_channel();
        let pool = PoolSupervisor::start(2, options(), Arc::new(queue.clone()), Arc::new(sink), Collaborators::new(store(&[])))
            .unwrap();
        pool.halt_early();
        pool.halt_early();
        assert!(!pool.state().is_running());
        // Give workers time to observe the flag before queueing anything.
        tokio::time::sleep(options().poll_interval * 3).await;
        tx.send(Task::new("/nonexistent/late.txt")).await.unwrap();

        let report = pool.graceful_shutdown().await;
        assert_eq!(report.count(WorkerExit::Halted), 2);
        assert!(queue.pop(options().poll_interval).await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_returns_immediately() {
        let (_tx, queue) = task_queue(4);
        let (sink, _rx) = result_channel();
        let pool = PoolSupervisor::start(2, options(), Arc::new(queue), Arc::new(sink), Collaborators::new(store(&[])))
            .unwrap();
        let state = pool.state().clone();
        let started = Instant::now();
        pool.close().await;
        assert!(!state.is_running());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_shutdown_halts_container_scan() {
        let dir = TempDir::new().unwrap();
        let entries: Vec<(String, Vec<u8>)> = (0..40).map(|i| (format!("{i}.txt"), format!("entry {i}").into_bytes())).collect();
        let refs: Vec<(&str, &[u8])> = entries.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
        let path = dir.path().join("big.zip");
        std::fs::write(&path, zip_bytes(&refs)).unwrap();

        let (tx, queue) = task_queue(4);
        let (sink, mut rx) = result_channel();
        let collaborators = Collaborators::new(store(&[])).with_hasher(Arc::new(SlowHasher));
        let pool = PoolSupervisor::start(1, options(), Arc::new(queue), Arc::new(sink), collaborators).unwrap();
        let state = pool.state().clone();
        tx.send(Task::new(&path)).await.unwrap();

        let interrupted = tokio::time::timeout(Duration::from_millis(150), pool.graceful_shutdown()).await;
        assert!(interrupted.is_err());
        assert!(!state.is_running());
        let at_drop = drain(&mut rx).len();
        assert!(at_drop < 41, "scan finished before the interrupt");
        // The blocking scan may finish the entry it is hashing, then stops.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(drain(&mut rx).len() <= 1);
    }
}
