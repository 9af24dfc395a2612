//! Task intake and result output.
//!
//! Workers pull [`Task`]s from a [`TaskSource`] and push [`ResultRecord`]s to
//! a [`ResultSink`]. The default implementations are Tokio channels: a
//! bounded queue shared by every worker, and an unbounded result sender
//! cloned per worker.

use async_trait::async_trait;
use hashscan_store::HashedItem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

/// One file to scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub base_path: PathBuf,
    /// Human-readable label; carried along but never used for decisions.
    pub display_name: String,
}
impl Task {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        let display_name = base_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { base_path, display_name }
    }
}

/// The outcome of one step of a task. A task may produce several.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultRecord {
    /// Freshly computed hashes to be persisted by the caller.
    Hashed(HashedItem),
    /// Nothing to do: the catalog already covers this path.
    Skipped,
    /// A cataloged container was re-hashed and is unchanged.
    HashMatch,
}

#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Wait up to `timeout` for the next task. `None` means nothing arrived
    /// in time.
    async fn pop(&self, timeout: Duration) -> Option<Task>;
}

/// Receives result records from any number of workers at once.
pub trait ResultSink: Send + Sync {
    fn push(&self, record: ResultRecord);
}

/// Create the default bounded task queue.
///
/// The sender side is handed to whoever discovers files; dropping every
/// sender closes the queue, after which pops report empty.
pub fn task_queue(capacity: usize) -> (mpsc::Sender<Task>, TaskQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, TaskQueue { rx: Arc::new(Mutex::new(rx)) })
}

/// Create the default result channel.
pub fn result_channel() -> (ResultSender, mpsc::UnboundedReceiver<ResultRecord>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ResultSender { tx }, rx)
}

/// Receiving half of [`task_queue`], shared by every worker.
#[derive(Clone, Debug)]
pub struct TaskQueue {
    rx: Arc<Mutex<mpsc::Receiver<Task>>>,
}

#[async_trait]
impl TaskSource for TaskQueue {
    async fn pop(&self, timeout: Duration) -> Option<Task> {
        let deadline = Instant::now() + timeout;
        let next = tokio::time::timeout_at(deadline, async { self.rx.lock().await.recv().await }).await;
        match next {
            Ok(Some(task)) => Some(task),
            Ok(None) => {
                // Closed and drained. Wait out the interval anyway so idle
                // workers don't spin on the lock.
                tokio::time::sleep_until(deadline).await;
                None
            },
            Err(_) => None,
        }
    }
}

/// Sending half of [`result_channel`]; clone one per worker.
#[derive(Clone, Debug)]
pub struct ResultSender {
    tx: mpsc::UnboundedSender<ResultRecord>,
}

impl ResultSink for ResultSender {
    fn push(&self, record: ResultRecord) {
        if self.tx.send(record).is_err() {
            tracing::debug!("Result receiver dropped; discarding record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(30);

    #[test]
    fn test_task_display_name() {
        let task = Task::new("/lib/comics/issue 01.cbz");
        assert_eq!(task.display_name, "issue 01.cbz");
        assert_eq!(Task::new("/").display_name, "");
    }

    #[tokio::test]
    async fn test_pop_returns_queued_task() {
        let (tx, queue) = task_queue(4);
        tx.send(Task::new("/a.txt")).await.unwrap();
        assert_eq!(queue.pop(INTERVAL).await, Some(Task::new("/a.txt")));
    }

    #[tokio::test]
    async fn test_pop_times_out_when_empty() {
        let (_tx, queue) = task_queue(4);
        let started = Instant::now();
        assert_eq!(queue.pop(INTERVAL).await, None);
        assert!(started.elapsed() >= INTERVAL);
    }

    #[tokio::test]
    async fn test_pop_on_closed_queue_still_waits() {
        let (tx, queue) = task_queue(4);
        tx.send(Task::new("/a.txt")).await.unwrap();
        drop(tx);
        assert!(queue.pop(INTERVAL).await.is_some());
        let started = Instant::now();
        assert_eq!(queue.pop(INTERVAL).await, None);
        assert!(started.elapsed() >= INTERVAL);
    }

    #[tokio::test]
    async fn test_shared_queue_consumes_each_task_once() {
        let (tx, queue) = task_queue(8);
        for i in 0..5 {
            tx.send(Task::new(format!("/{i}.txt"))).await.unwrap();
        }
        let other = queue.clone();
        let mut seen = Vec::new();
        while let Some(task) = queue.pop(INTERVAL).await {
            seen.push(task);
            if let Some(task) = other.pop(INTERVAL).await {
                seen.push(task);
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_result_sender() {
        let (sink, mut rx) = result_channel();
        sink.clone().push(ResultRecord::Skipped);
        sink.push(ResultRecord::HashMatch);
        assert_eq!(rx.recv().await, Some(ResultRecord::Skipped));
        assert_eq!(rx.recv().await, Some(ResultRecord::HashMatch));
        drop(rx);
        // Pushing into a closed channel is not an error.
        sink.push(ResultRecord::Skipped);
    }
}
