use hashscan_engine::{RunState, Task};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::mpsc;

/// What a directory walk found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Discovery {
    pub queued: u64,
    pub unreadable: u64,
}

/// Walk every root depth-first, queueing each regular file as a task.
///
/// Symlinks are not followed. Unreadable directories are logged and
/// skipped. Stops early if the run is halted or the queue is closed; the
/// sender is dropped on return, which closes the queue.
pub async fn discover(roots: Vec<PathBuf>, queue: mpsc::Sender<Task>, state: RunState) -> Discovery {
    let mut found = Discovery::default();
    let mut stack: Vec<PathBuf> = Vec::new();
    for root in roots {
        let metadata = fs::symlink_metadata(&root).await;
        match metadata {
            Ok(meta) if meta.is_dir() => stack.push(root),
            Ok(meta) if meta.is_file() => {
                if queue.send(Task::new(root)).await.is_err() {
                    return found;
                }
                found.queued += 1;
            },
            Ok(_) => tracing::debug!(path = %root.display(), "Not a file or directory, skipping"),
            Err(err) => {
                tracing::warn!(path = %root.display(), error = %err, "Cannot read scan root");
                found.unreadable += 1;
            },
        }
    }

    'dirs: while let Some(current) = stack.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %current.display(), error = %err, "Cannot read directory");
                found.unreadable += 1;
                continue 'dirs;
            },
        };
        loop {
            if !state.is_running() {
                tracing::info!(queued = found.queued, "Run halted, discovery stopped");
                return found;
            }
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(path = %current.display(), error = %err, "Cannot list directory");
                    found.unreadable += 1;
                    continue 'dirs;
                },
            };
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), error = %err, "Cannot stat entry");
                    found.unreadable += 1;
                    continue;
                },
            };
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                if queue.send(Task::new(entry.path())).await.is_err() {
                    tracing::debug!("Task queue closed, discovery stopped");
                    return found;
                }
                found.queued += 1;
            }
        }
    }
    found
}
