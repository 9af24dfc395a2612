use crate::error::{ErrorKind, Result};

/// Run synchronous work on the blocking pool.
///
/// A panic in `work` is resumed on the calling task, so it surfaces at the
/// worker's join like any other worker panic.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(value) => Ok(value),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => exn::bail!(ErrorKind::Cancelled),
    }
}
