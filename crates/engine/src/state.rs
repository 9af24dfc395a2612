use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Control flags shared by every worker of one pool run.
///
/// Workers can only read the flags; setting them is reserved to the
/// supervisor. Each flag moves in one direction only: `run` from `true` to
/// `false`, `stop_on_empty` from `false` to `true`.
#[derive(Clone, Debug)]
pub struct RunState {
    inner: Arc<Flags>,
}

#[derive(Debug)]
struct Flags {
    run: AtomicBool,
    stop_on_empty: AtomicBool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            inner: Arc::new(Flags { run: AtomicBool::new(true), stop_on_empty: AtomicBool::new(false) }),
        }
    }
}

impl RunState {
    /// Workers keep polling while this is `true`.
    pub fn is_running(&self) -> bool {
        self.inner.run.load(Ordering::Acquire)
    }

    /// Workers exit on an empty poll once this is `true`.
    pub fn stop_on_empty(&self) -> bool {
        self.inner.stop_on_empty.load(Ordering::Acquire)
    }

    pub(crate) fn halt(&self) {
        self.inner.run.store(false, Ordering::Release);
    }

    pub(crate) fn request_stop_on_empty(&self) {
        self.inner.stop_on_empty.store(true, Ordering::Release);
    }
}
