//! Fire-and-forget execution of jobs after the triggering call returns.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

/// Tracks background jobs spawned on a tokio runtime.
///
/// Jobs spawned while another job is still running (e.g. a delayed retry
/// scheduled by a failed run) are tracked too, so [`wait_idle`](Self::wait_idle)
/// drains whole retry chains.
#[derive(Debug, Clone)]
pub struct BackgroundExecutor {
    tracker: TaskTracker,
    handle: Handle,
}

impl BackgroundExecutor {
    /// Executor on the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self {
            tracker: TaskTracker::new(),
            handle,
        }
    }

    /// Executor on the current runtime, if called from within one.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn_on(job, &self.handle);
    }

    /// Run `job` after `delay`.
    pub fn submit_delayed<F>(&self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });
    }

    /// Number of jobs still running or waiting for their delay.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every submitted job, including jobs they submit, has finished.
    ///
    /// Meant for a single drainer (host shutdown or a test). Concurrent
    /// callers share one tracker, so one caller's reopen can let another
    /// return only once the tracker next empties while closed.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
