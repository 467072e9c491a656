//! Generic background-task supervisor.
//!
//! Models the hosting platform's "extend execution lifetime" facility
//! explicitly: a detached stream pump is spawned here so the process
//! does not tear down mid-stream before the loop has observed
//! completion or disconnection. [`Supervisor::shutdown`] drains every
//! outstanding task.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::{AppError, Result};

/// Tracks detached background tasks and drains them on shutdown.
pub struct Supervisor {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Supervisor {
    /// New supervisor with no outstanding tasks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn `task` as a tracked background task.
    ///
    /// The task runs until it settles or its handle (or the supervisor)
    /// is cancelled. The returned [`TaskHandle`] may be dropped freely;
    /// the task stays tracked either way.
    #[must_use = "dropping the handle detaches the task; bind it or drop explicitly"]
    pub fn spawn<F>(&self, task: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let join = self.tracker.spawn(async move {
            tokio::select! {
                () = task_cancel.cancelled() => {}
                () = task => {}
            }
        });
        TaskHandle { join, cancel }
    }

    /// Number of tasks still running.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Whether no tasks are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Cancel all outstanding tasks and wait until every one settles.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.cancel.cancel();
        self.tracker.wait().await;
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one supervised background task.
pub struct TaskHandle {
    join: JoinHandle<()>,
    cancel: CancellationToken,
}

impl TaskHandle {
    /// Wait for the task to settle.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Stream`] if the task panicked.
    pub async fn join(self) -> Result<()> {
        self.join
            .await
            .map_err(|err| AppError::Stream(format!("background task failed: {err}")))
    }

    /// Request cancellation; the task settles at its next suspension
    /// point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
