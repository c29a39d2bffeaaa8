//! Background task handle
//!
//! Every long-lived loop (listeners, probes, replication links, periodic
//! saves) is started and stopped through a [`BackgroundTask`]. Stopping
//! cancels the loops, waits for them and every connection task they spawned,
//! and can be called any number of times.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Start/stop handle for one component's background loops
pub struct BackgroundTask {
    name: &'static str,
    running: AtomicBool,
    state: Mutex<TaskState>,
}

struct TaskState {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl TaskState {
    fn fresh() -> Self {
        TaskState {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }
}

impl BackgroundTask {
    /// Create a stopped task handle
    pub fn new(name: &'static str) -> Self {
        BackgroundTask {
            name,
            running: AtomicBool::new(false),
            state: Mutex::new(TaskState::fresh()),
        }
    }

    /// Component name used in logs and errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if the loops are running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the task as started
    ///
    /// Returns false when it was already running. The caller spawns its loops
    /// with [`BackgroundTask::spawn`] after a successful start.
    pub fn begin(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        *self.state.lock() = TaskState::fresh();
        true
    }

    /// Undo a [`BackgroundTask::begin`] whose setup failed
    pub fn abort_begin(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Cancellation token of the current run
    pub fn token(&self) -> CancellationToken {
        self.state.lock().token.clone()
    }

    /// Spawn a future tracked by the current run
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let tracker = self.state.lock().tracker.clone();
        tracker.spawn(future);
    }

    /// Tracker of the current run, for loops that spawn per-connection tasks
    pub fn tracker(&self) -> TaskTracker {
        self.state.lock().tracker.clone()
    }

    /// Cancel every loop of the current run and wait for them to finish
    ///
    /// A no-op when the task is not running.
    pub async fn stop(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let (token, tracker) = {
            let state = self.state.lock();
            (state.token.clone(), state.tracker.clone())
        };

        token.cancel();
        tracker.close();
        tracker.wait().await;

        debug!("{} stopped", self.name);
    }
}
