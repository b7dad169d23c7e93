// src/core/runner.rs — Supervised background tasks

use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinSet;

/// Owns every background run so shutdown can wait for them.
#[derive(Default)]
pub struct TaskRunner {
    tasks: Mutex<JoinSet<()>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task`. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(finished) = tasks.try_join_next() {
            log_join(finished);
        }
        tasks.spawn(task);
    }

    /// Tasks not yet reaped (may include some that just finished).
    pub fn active(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every scheduled task. Tasks spawned meanwhile go to a fresh set.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.lock());
        if !tasks.is_empty() {
            tracing::info!("Waiting for {} background run(s)", tasks.len());
        }
        while let Some(finished) = tasks.join_next().await {
            log_join(finished);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        // A poisoned set is still a valid set
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("Background run aborted: {}", e);
    }
}
