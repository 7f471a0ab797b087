//! Worker pool that script callbacks run on.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::error;

/// A unit of work submitted to a [`TaskPool`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Accepts jobs without blocking the caller.
pub trait TaskPool: Send + Sync {
    fn submit(&self, job: Job);
}

/// Runs jobs on tokio's blocking threads, at most `capacity` at a time.
#[derive(Debug)]
pub struct BlockingPool {
    runtime: Handle,
    permits: Arc<Semaphore>,
}

impl BlockingPool {
    #[must_use]
    pub fn new(runtime: Handle, capacity: usize) -> Self {
        Self {
            runtime,
            permits: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Jobs that may start right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl TaskPool for BlockingPool {
    fn submit(&self, job: Job) {
        let permits = Arc::clone(&self.permits);
        self.runtime.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(e) = tokio::task::spawn_blocking(job).await {
                error!("Worker job failed: {}", e);
            }
        });
    }
}
