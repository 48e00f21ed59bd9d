//! Bounded worker pool for tool invocations
//!
//! At most `capacity` submissions run at once; the rest wait in FIFO order on
//! the pool's semaphore. The pool is an explicit resource: construct it once,
//! share it through an `Arc`, and call [`WorkerPool::shutdown`] when done.
//!
//! Aborting a submission's handle stops queued work from ever starting and
//! drops async work at its next suspension point. Blocking work already
//! running on a thread is not interrupted; it holds its slot until it returns.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of concurrent tool invocations
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Worker pool errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    ShutDown,
}

/// Semaphore-bounded pool of tokio tasks
#[derive(Debug)]
pub struct WorkerPool {
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,

    /// Fixed capacity
    capacity: usize,
}

impl WorkerPool {
    /// Create a pool running at most `capacity` submissions concurrently
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Submit work; it starts once a slot frees up
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F, T>(&self, work: F) -> Result<JoinHandle<Result<T, PoolError>>, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_shutdown() {
            return Err(PoolError::ShutDown);
        }

        let semaphore = Arc::clone(&self.semaphore);
        Ok(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| PoolError::ShutDown)?;
            Ok(work.await)
        }))
    }

    /// Submit blocking work; it runs on a blocking thread once a slot frees up
    ///
    /// The slot is owned by the thread, not by the returned handle, so
    /// aborting the handle after the work started does not free capacity.
    /// A panic in `work` resurfaces as a panicked [`JoinHandle`].
    pub fn submit_blocking<F, T>(&self, work: F) -> Result<JoinHandle<Result<T, PoolError>>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_shutdown() {
            return Err(PoolError::ShutDown);
        }

        let semaphore = Arc::clone(&self.semaphore);
        Ok(tokio::spawn(async move {
            let permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| PoolError::ShutDown)?;

            let blocking = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work()
            });

            match blocking.await {
                Ok(value) => Ok(value),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                // blocking tasks are only cancelled when the runtime shuts down
                Err(_) => Err(PoolError::ShutDown),
            }
        }))
    }

    /// Stop accepting work; queued submissions fail with [`PoolError::ShutDown`]
    pub fn shutdown(&self) {
        tracing::debug!(capacity = self.capacity, "shutting down worker pool");
        self.semaphore.close();
    }

    /// Check if the pool has been shut down
    pub fn is_shutdown(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently idle slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}
