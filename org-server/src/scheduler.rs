//! Bounded spawner for tool calls.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Limit on tool calls executing at the same time.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    max_concurrent_calls: NonZeroUsize,
}

impl SchedulerConfig {
    /// Creates a configuration with the supplied limit.
    #[must_use]
    pub const fn new(max_concurrent_calls: NonZeroUsize) -> Self {
        Self {
            max_concurrent_calls,
        }
    }

    /// Returns the configured limit.
    #[must_use]
    pub const fn max_concurrent_calls(self) -> NonZeroUsize {
        self.max_concurrent_calls
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(16).unwrap_or(NonZeroUsize::MIN))
    }
}

/// Runs each tool call on its own task so a panicking tool cannot take the
/// server down, and applies backpressure once the limit is reached.
#[derive(Debug, Clone)]
pub struct CallScheduler {
    semaphore: Arc<Semaphore>,
    config: SchedulerConfig,
}

impl CallScheduler {
    /// Constructs a scheduler using the provided configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls().get())),
            config,
        }
    }

    /// Returns the associated configuration.
    #[must_use]
    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Returns true once [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Stops accepting new calls; calls already running are unaffected.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Waits for a free slot, then spawns `future`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Closed`] when the scheduler is closed before
    /// a slot becomes free.
    pub async fn spawn<F, T>(&self, future: F) -> SchedulerResult<JoinHandle<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SchedulerError::Closed)?;

        Ok(tokio::spawn(async move {
            let output = future.await;
            drop(permit);
            output
        }))
    }
}

impl Default for CallScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

/// Errors produced by the scheduler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Scheduler is closed and will not accept new calls.
    #[error("call scheduler closed")]
    Closed,
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
