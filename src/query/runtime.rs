//! Bounded pool of query threads.
//!
//! Queries are CPU-bound walks over the live object graph. The runtime runs
//! them on a fixed set of worker threads fed by a bounded queue, so a burst
//! of queries is rejected early instead of piling up behind the workers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{execute, Query, QueryOutput};
use crate::error::{ConfigError, ExecutionError, LiveError, LiveResult};
use crate::table::Table;

const POOL_NAME: &str = "query";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRuntimeConfig {
    /// Number of query threads.
    pub workers: usize,
    /// Maximum number of queued queries.
    pub queue_capacity: usize,
}

impl Default for QueryRuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
        }
    }
}

impl QueryRuntimeConfig {
    /// # Errors
    /// `InvalidValue` for zero workers or a zero-capacity queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runtime.workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runtime.queue_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    fn start(workers: usize, queue_capacity: usize) -> LiveResult<Self> {
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("livestate-{POOL_NAME}-{idx}"))
                .spawn(move || {
                    debug!(worker = idx, "query worker started");
                    while let Ok(job) = rx.recv() {
                        // A panicking query drops its reply sender; the
                        // caller sees `Disconnected` and the worker lives on.
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            warn!(worker = idx, "query panicked");
                        }
                    }
                    debug!(worker = idx, "query worker stopped");
                })
                .map_err(|err| LiveError::internal(format!("failed to spawn query worker: {err}")))?;
            handles.push(handle);
        }

        Ok(Self {
            tx: Some(tx),
            workers: handles,
            queue_capacity,
        })
    }

    fn try_submit(&self, job: Job) -> LiveResult<()> {
        let Some(tx) = &self.tx else {
            return Err(disconnected());
        };
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ExecutionError::QueueFull {
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(disconnected()),
        }
    }

    fn shutdown(&mut self) {
        // Closing the channel lets workers drain queued jobs, then exit.
        self.tx = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn disconnected() -> LiveError {
    ExecutionError::Disconnected {
        path: POOL_NAME.to_string(),
    }
    .into()
}

/// Handle returned by [`QueryRuntime::execute_async`].
#[derive(Debug)]
pub struct QueryHandle {
    rx: Receiver<LiveResult<QueryOutput>>,
}

impl QueryHandle {
    /// Waits for the query to complete.
    ///
    /// # Errors
    /// The query's own error, or `Disconnected` if it never replied.
    pub fn join(self) -> LiveResult<QueryOutput> {
        self.rx.recv().map_err(|_| disconnected())?
    }

    /// Waits for the query to complete, at most `timeout`.
    ///
    /// # Errors
    /// `Timeout` if no reply arrived in time, otherwise as [`join`](Self::join).
    pub fn join_timeout(self, timeout: Duration) -> LiveResult<QueryOutput> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
            .into(),
            RecvTimeoutError::Disconnected => disconnected(),
        })?
    }
}

/// Runs queries on a bounded pool of threads.
///
/// Dropping the runtime drains the queue and joins every worker.
#[derive(Debug)]
pub struct QueryRuntime {
    pool: WorkerPool,
}

impl QueryRuntime {
    /// Starts the worker threads.
    ///
    /// # Errors
    /// `Config` if the config is rejected by
    /// [`QueryRuntimeConfig::validate`], `Internal` if a worker thread cannot
    /// be spawned.
    pub fn new(config: &QueryRuntimeConfig) -> LiveResult<Self> {
        config.validate()?;
        let pool = WorkerPool::start(config.workers, config.queue_capacity)?;
        debug!(
            workers = pool.workers.len(),
            queue_capacity = pool.queue_capacity,
            "query runtime started"
        );
        Ok(Self { pool })
    }

    /// Queues `query` against `table`.
    ///
    /// # Errors
    /// `QueueFull` when the queue is at capacity.
    pub fn execute_async<T>(&self, table: Arc<T>, query: Query<T>) -> LiveResult<QueryHandle>
    where
        T: Table + 'static,
    {
        let (tx, rx) = bounded::<LiveResult<QueryOutput>>(1);
        self.pool.try_submit(Box::new(move || {
            let result = execute(table.as_ref(), &query);
            if tx.send(result).is_err() {
                debug!("query result dropped: handle went away");
            }
        }))?;
        Ok(QueryHandle { rx })
    }

    /// Runs `query` on the pool and waits for it.
    ///
    /// # Errors
    /// As [`execute_async`](Self::execute_async) and [`QueryHandle::join`].
    pub fn execute<T>(&self, table: Arc<T>, query: Query<T>) -> LiveResult<QueryOutput>
    where
        T: Table + 'static,
    {
        self.execute_async(table, query)?.join()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.workers.len()
    }

    #[cfg(test)]
    fn submit(&self, job: impl FnOnce() + Send + 'static) -> LiveResult<()> {
        self.pool.try_submit(Box::new(job))
    }
}

impl Drop for QueryRuntime {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}
