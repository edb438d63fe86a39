//! Fixed-size worker pool for asynchronous dispatch.
//!
//! Spawning a thread per request has no upper bound. A `WorkerPool` caps
//! the number of concurrent round trips: jobs queue on a `crossbeam-channel`
//! and a fixed set of named threads pull from it. Jobs start in FIFO order
//! but may complete in any order.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::RequestError;

type Job = Box<dyn FnOnce() + Send + 'static>;

const DEFAULT_THREAD_NAME: &str = "fluent-request-worker";

#[derive(Debug)]
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let workers = (0..threads.max(1))
            .filter_map(|index| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("{DEFAULT_THREAD_NAME}-{index}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                        }
                    })
                    .map_err(|err| warn!(%err, "failed to spawn worker thread"))
                    .ok()
            })
            .collect::<Vec<_>>();

        debug!(threads = workers.len(), "worker pool started");
        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.lock().len()
    }

    /// Queue a job. Fails once the pool has been shut down.
    pub fn execute<F>(&self, job: F) -> Result<(), RequestError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(RequestError::WorkerPoolClosed)?;
        sender
            .send(Box::new(job))
            .map_err(|_| RequestError::WorkerPoolClosed)
    }

    /// Stop accepting jobs, let queued jobs finish, and join the workers.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for worker in workers {
            // A job that drops the last handle to its own pool runs shutdown
            // on a worker thread; that thread cannot join itself.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_every_queued_job() {
        let pool = WorkerPool::new(3);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn zero_threads_still_gets_one_worker() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn rejects_jobs_after_shutdown() {
        let pool = WorkerPool::new(1);
        pool.shutdown();
        let err = pool.execute(|| {}).unwrap_err();
        assert_eq!(err, RequestError::WorkerPoolClosed);
    }

    #[test]
    fn concurrency_is_bounded_by_pool_size() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            pool.execute(move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(10));
                active.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
