// src/crawl/throttle.rs
// =============================================================================
// Per-host admission control.
//
// One HostThrottle exists per host. It makes sure that no more than
// `per_host` fetches for that host run at the same time, no matter how many
// fetch workers the pool has. Extra work waits in a FIFO queue.
//
// How it works:
// 1. submit() appends the job to the host's queue and calls dispatch()
// 2. dispatch() moves jobs from the queue to the fetch pool while slots are
//    free, taking one slot per job
// 3. When a job finishes (or panics) its slot is given back and dispatch()
//    runs again, so the next queued job for this host can start
//
// dispatch() is called from submitters and from finishing jobs at the same
// time. All queue/slot bookkeeping happens under one mutex, and the mutex is
// never held while talking to the pool.
// =============================================================================

use super::pool::{Job, WorkerPool};
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct HostThrottle {
    host: String,
    pool: Arc<WorkerPool>,
    queue: Mutex<HostQueue>,
}

struct HostQueue {
    pending: VecDeque<Job>,
    available: usize,
}

impl HostThrottle {
    pub fn new(host: impl Into<String>, limit: usize, pool: Arc<WorkerPool>) -> Self {
        Self {
            host: host.into(),
            pool,
            queue: Mutex::new(HostQueue {
                pending: VecDeque::new(),
                available: limit,
            }),
        }
    }

    /// Number of jobs waiting for a free slot
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of free slots right now
    pub fn available(&self) -> usize {
        self.lock().available
    }

    pub fn submit(self: &Arc<Self>, job: Job) {
        self.lock().pending.push_back(job);
        self.dispatch();
    }

    fn dispatch(self: &Arc<Self>) {
        loop {
            let job = {
                let mut queue = self.lock();
                if queue.available == 0 {
                    return;
                }
                let Some(job) = queue.pending.pop_front() else {
                    return;
                };
                queue.available -= 1;
                job
            };

            let throttle = Arc::clone(self);
            let admitted = async move {
                if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                    tracing::error!(host = %throttle.host, "fetch job panicked");
                }
                throttle.release();
            }
            .boxed();

            if let Err(e) = self.pool.submit(admitted) {
                // Nothing will ever run the rest of the queue, so drop it now.
                // Dropping the jobs drops their level tokens as well.
                let abandoned: Vec<Job> = {
                    let mut queue = self.lock();
                    queue.available += 1;
                    queue.pending.drain(..).collect()
                };
                tracing::warn!(host = %self.host, abandoned = abandoned.len() + 1, "{}", e);
                return;
            }
        }
    }

    fn release(self: &Arc<Self>) {
        self.lock().available += 1;
        self.dispatch();
    }

    fn lock(&self) -> MutexGuard<'_, HostQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
