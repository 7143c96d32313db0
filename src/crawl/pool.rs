// src/crawl/pool.rs
// =============================================================================
// A fixed-size pool of async workers.
//
// The engine creates two of these: one for fetching pages and one for
// extracting links. Keeping them separate means slow HTML parsing can never
// eat up the slots that network fetches need (and vice versa).
//
// How it works:
// 1. submit() pushes a boxed future ("job") onto an unbounded channel
// 2. N worker tasks take turns pulling jobs off the channel and awaiting them
// 3. shutdown() drops the sender; workers finish what is queued and exit
//
// A panicking job is caught inside the worker, so the worker keeps running
// and the pool never silently shrinks.
// =============================================================================

use crate::error::CrawlError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// A unit of work: any future that owns its data and produces nothing
pub type Job = BoxFuture<'static, ()>;

pub struct WorkerPool {
    name: &'static str,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Starts `size` workers on the current tokio runtime
    ///
    /// Must be called from inside a runtime (tokio::spawn is used).
    pub fn new(name: &'static str, size: usize) -> Result<Self, CrawlError> {
        if size == 0 {
            return Err(CrawlError::InvalidConfig(format!(
                "{} pool needs at least one worker",
                name
            )));
        }

        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| tokio::spawn(run_worker(name, id, Arc::clone(&receiver))))
            .collect();

        tracing::debug!(pool = name, size, "worker pool started");

        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Queues a job. Never blocks, so it is safe to call from inside a job.
    pub fn submit(&self, job: Job) -> Result<(), CrawlError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| CrawlError::PoolClosed(self.name)),
            None => Err(CrawlError::PoolClosed(self.name)),
        }
    }

    /// Stops accepting jobs without waiting for the workers
    ///
    /// Queued jobs still run; workers exit once the queue is empty.
    pub fn close(&self) {
        if self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            tracing::debug!(pool = self.name, "worker pool closed");
        }
    }

    /// Closes the pool and gives the workers up to `grace` to exit
    ///
    /// Returns how many workers were still running when the grace period
    /// ran out. Those are left to finish on their own and logged as a warning.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.close();

        let workers: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );

        let deadline = tokio::time::Instant::now() + grace;
        let mut stragglers = 0;
        for worker in workers {
            if tokio::time::timeout_at(deadline, worker).await.is_err() {
                stragglers += 1;
            }
        }

        if stragglers > 0 {
            tracing::warn!(
                pool = self.name,
                stragglers,
                "could not terminate all workers before the grace period ended"
            );
        }
        stragglers
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_worker(
    pool: &'static str,
    id: usize,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Job>>>,
) {
    loop {
        // Hold the lock only while waiting for the next job, not while running it
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        let Some(job) = job else {
            break;
        };

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::error!(pool, worker = id, "job panicked; worker keeps running");
        }
    }
    tracing::trace!(pool, worker = id, "worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        assert!(matches!(
            WorkerPool::new("fetch", 0),
            Err(CrawlError::InvalidConfig(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_size() {
        let pool = WorkerPool::new("fetch", 2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        for _ in 0..10 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let done_tx = done_tx.clone();
            pool.submit(
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    let _ = done_tx.send(());
                }
                .boxed(),
            )
            .unwrap();
        }

        for _ in 0..10 {
            done_rx.recv().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new("extract", 1).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        pool.submit(async { panic!("bad page") }.boxed()).unwrap();
        pool.submit(
            async move {
                let _ = tx.send(42);
            }
            .boxed(),
        )
        .unwrap();

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let pool = WorkerPool::new("fetch", 1).unwrap();
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(
            pool.submit(async {}.boxed()),
            Err(CrawlError::PoolClosed("fetch"))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_of_idle_pool_has_no_stragglers() {
        let pool = WorkerPool::new("fetch", 3).unwrap();
        assert_eq!(pool.shutdown(Duration::from_secs(1)).await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_reports_busy_workers() {
        let pool = WorkerPool::new("fetch", 1).unwrap();
        pool.submit(tokio::time::sleep(Duration::from_secs(5)).boxed())
            .unwrap();
        // let the worker pick the job up
        tokio::task::yield_now().await;
        assert_eq!(pool.shutdown(Duration::from_millis(20)).await, 1);
    }
}
