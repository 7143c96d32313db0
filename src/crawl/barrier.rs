// src/crawl/barrier.rs
// =============================================================================
// The per-level completion barrier.
//
// Every piece of work that belongs to a depth level (a fetch, and the link
// extraction a fetch may spawn) holds a LevelToken. The orchestrator waits in
// wait_drained() until every token of the level has been dropped.
//
// Why not a plain countdown latch?
// - Work can be added while the orchestrator is already waiting: a fetch that
//   finishes during the wait registers an extraction before giving up its own
//   token. A latch that "fires" the moment it first hits zero would get this
//   wrong.
//
// The rules:
// - The orchestrator owns one token from construction until wait_drained()
//   begins, so the count cannot reach zero while it is still scheduling.
// - A unit registers new tokens only while holding a live token of the same
//   level, so the count stays above zero across the hand-over.
// - The moment the count reaches zero the level is retired under the same
//   lock. Any register() after that is refused with CrawlError::LevelRetired.
// =============================================================================

use crate::error::CrawlError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

pub struct LevelBarrier {
    level: usize,
    state: Mutex<BarrierState>,
    drained: Notify,
}

struct BarrierState {
    outstanding: usize,
    retired: bool,
}

/// Proof that a unit of work is still pending for a level
///
/// Dropping the token is the "arrive" operation, so it happens on every exit
/// path: normal return, early return, or panic.
#[must_use = "dropping a LevelToken immediately marks the work as finished"]
pub struct LevelToken {
    barrier: Arc<LevelBarrier>,
}

impl LevelBarrier {
    /// Opens a new level and hands back the orchestrator's own token
    pub fn open(level: usize) -> (Arc<Self>, LevelToken) {
        let barrier = Arc::new(Self {
            level,
            state: Mutex::new(BarrierState {
                outstanding: 1,
                retired: false,
            }),
            drained: Notify::new(),
        });
        let token = LevelToken {
            barrier: Arc::clone(&barrier),
        };
        (barrier, token)
    }

    /// Number of tokens that have not arrived yet
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    pub fn is_retired(&self) -> bool {
        self.lock().retired
    }

    /// Adds one pending unit of work to this level
    pub fn register(self: &Arc<Self>) -> Result<LevelToken, CrawlError> {
        let mut state = self.lock();
        if state.retired {
            return Err(CrawlError::LevelRetired(self.level));
        }
        state.outstanding += 1;
        Ok(LevelToken {
            barrier: Arc::clone(self),
        })
    }

    /// Gives up the orchestrator's token and waits until the level retires
    pub async fn wait_drained(&self, own: LevelToken) {
        debug_assert!(std::ptr::eq(self, Arc::as_ptr(&own.barrier)));
        drop(own);

        loop {
            let notified = self.drained.notified();
            if self.lock().retired {
                break;
            }
            notified.await;
        }
        tracing::trace!(level = self.level, "level drained");
    }

    fn arrive(&self) {
        let mut state = self.lock();
        state.outstanding -= 1;
        if state.outstanding == 0 {
            state.retired = true;
            drop(state);
            // notify_one keeps a permit if the waiter is between checks
            self.drained.notify_one();
        }
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LevelToken {
    pub fn level(&self) -> usize {
        self.barrier.level
    }

    /// Registers another unit on the same level as this token
    pub fn register_sibling(&self) -> Result<LevelToken, CrawlError> {
        self.barrier.register()
    }
}

impl Drop for LevelToken {
    fn drop(&mut self) {
        self.barrier.arrive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_level_drains_immediately() {
        let (barrier, own) = LevelBarrier::open(0);
        barrier.wait_drained(own).await;
        assert!(barrier.is_retired());
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_waits_for_all_registered_tokens() {
        let (barrier, own) = LevelBarrier::open(3);
        let first = barrier.register().unwrap();
        let second = barrier.register().unwrap();
        assert_eq!(barrier.outstanding(), 3);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(first);
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(second);
        });

        barrier.wait_drained(own).await;
        assert!(barrier.is_retired());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_registration_during_wait_is_honored() {
        let (barrier, own) = LevelBarrier::open(1);
        let fetch = barrier.register().unwrap();
        let extracted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&extracted);

        // A fetch that finishes while the orchestrator waits, spawning an
        // extraction before it lets go of its own token
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let extract = fetch.register_sibling().unwrap();
        assert_eq!(extract.level(), 1);
            drop(fetch);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
                drop(extract);
            });
        });

        barrier.wait_drained(own).await;
        // The barrier must not release before the extraction finished
        assert!(extracted.load(Ordering::SeqCst));
        assert!(barrier.is_retired());
    }

    #[tokio::test]
    async fn test_register_after_retire_is_refused() {
        let (barrier, own) = LevelBarrier::open(2);
        barrier.wait_drained(own).await;
        assert!(matches!(barrier.register(), Err(CrawlError::LevelRetired(2))));
    }
}
