//! Best-effort background tasks grouped by name.
//!
//! A pool belongs to one batch run. Tasks never report errors to the
//! submitter: failures and panics are logged and counted, and `wait` only
//! tells how many tasks of a group went wrong.

use crate::utils::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub struct TaskPool {
    permits: Arc<Semaphore>,
    workers: usize,
    groups: Mutex<HashMap<String, Vec<JoinHandle<bool>>>>,
}

impl TaskPool {
    /// At most `max_workers` tasks run at once (at least one).
    pub fn new(max_workers: usize) -> Self {
        let workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            groups: Mutex::new(HashMap::new()),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawns `task` in `group`. Must be called from within a tokio runtime.
    pub fn submit<F>(&self, group: &str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let group_name = group.to_string();

        let handle = tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return false;
            };
            match task.await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("🔥 Background task in group {:?} failed: {}", group_name, e);
                    false
                }
            }
        });

        self.lock_groups()
            .entry(group.to_string())
            .or_default()
            .push(handle);
    }

    /// Completion flags of the tasks currently tracked in `group`.
    pub fn progress(&self, group: &str) -> Vec<bool> {
        self.lock_groups()
            .get(group)
            .map(|handles| handles.iter().map(|h| h.is_finished()).collect())
            .unwrap_or_default()
    }

    /// Waits for every task of `group` and forgets them. Returns how many
    /// failed or panicked. Unknown groups return immediately.
    pub async fn wait(&self, group: &str) -> usize {
        let handles = self.lock_groups().remove(group).unwrap_or_default();

        let mut failed = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => {}
                Ok(false) => failed += 1,
                Err(e) => {
                    tracing::error!("🔥 Background task in group {:?} panicked: {}", group, e);
                    failed += 1;
                }
            }
        }
        failed
    }

    fn lock_groups(&self) -> MutexGuard<'_, HashMap<String, Vec<JoinHandle<bool>>>> {
        self.groups.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::GalfitError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_collects_group_failures() {
        let pool = TaskPool::new(2);
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..4 {
            let done = Arc::clone(&done);
            pool.submit("psf", async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
                if i == 3 {
                    return Err(GalfitError::InvalidArgumentError {
                        reason: "beta must exceed 1".to_string(),
                    });
                }
                Ok(())
            });
        }

        assert_eq!(pool.progress("psf").len(), 4);
        assert_eq!(pool.wait("psf").await, 1);
        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert!(pool.progress("psf").is_empty());
    }

    #[tokio::test]
    async fn test_groups_are_independent() {
        let pool = TaskPool::new(1);
        pool.submit("a", async { Ok(()) });
        pool.submit("b", async { Ok(()) });

        assert_eq!(pool.wait("a").await, 0);
        assert_eq!(pool.progress("b").len(), 1);
        assert_eq!(pool.wait("missing").await, 0);
        assert_eq!(pool.wait("b").await, 0);
    }
}
