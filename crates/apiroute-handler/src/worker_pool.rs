//! A bounded pool for blocking handlers.
//!
//! Blocking handlers run on tokio's blocking threads, but at most `size` of
//! them at once: each call first takes a permit from a semaphore and holds it
//! until the closure returns.

use std::sync::Arc;

use tokio::sync::Semaphore;

use apiroute_core::{ApiError, ApiResult, Settings};

/// Runs blocking closures off the async scheduler, bounded in concurrency.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool allowing `size` concurrent jobs (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Creates a pool sized by [`Settings::worker_threads`].
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.worker_threads)
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// The number of jobs that could start right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `f` on a blocking thread and waits for its result.
    ///
    /// A panic inside `f` is resumed on the calling task, so it surfaces
    /// exactly as it would had `f` been called inline.
    pub async fn run<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::Internal("worker pool is closed".to_string()))?;

        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await;

        match joined {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(ApiError::Internal(format!("blocking job was cancelled: {e}"))),
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_run_returns_value() {
        let pool = WorkerPool::new(2);
        assert_eq!(pool.run(|| 6 * 7).await.unwrap(), 42);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_size_is_at_least_one() {
        assert_eq!(WorkerPool::new(0).size(), 1);
        assert_eq!(WorkerPool::default().size(), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<_> = (0..6)
            .map(|_| {
                let pool = pool.clone();
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    pool.run(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(30));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                })
            })
            .collect();

        for job in jobs {
            job.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_panic_is_resumed() {
        let pool = WorkerPool::new(1);
        let handle = tokio::spawn(async move { pool.run(|| panic!("handler blew up")).await });
        let err = handle.await.unwrap_err();
        assert!(err.is_panic());
    }
}
