//! Deferred work that runs after a response body has been sent.
//!
//! A [`BackgroundTasks`] queue is filled by dependencies or handlers and
//! attached to the outgoing response. Tasks run one after another in the
//! order they were added; the first failure is logged and stops the rest.

use std::fmt;
use std::future::Future;

use apiroute_core::{ApiError, ApiResult};

use crate::BoxFuture;

type Task = Box<dyn FnOnce() -> BoxFuture<'static, ApiResult<()>> + Send>;

/// An ordered queue of deferred tasks.
///
/// # Examples
///
/// ```
/// use apiroute_http::BackgroundTasks;
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut tasks = BackgroundTasks::new();
/// tasks.add_task(|| async { Ok(()) });
/// tasks.add_blocking(|| Ok(()));
/// assert_eq!(tasks.len(), 2);
/// tasks.run().await.unwrap();
/// # }
/// ```
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<(&'static str, Task)>,
}

impl BackgroundTasks {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Queues an async task.
    pub fn add_task<F, Fut>(&mut self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ApiResult<()>> + Send + 'static,
    {
        let boxed: Task = Box::new(move || -> BoxFuture<'static, ApiResult<()>> {
            Box::pin(task())
        });
        self.tasks.push((std::any::type_name::<F>(), boxed));
    }

    /// Queues a blocking task. It runs on tokio's blocking thread pool.
    pub fn add_blocking<F>(&mut self, task: F)
    where
        F: FnOnce() -> ApiResult<()> + Send + 'static,
    {
        let boxed: Task = Box::new(move || -> BoxFuture<'static, ApiResult<()>> {
            Box::pin(async move {
                tokio::task::spawn_blocking(task)
                    .await
                    .map_err(|e| ApiError::Internal(format!("background task panicked: {e}")))?
            })
        });
        self.tasks.push((std::any::type_name::<F>(), boxed));
    }

    /// Moves every task of `other` to the end of this queue.
    pub fn extend(&mut self, other: Self) {
        self.tasks.extend(other.tasks);
    }

    /// Returns the number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if no task is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every task in order.
    ///
    /// Stops at, and returns, the first error.
    pub async fn run(self) -> ApiResult<()> {
        let total = self.tasks.len();
        for (index, (name, task)) in self.tasks.into_iter().enumerate() {
            tracing::debug!(task = name, index, total, "running background task");
            if let Err(e) = task().await {
                tracing::error!(
                    task = name,
                    error = %e,
                    skipped = total - index - 1,
                    "background task failed"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("tasks", &self.tasks.iter().map(|(n, _)| *n).collect::<Vec<_>>())
            .finish()
    }
}
