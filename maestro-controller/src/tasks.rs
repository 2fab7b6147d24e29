//! Task Manager (L6, spec §4.11): a per-mission set of cancellable task
//! handles, tracked weakly so a finished task is garbage-collected from the
//! registry without an explicit cleanup pass.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use maestro_core::error::{MaestroError, Result};

/// Registry of in-flight task handles, one instance shared per mission.
/// Holds `Weak` references so a task that finishes on its own drops out of
/// the registry the next time anything touches the set (spec §4.11's "a
/// finished task is garbage-collected from the registry").
#[derive(Default)]
pub struct TaskManager {
    tasks: Arc<RwLock<HashMap<u64, Weak<JoinHandle<()>>>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle for tracking. The caller keeps the strong `Arc`
    /// alive for as long as the task should remain cancellable; once it's
    /// dropped the registry's weak reference naturally clears.
    pub async fn register(&self, handle: Arc<JoinHandle<()>>) -> u64 {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.tasks.write().await.insert(id, Arc::downgrade(&handle));
        id
    }

    /// Cancel every outstanding task and clear the set (spec §4.11).
    pub async fn cancel_all(&self) {
        let mut tasks = self.tasks.write().await;
        for (_, weak) in tasks.drain() {
            if let Some(handle) = weak.upgrade() {
                handle.abort();
            }
        }
    }

    /// Number of handles still live (finished tasks are pruned lazily as a
    /// side effect of this call).
    pub async fn live_count(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        tasks.retain(|_, weak| weak.strong_count() > 0);
        tasks.len()
    }
}

/// Runs `future` to completion, registering it with `manager` first so a
/// concurrent `cancel_all` can abort it. If `future` itself observes
/// cancellation via `ExecutionContext::check_cancelled` and returns
/// `Err(MaestroError::Cancelled)`, that error propagates to the caller —
/// this helper does not swallow it (spec §4.11's "if cancelled, cancels
/// remaining tasks and re-raises").
pub async fn gather_cancellable<F, T>(manager: &TaskManager, future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    // `TaskManager` tracks uniformly-typed `JoinHandle<()>`s so unrelated
    // tasks of different result types can share one registry; the actual
    // result travels back over a oneshot instead of the JoinHandle's own
    // output.
    let (result_tx, result_rx) = tokio::sync::oneshot::channel();
    let worker = tokio::spawn(async move {
        let result = future.await;
        let _ = result_tx.send(result);
    });
    let tracked = Arc::new(worker);
    manager.register(tracked.clone()).await;

    match result_rx.await {
        Ok(result) => result,
        Err(_) => {
            // The worker was aborted (by cancel_all) before it could send.
            manager.cancel_all().await;
            Err(MaestroError::Cancelled)
        }
    }
}

/// Runs `body`, guaranteeing `manager.cancel_all()` is called on every exit
/// path — success, error, or panic unwinding through the async block (spec
/// §4.11's `mission_scope` helper).
pub async fn mission_scope<F, Fut, T>(manager: Arc<TaskManager>, body: F) -> Result<T>
where
    F: FnOnce(Arc<TaskManager>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    struct CancelOnDrop(Arc<TaskManager>);
    impl Drop for CancelOnDrop {
        fn drop(&mut self) {
            let manager = self.0.clone();
            tokio::spawn(async move { manager.cancel_all().await });
        }
    }
    let _guard = CancelOnDrop(manager.clone());
    body(manager).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gather_cancellable_returns_the_future_result() {
        let manager = TaskManager::new();
        let result = gather_cancellable(&manager, async { Ok::<_, MaestroError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn cancel_all_aborts_outstanding_tasks() {
        let manager = Arc::new(TaskManager::new());
        let manager_for_task = manager.clone();
        let task = tokio::spawn(async move {
            gather_cancellable(&manager_for_task, async {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                Ok::<_, MaestroError>(())
            })
            .await
        });
        tokio::task::yield_now().await;
        manager.cancel_all().await;
        let result = task.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mission_scope_cancels_tasks_on_exit() {
        let manager = Arc::new(TaskManager::new());
        let result: Result<i32> = mission_scope(manager.clone(), |_m| async move { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn live_count_prunes_finished_tasks() {
        let manager = TaskManager::new();
        let _ = gather_cancellable(&manager, async { Ok::<_, MaestroError>(()) }).await;
        tokio::task::yield_now().await;
        assert_eq!(manager.live_count().await, 0);
    }
}
