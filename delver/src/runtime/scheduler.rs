use crate::runtime::error::Error;
use crate::runtime::handle::TaskHandle;
use crate::runtime::task::Task;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Semaphore, oneshot};
use uuid::Uuid;

pub trait Scheduler: Send + Sync {
    type Handle<T>: Future<Output = Result<T, Error>> + Send
    where
        T: Send + 'static;

    fn submit<T>(&self, task: T) -> Self::Handle<T::Output>
    where
        T: Task + 'static;
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Upper bound on tasks running at once. `None` leaves it to the
    /// blocking pool.
    pub workers: Option<usize>,
}

/// Runs tasks on the tokio blocking pool of the current runtime.
pub struct LocalScheduler {
    permits: Option<Arc<Semaphore>>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            permits: config
                .workers
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for LocalScheduler {
    type Handle<T>
        = TaskHandle<T>
    where
        T: Send + 'static;

    fn submit<T>(&self, task: T) -> Self::Handle<T::Output>
    where
        T: Task + 'static,
    {
        let task_id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        let _ = sender.send(Err(Error::ShutDown));
                        return;
                    }
                },
                None => None,
            };
            let result = tokio::task::spawn_blocking(move || task.call())
                .await
                .map_err(|e| Error::Panicked(e.to_string()));
            tracing::trace!(%task_id, ok = result.is_ok(), "task finished");
            let _ = sender.send(result);
        });

        TaskHandle::new(task_id, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delver_task;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn submit_and_await() {
        let scheduler = LocalScheduler::new();
        let handle = scheduler.submit(delver_task!(|| 6 * 7));
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn batch_keeps_order() {
        let scheduler = LocalScheduler::with_config(SchedulerConfig { workers: Some(2) });
        let handles: Vec<_> = (0..5u64)
            .map(|i| scheduler.submit(delver_task!(move || i * i)))
            .collect();
        let results: Vec<u64> = join_all(handles)
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(results, vec![0, 1, 4, 9, 16]);
    }

    #[tokio::test]
    async fn worker_limit_is_respected() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let scheduler = LocalScheduler::with_config(SchedulerConfig { workers: Some(2) });

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                scheduler.submit(delver_task!(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                }))
            })
            .collect();
        for handle in join_all(handles).await {
            handle.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn handles_carry_distinct_ids() {
        let scheduler = LocalScheduler::new();
        let a = scheduler.submit(delver_task!(|| ()));
        let b = scheduler.submit(delver_task!(|| ()));
        assert_ne!(a.id(), b.id());
        a.await.unwrap();
        b.await.unwrap();
    }

    #[tokio::test]
    async fn panics_surface_as_errors() {
        let scheduler = LocalScheduler::new();
        let handle = scheduler.submit(delver_task!(|| -> u8 { panic!("boom") }));
        assert!(matches!(handle.await, Err(Error::Panicked(_))));
    }
}
