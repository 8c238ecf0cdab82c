/// Execution Admission Queue
///
/// **Core Responsibility:**
/// Bound the number of submissions executing at once. Everything past the
/// bound waits in arrival order.
///
/// **Properties:**
/// - FIFO admission (tokio's semaphore queues waiters fairly)
/// - `running()` never exceeds `capacity()`
/// - A task's failure or panic only reaches its own caller; the slot is
///   released on every exit path by the permit guard
/// - A task does not start until it is admitted, since futures are lazy

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Debug)]
pub struct AdmissionQueue {
    slots: Arc<Semaphore>,
    capacity: usize,
    running: AtomicUsize,
    pending: AtomicUsize,
}

/// Decrements a counter when dropped
struct CountGuard<'a>(&'a AtomicUsize);

impl<'a> CountGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for CountGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionQueue {
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            running: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
        }
    }

    /// Wait for a slot, then drive `task` to completion while holding it.
    pub async fn enqueue<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let waiting = CountGuard::enter(&self.pending);
        // The semaphore is owned here and never closed, so acquire cannot fail.
        let _permit = match self.slots.acquire().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("admission semaphore is never closed"),
        };
        drop(waiting);

        let _running = CountGuard::enter(&self.running);
        debug!(running = self.running(), pending = self.pending(), "Task admitted");
        task.await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently holding a slot
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Tasks waiting for a slot
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_running_never_exceeds_capacity() {
        let queue = Arc::new(AdmissionQueue::new(3));
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let queue = queue.clone();
            let live = live.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(async {
                        let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        assert!(queue.running() <= queue.capacity());
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        live.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(queue.running(), 0);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_admission_is_fifo() {
        let queue = Arc::new(AdmissionQueue::new(1));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..6 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(async {
                        order.lock().unwrap().push(i);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    })
                    .await
            }));
            // make arrival order deterministic
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_failed_task_only_affects_its_caller() {
        let queue = AdmissionQueue::new(1);
        let failed: Result<(), &str> = queue.enqueue(async { Err("boom") }).await;
        assert!(failed.is_err());

        let ok: Result<u32, &str> = queue.enqueue(async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));
        assert_eq!(queue.running(), 0);
    }

    #[tokio::test]
    async fn test_slot_released_when_task_panics() {
        let queue = Arc::new(AdmissionQueue::new(1));
        let q = queue.clone();
        let crashed = tokio::spawn(async move {
            q.enqueue(async { panic!("task crashed") }).await
        })
        .await;
        assert!(crashed.is_err());

        let value = tokio::time::timeout(Duration::from_secs(1), queue.enqueue(async { 1 }))
            .await
            .expect("slot should have been released");
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_seven_tasks_five_slots_take_two_rounds() {
        let queue = Arc::new(AdmissionQueue::new(5));
        let started = Instant::now();
        let starts = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..7 {
            let queue = queue.clone();
            let starts = starts.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(async {
                        starts.lock().unwrap().push(started.elapsed());
                        tokio::time::sleep(Duration::from_millis(400)).await;
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let total = started.elapsed();
        assert!(total >= Duration::from_millis(800), "took {:?}", total);
        assert!(total < Duration::from_millis(1600), "took {:?}", total);

        let mut starts = starts.lock().unwrap().clone();
        starts.sort();
        assert!(starts[4] < Duration::from_millis(200));
        assert!(starts[5] >= Duration::from_millis(400));
        assert!(starts[6] >= Duration::from_millis(400));
    }
}
