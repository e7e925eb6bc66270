//! Bounded pool of session workers.
//!
//! A fixed set of worker tasks pulls unit-of-work futures from a bounded
//! FIFO. Sessions are long-lived, so the pool size bounds how many clients
//! are served concurrently; excess work queues until a worker frees up.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::GarrisonError;

/// Maximum number of queued work items.
pub const MAX_QUEUE_SIZE: usize = 5000;

type Task = BoxFuture<'static, ()>;

pub struct WorkerPool {
    queue: Mutex<Option<mpsc::Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    queued: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `size` workers. A pool of zero workers is refused.
    pub fn new(size: usize) -> Result<Self, GarrisonError> {
        if size == 0 {
            return Err(GarrisonError::Pool(
                "worker count must be greater than zero".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel::<Task>(MAX_QUEUE_SIZE);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let queued = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));

        let workers = (0..size)
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                let queued = Arc::clone(&queued);
                let active = Arc::clone(&active);
                tokio::spawn(async move {
                    loop {
                        let task = { rx.lock().await.recv().await };
                        let Some(task) = task else {
                            // Queue closed and drained.
                            break;
                        };
                        queued.fetch_sub(1, Ordering::SeqCst);
                        active.fetch_add(1, Ordering::SeqCst);
                        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                            warn!("Worker {worker_id} caught a panicking task");
                        }
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                    debug!("Worker {worker_id} stopped");
                })
            })
            .collect();

        Ok(Self {
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            running: Arc::new(AtomicBool::new(true)),
            queued,
            active,
        })
    }

    /// Queue a unit of work. Returns `false` when the pool is shutting down
    /// or the queue is full.
    pub fn enqueue(&self, task: Task) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        let queue = self.queue.lock();
        let Some(tx) = queue.as_ref() else {
            return false;
        };
        match tx.try_send(task) {
            Ok(()) => {
                self.queued.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    pub fn queued_tasks(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn active_tasks(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Refuse new work, let the workers drain the queue, and wait for every
    /// worker to exit.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        drop(self.queue.lock().take());

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
    }
}
