//! Bounded worker pool.
//!
//! A fixed number of OS threads drain a FIFO queue of candidate-search
//! workers. The queue is bounded; a submission against a full queue is
//! rejected by unregistering the worker and logging a warning, so callers
//! never observe an error.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cutlist_core::Status;

use crate::guard;
use crate::running::RunningTasks;
use crate::worker::CutListWorker;

/// Capacity of the pending-worker queue.
pub const THREAD_QUEUE_SIZE: usize = 1000;

struct Shared {
    queue: Mutex<VecDeque<CutListWorker>>,
    available: Condvar,
    shutdown: AtomicBool,
    active: AtomicUsize,
    completed: AtomicU64,
    capacity: usize,
}

pub struct TaskExecutor {
    shared: Arc<Shared>,
    registry: Arc<RunningTasks>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskExecutor {
    /// Starts `pool_size` pool threads over a queue of
    /// [`THREAD_QUEUE_SIZE`] pending workers.
    pub fn new(pool_size: usize, registry: Arc<RunningTasks>) -> Self {
        Self::with_capacity(pool_size, THREAD_QUEUE_SIZE, registry)
    }

    pub fn with_capacity(pool_size: usize, capacity: usize, registry: Arc<RunningTasks>) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            capacity,
        });
        let mut threads = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            let shared = shared.clone();
            threads.push(
                std::thread::Builder::new()
                    .name(format!("cutlist-pool-{i}"))
                    .spawn(move || pool_loop(shared))
                    .expect("failed to spawn pool thread"),
            );
        }
        Self {
            shared,
            registry,
            threads: Mutex::new(threads),
        }
    }

    /// Enqueues one worker, or rejects it when the queue is full or the pool
    /// is shutting down.
    pub fn execute(&self, worker: CutListWorker) {
        {
            let mut queue = guard(&self.shared.queue);
            if !self.shared.shutdown.load(Ordering::Acquire) && queue.len() < self.shared.capacity
            {
                queue.push_back(worker);
                self.shared.available.notify_one();
                return;
            }
        }
        self.reject(worker);
    }

    fn reject(&self, worker: CutListWorker) {
        let handle = worker.handle();
        handle.set_status(Status::Terminated);
        self.registry.remove_worker(&handle);
        log::warn!(
            "worker {} for material [{}] was rejected by the executor queue",
            worker.aux_info(),
            handle.material()
        );
    }

    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    pub fn queued_count(&self) -> usize {
        guard(&self.shared.queue).len()
    }

    pub fn completed_count(&self) -> u64 {
        self.shared.completed.load(Ordering::Relaxed)
    }

    pub fn pool_size(&self) -> usize {
        guard(&self.threads).len()
    }

    /// Stops the pool threads after the queue drains of in-flight pops and
    /// joins them. Queued but unstarted workers are dropped.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.available.notify_all();
        let threads = std::mem::take(&mut *guard(&self.threads));
        for handle in threads {
            let _ = handle.join();
        }
    }
}

fn pool_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = guard(&shared.queue);
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if shared.shutdown.load(Ordering::Acquire) {
                    break None;
                }
                let (next, _timeout) = shared
                    .available
                    .wait_timeout(queue, Duration::from_millis(500))
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                queue = next;
            }
        };
        let Some(job) = job else { return };
        shared.active.fetch_add(1, Ordering::Relaxed);
        job.run();
        shared.active.fetch_sub(1, Ordering::Relaxed);
        shared.completed.fetch_add(1, Ordering::Relaxed);
    }
}
