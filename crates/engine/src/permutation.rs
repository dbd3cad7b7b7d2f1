//! Permutation generation, worker-thread throttling and progress reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::task::Task;

/// Once an all-fit solution exists, at most this many permutation threads are
/// spawned per material.
pub const MAX_PERMUTATIONS_WITH_SOLUTION: usize = 150;

/// All orderings of `items`, generated by recursive insertion of the head
/// element into every position of every tail permutation.
pub fn generate_permutations<T: Clone>(mut items: Vec<T>) -> Vec<Vec<T>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let head = items.remove(0);
    let mut out = Vec::new();
    for tail in generate_permutations(items) {
        for position in 0..=tail.len() {
            let mut permutation = tail.clone();
            permutation.insert(position, head.clone());
            out.push(permutation);
        }
    }
    out
}

/// Publishes per-material progress, combining elapsed time with the share of
/// spawned permutation threads.
pub struct ProgressTracker {
    task: Arc<Task>,
    material: String,
    total_permutations: usize,
    spawned: Arc<AtomicUsize>,
}

impl ProgressTracker {
    pub fn new(
        task: Arc<Task>,
        material: &str,
        total_permutations: usize,
        spawned: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            task,
            material: material.to_string(),
            total_permutations,
            spawned,
        }
    }

    /// Recomputes the material percentage. The spawn-share term keeps the
    /// original integer division, so it contributes in steps of 100.
    pub fn refresh(&self) {
        let total_threads = self.spawned.load(Ordering::Relaxed);
        let elapsed = self.task.elapsed_millis();
        let percentage = if self.task.has_solution_all_fit() {
            let time_share = (elapsed as f64 / 60_000.0 * 100.0) as i64;
            let denominator = MAX_PERMUTATIONS_WITH_SOLUTION
                .min(self.total_permutations)
                .max(1);
            let spawn_share = (total_threads.saturating_sub(1) / denominator * 100) as i64;
            time_share.max(spawn_share).min(100)
        } else {
            let time_share = (elapsed as f64 / 600_000.0 * 100.0) as i64;
            let denominator = self.total_permutations.max(1);
            let spawn_share = (total_threads.saturating_sub(1) / denominator * 100) as i64;
            time_share.max(spawn_share).min(100)
        };
        self.task
            .set_material_percentage_done(&self.material, percentage.max(0) as u8);
    }
}

/// Spawns permutation worker threads, blocking while too many are still
/// alive. Polls at `check_interval_ms`, refreshing the progress tracker on
/// every check.
pub struct PermutationThreadSpawner {
    threads: Vec<JoinHandle<()>>,
    max_alive: usize,
    check_interval_ms: u64,
    spawned: Arc<AtomicUsize>,
}

impl PermutationThreadSpawner {
    pub fn new() -> Self {
        Self {
            threads: Vec::new(),
            max_alive: 5,
            check_interval_ms: 1000,
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_limits(max_alive: usize, check_interval_ms: u64) -> Self {
        Self {
            max_alive: max_alive.max(1),
            check_interval_ms,
            ..Self::new()
        }
    }

    /// Shared spawn counter handed to [`ProgressTracker`].
    pub fn spawned_counter(&self) -> Arc<AtomicUsize> {
        self.spawned.clone()
    }

    pub fn spawn<F>(&mut self, body: F, progress: &ProgressTracker)
    where
        F: FnOnce() + Send + 'static,
    {
        while self.nbr_unfinished_threads() + 1 > self.max_alive {
            progress.refresh();
            std::thread::sleep(Duration::from_millis(self.check_interval_ms));
        }
        match std::thread::Builder::new()
            .name(format!("permutation-{}", self.spawned.load(Ordering::Relaxed)))
            .spawn(body)
        {
            Ok(handle) => {
                self.threads.push(handle);
                self.spawned.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => log::error!("failed to spawn permutation thread: {e}"),
        }
    }

    pub fn nbr_unfinished_threads(&self) -> usize {
        self.threads.iter().filter(|t| !t.is_finished()).count()
    }

    pub fn nbr_total_threads(&self) -> usize {
        self.threads.len()
    }
}

impl Default for PermutationThreadSpawner {
    fn default() -> Self {
        Self::new()
    }
}
