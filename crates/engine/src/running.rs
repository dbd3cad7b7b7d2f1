//! Registry of live tasks and worker handles.

use std::sync::{Arc, Mutex};

use cutlist_core::Status;

use crate::guard;
use crate::task::{Task, WorkerHandle};

#[derive(Default)]
struct Registry {
    tasks: Vec<Arc<Task>>,
    workers: Vec<Arc<WorkerHandle>>,
    nbr_total_tasks: u64,
    archived_finished: u64,
    archived_stopped: u64,
    archived_terminated: u64,
    archived_error: u64,
}

/// Process state of one service instance: the live task list plus archived
/// terminal counters. Injectable, so tests construct fresh instances instead
/// of sharing a global.
#[derive(Default)]
pub struct RunningTasks {
    inner: Mutex<Registry>,
}

impl RunningTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task: Arc<Task>) {
        let mut inner = guard(&self.inner);
        inner.nbr_total_tasks += 1;
        inner.tasks.push(task);
    }

    pub fn get_task(&self, id: &str) -> Option<Arc<Task>> {
        guard(&self.inner)
            .tasks
            .iter()
            .find(|t| t.id() == id)
            .cloned()
    }

    /// Snapshot of the live task list.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        guard(&self.inner).tasks.clone()
    }

    pub fn nbr_total_tasks(&self) -> u64 {
        guard(&self.inner).nbr_total_tasks
    }

    /// Removes the given tasks, bumping the archived counter matching each
    /// task's terminal status.
    pub fn remove_tasks(&self, ids: &[String]) {
        let mut inner = guard(&self.inner);
        for id in ids {
            if let Some(pos) = inner.tasks.iter().position(|t| t.id() == id) {
                let task = inner.tasks.remove(pos);
                match task.status() {
                    Status::Finished => inner.archived_finished += 1,
                    Status::Stopped => inner.archived_stopped += 1,
                    Status::Terminated => inner.archived_terminated += 1,
                    Status::Error => inner.archived_error += 1,
                    _ => {}
                }
            }
        }
    }

    pub fn add_worker(&self, handle: Arc<WorkerHandle>) {
        guard(&self.inner).workers.push(handle);
    }

    pub fn remove_worker(&self, handle: &Arc<WorkerHandle>) {
        guard(&self.inner)
            .workers
            .retain(|w| !Arc::ptr_eq(w, handle));
    }

    pub fn workers(&self) -> Vec<Arc<WorkerHandle>> {
        guard(&self.inner).workers.clone()
    }

    /// Drops every worker handle the predicate rejects. Used by the watchdog
    /// to sweep handles whose task has been unregistered.
    pub fn retain_workers(&self, keep: impl Fn(&Arc<WorkerHandle>) -> bool) -> usize {
        let mut inner = guard(&self.inner);
        let before = inner.workers.len();
        inner.workers.retain(|w| keep(w));
        before - inner.workers.len()
    }

    fn count_tasks(&self, status: Status) -> u64 {
        guard(&self.inner)
            .tasks
            .iter()
            .filter(|t| t.status() == status)
            .count() as u64
    }

    pub fn nbr_idle_tasks(&self) -> u64 {
        self.count_tasks(Status::Idle)
    }

    pub fn nbr_running_tasks(&self) -> u64 {
        self.count_tasks(Status::Running)
    }

    pub fn nbr_finished_tasks(&self) -> u64 {
        self.count_tasks(Status::Finished) + guard(&self.inner).archived_finished
    }

    pub fn nbr_stopped_tasks(&self) -> u64 {
        self.count_tasks(Status::Stopped) + guard(&self.inner).archived_stopped
    }

    pub fn nbr_terminated_tasks(&self) -> u64 {
        self.count_tasks(Status::Terminated) + guard(&self.inner).archived_terminated
    }

    pub fn nbr_error_tasks(&self) -> u64 {
        self.count_tasks(Status::Error) + guard(&self.inner).archived_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutlist_core::{CalculationRequest, ClientInfo, Configuration};

    fn task(id: &str) -> Arc<Task> {
        Arc::new(Task::new(
            id.to_string(),
            CalculationRequest {
                panels: vec![],
                stock_panels: vec![],
                configuration: Configuration::default(),
                client_info: ClientInfo::new("c"),
            },
            1.0,
        ))
    }

    #[test]
    fn test_add_and_lookup() {
        let registry = RunningTasks::new();
        registry.add_task(task("a"));
        registry.add_task(task("b"));
        assert_eq!(registry.nbr_total_tasks(), 2);
        assert!(registry.get_task("a").is_some());
        assert!(registry.get_task("c").is_none());
    }

    #[test]
    fn test_remove_archives_by_status() {
        let registry = RunningTasks::new();
        let t = task("a");
        registry.add_task(t.clone());
        t.set_running_status().unwrap();
        t.stop().unwrap();
        registry.remove_tasks(&["a".to_string()]);
        assert!(registry.get_task("a").is_none());
        assert_eq!(registry.nbr_stopped_tasks(), 1);
        // total task counter is not decremented by removal
        assert_eq!(registry.nbr_total_tasks(), 1);
    }

    #[test]
    fn test_worker_sweep() {
        let registry = RunningTasks::new();
        let keep = Arc::new(WorkerHandle::new("A", "AREA"));
        let drop_me = Arc::new(WorkerHandle::new("B", "AREA"));
        registry.add_worker(keep.clone());
        registry.add_worker(drop_me);
        let removed = registry.retain_workers(|w| w.material() == "A");
        assert_eq!(removed, 1);
        assert_eq!(registry.workers().len(), 1);
    }
}
