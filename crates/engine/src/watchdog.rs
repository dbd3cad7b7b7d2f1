//! Task supervision.
//!
//! The watchdog runs on its own thread in a 5-second loop: it reports on
//! every registered task, terminates tasks whose workers all errored, and
//! applies the TTL cleanup pass (finished tasks past their retention, tasks
//! running too long, tasks with a solution nobody collects, tasks whose
//! client went silent).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cutlist_core::{format_elapsed, unix_millis, Status, TaskReport};

use crate::executor::TaskExecutor;
use crate::guard;
use crate::running::RunningTasks;
use crate::task::Task;

const RUNNING_INTERVAL_MS: u64 = 5000;
const FINISHED_TASK_TTL_MS: u64 = 60_000;
const LONG_RUNNING_TASK_TTL_MS: u64 = 600_000;
const LONG_RUNNING_TASK_WITH_SOLUTION_TTL_MS: u64 = 60_000;
const ORPHAN_TASK_TTL_MS: u64 = 60_000;
const TASK_ERROR_THREAD_THRESHOLD: usize = 100;

pub struct WatchDog {
    registry: Arc<RunningTasks>,
    executor: Arc<TaskExecutor>,
    reports: Mutex<Vec<TaskReport>>,
    stop: AtomicBool,
}

impl WatchDog {
    pub fn new(registry: Arc<RunningTasks>, executor: Arc<TaskExecutor>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            executor,
            reports: Mutex::new(Vec::new()),
            stop: AtomicBool::new(false),
        })
    }

    pub fn task_reports(&self) -> Vec<TaskReport> {
        guard(&self.reports).clone()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// The watchdog loop; blocks until [`request_stop`](Self::request_stop).
    pub fn run(self: Arc<Self>) {
        while !self.stop.load(Ordering::Acquire) {
            self.observe();
            // sleep in slices so a stop request is honored promptly
            let mut slept = 0;
            while slept < RUNNING_INTERVAL_MS && !self.stop.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(250));
                slept += 250;
            }
            self.clean_tasks();
        }
    }

    fn observe(&self) {
        log::debug!(
            "tasks: active[{}] total[{}] - threads: active[{}/{}] queued[{}] completed[{}]",
            self.registry.tasks().len(),
            self.registry.nbr_total_tasks(),
            self.executor.active_count(),
            self.executor.pool_size(),
            self.executor.queued_count(),
            self.executor.completed_count()
        );
        let mut reports = Vec::new();
        for task in self.registry.tasks() {
            let report = TaskReport {
                task_id: task.id().to_string(),
                client_id: task.client_info().id.clone(),
                status: task.status().to_string(),
                nbr_running_threads: task.nbr_running_threads(),
                nbr_queued_threads: task.nbr_queued_threads(),
                nbr_total_threads: task.nbr_total_threads(),
                nbr_panels: task.request().panels.len(),
                percentage_done: task.percentage_done(),
                elapsed_time: format_elapsed(task.elapsed_millis()),
            };
            log::info!(
                "task[{}] {} - threads: R[{}] Q[{}] T[{}] - panels[{}] done[{}%] elapsed[{}]",
                report.task_id,
                report.status,
                report.nbr_running_threads,
                report.nbr_queued_threads,
                report.nbr_total_threads,
                report.nbr_panels,
                report.percentage_done,
                report.elapsed_time
            );
            reports.push(report);
            if task.is_running()
                && task.nbr_error_threads() > TASK_ERROR_THREAD_THRESHOLD
                && task.nbr_error_threads() == task.nbr_total_threads()
            {
                log::error!("task {}: error thread threshold reached", task.id());
                task.terminate_error();
            }
        }
        *guard(&self.reports) = reports;
    }

    fn clean_tasks(&self) {
        log::debug!("cleaning finished tasks");
        let now = unix_millis();
        let mut expired: Vec<String> = Vec::new();
        for task in self.registry.tasks() {
            if task.status().is_terminal()
                && now.saturating_sub(task.end_time()) > FINISHED_TASK_TTL_MS
            {
                expired.push(task.id().to_string());
            }
            if task.status() == Status::Running
                && task.elapsed_millis() > LONG_RUNNING_TASK_WITH_SOLUTION_TTL_MS
                && task.has_solution_all_fit()
            {
                self.terminate(&task, "task with solution has been running for more than 1m");
            }
            if task.status() == Status::Running && task.elapsed_millis() > LONG_RUNNING_TASK_TTL_MS
            {
                self.terminate(&task, "task has been running for more than 10m");
            }
            if task.status() == Status::Running
                && now.saturating_sub(task.last_queried()) > ORPHAN_TASK_TTL_MS
            {
                self.terminate(&task, "task status was not queried for more than 1m");
            }
        }
        self.registry.remove_tasks(&expired);
        log::trace!("cleared {} tasks", expired.len());

        // drop worker handles whose task has been unregistered
        let live_tasks = self.registry.tasks();
        let removed = self
            .registry
            .retain_workers(|worker| live_tasks.iter().any(|task| task.owns_worker(worker)));
        log::trace!("cleared {removed} worker handles");
    }

    fn terminate(&self, task: &Arc<Task>, reason: &str) {
        log::warn!("task {} will be terminated: {reason}", task.id());
        task.append_line_to_log(&format!("{reason} and will be terminated"));
        if task.terminate().is_err() {
            log::error!("unable to terminate task {}", task.id());
        }
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
    fn test_observe_builds_reports() {
        let registry = Arc::new(RunningTasks::new());
        let executor = Arc::new(TaskExecutor::with_capacity(1, 4, registry.clone()));
        let watchdog = WatchDog::new(registry.clone(), executor.clone());
        registry.add_task(task("t1"));
        watchdog.observe();
        let reports = watchdog.task_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].task_id, "t1");
        assert_eq!(reports[0].status, "IDLE");
        executor.shutdown();
    }

    #[test]
    fn test_clean_removes_expired_terminal_tasks() {
        let registry = Arc::new(RunningTasks::new());
        let executor = Arc::new(TaskExecutor::with_capacity(1, 4, registry.clone()));
        let watchdog = WatchDog::new(registry.clone(), executor.clone());
        let t = task("t1");
        t.set_running_status().unwrap();
        t.stop().unwrap();
        registry.add_task(t);
        // fresh terminal task survives the pass
        watchdog.clean_tasks();
        assert!(registry.get_task("t1").is_some());
        executor.shutdown();
    }
}
