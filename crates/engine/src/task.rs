//! Task state shared between the driver, the workers and the watchdog.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use cutlist_core::{
    unix_millis, CalculationRequest, CalculationResponse, ClientInfo, Solution, Status,
    TileDimensions,
};

use crate::guard;
use crate::report;

/// Shared view of one executing or queued candidate-search worker.
///
/// The worker updates its own status and progress; the task and the watchdog
/// only read.
#[derive(Debug)]
pub struct WorkerHandle {
    material: String,
    group: &'static str,
    status: Mutex<Status>,
    percentage: AtomicU8,
}

impl WorkerHandle {
    pub fn new(material: &str, group: &'static str) -> Self {
        Self {
            material: material.to_string(),
            group,
            status: Mutex::new(Status::Queued),
            percentage: AtomicU8::new(0),
        }
    }

    pub fn material(&self) -> &str {
        &self.material
    }

    pub fn group(&self) -> &'static str {
        self.group
    }

    pub fn status(&self) -> Status {
        *guard(&self.status)
    }

    pub fn set_status(&self, status: Status) {
        *guard(&self.status) = status;
    }

    pub fn percentage(&self) -> u8 {
        self.percentage.load(Ordering::Relaxed)
    }

    pub fn set_percentage(&self, percentage: u8) {
        self.percentage.store(percentage, Ordering::Relaxed);
    }
}

/// One submitted optimization.
///
/// All mutable state lives behind locks or atomics; the task itself is held
/// in an `Arc` and shared by the service, the per-material drivers, every
/// worker and the watchdog.
pub struct Task {
    id: String,
    client_info: ClientInfo,
    request: CalculationRequest,
    factor: f64,
    start_time: u64,
    end_time: AtomicU64,
    last_queried: AtomicU64,
    status: Mutex<Status>,
    min_trim_influenced: AtomicBool,
    solutions: Mutex<HashMap<String, Arc<Mutex<Vec<Solution>>>>>,
    percent_done: Mutex<HashMap<String, u8>>,
    rankings: Mutex<HashMap<String, HashMap<&'static str, u32>>>,
    log: Mutex<String>,
    response: Mutex<Option<Arc<CalculationResponse>>>,
    workers: Mutex<Vec<Arc<WorkerHandle>>>,
    no_material_tiles: Mutex<Vec<TileDimensions>>,
    tiles_per_material: Mutex<HashMap<String, Vec<TileDimensions>>>,
}

impl Task {
    pub fn new(id: String, request: CalculationRequest, factor: f64) -> Self {
        let client_info = request.client_info.clone();
        Self {
            id,
            client_info,
            request,
            factor,
            start_time: unix_millis(),
            end_time: AtomicU64::new(0),
            last_queried: AtomicU64::new(unix_millis()),
            status: Mutex::new(Status::Idle),
            min_trim_influenced: AtomicBool::new(false),
            solutions: Mutex::new(HashMap::new()),
            percent_done: Mutex::new(HashMap::new()),
            rankings: Mutex::new(HashMap::new()),
            log: Mutex::new(String::new()),
            response: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            no_material_tiles: Mutex::new(Vec::new()),
            tiles_per_material: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client_info(&self) -> &ClientInfo {
        &self.client_info
    }

    pub fn request(&self) -> &CalculationRequest {
        &self.request
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn end_time(&self) -> u64 {
        self.end_time.load(Ordering::Acquire)
    }

    pub fn elapsed_millis(&self) -> u64 {
        let end = self.end_time();
        let end = if end == 0 { unix_millis() } else { end };
        end.saturating_sub(self.start_time)
    }

    pub fn last_queried(&self) -> u64 {
        self.last_queried.load(Ordering::Relaxed)
    }

    pub fn touch_last_queried(&self) {
        self.last_queried.store(unix_millis(), Ordering::Relaxed);
    }

    // ---- status ------------------------------------------------------------

    pub fn status(&self) -> Status {
        *guard(&self.status)
    }

    pub fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    /// Moves IDLE -> RUNNING. Any other source state is left untouched.
    pub fn set_running_status(&self) -> Result<(), Status> {
        let mut status = guard(&self.status);
        if *status != Status::Idle {
            return Err(*status);
        }
        *status = Status::Running;
        Ok(())
    }

    /// Client-requested stop; only valid from RUNNING.
    pub fn stop(&self) -> Result<(), Status> {
        self.end_time.store(unix_millis(), Ordering::Release);
        let mut status = guard(&self.status);
        if *status != Status::Running {
            return Err(*status);
        }
        *status = Status::Stopped;
        Ok(())
    }

    /// Watchdog- or service-requested termination; only valid from RUNNING.
    pub fn terminate(&self) -> Result<(), Status> {
        self.end_time.store(unix_millis(), Ordering::Release);
        let mut status = guard(&self.status);
        if *status != Status::Running {
            return Err(*status);
        }
        *status = Status::Terminated;
        Ok(())
    }

    /// Unconditional transition to ERROR.
    pub fn terminate_error(&self) {
        self.end_time.store(unix_millis(), Ordering::Release);
        *guard(&self.status) = Status::Error;
    }

    // ---- materials and beams ----------------------------------------------

    /// Registers one material for computation: an empty beam, a 0 % progress
    /// entry and an empty ranking table.
    pub fn add_material_to_compute(&self, material: &str) {
        guard(&self.solutions)
            .entry(material.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())));
        guard(&self.percent_done).insert(material.to_string(), 0);
        guard(&self.rankings).entry(material.to_string()).or_default();
    }

    /// The shared beam of one material.
    pub fn solutions(&self, material: &str) -> Option<Arc<Mutex<Vec<Solution>>>> {
        guard(&self.solutions).get(material).cloned()
    }

    pub fn materials(&self) -> Vec<String> {
        guard(&self.solutions).keys().cloned().collect()
    }

    pub fn set_tiles_per_material(&self, map: HashMap<String, Vec<TileDimensions>>) {
        *guard(&self.tiles_per_material) = map;
    }

    pub fn tiles_for_material(&self, material: &str) -> Vec<TileDimensions> {
        guard(&self.tiles_per_material)
            .get(material)
            .cloned()
            .unwrap_or_default()
    }

    pub fn add_no_material_tiles(&self, tiles: impl IntoIterator<Item = TileDimensions>) {
        guard(&self.no_material_tiles).extend(tiles);
    }

    pub fn no_material_tiles(&self) -> Vec<TileDimensions> {
        guard(&self.no_material_tiles).clone()
    }

    // ---- progress ----------------------------------------------------------

    /// Mean of the per-material percentages.
    pub fn percentage_done(&self) -> u8 {
        let map = guard(&self.percent_done);
        if map.is_empty() {
            return 0;
        }
        let sum: u32 = map.values().map(|&v| v as u32).sum();
        (sum / map.len() as u32) as u8
    }

    pub fn set_material_percentage_done(&self, material: &str, percentage: u8) {
        guard(&self.percent_done).insert(material.to_string(), percentage);
        if percentage == 100 {
            self.check_if_finished();
        }
    }

    /// Advances to FINISHED once every material reports 100 %, stamping the
    /// end time and building the response if none is cached yet.
    pub fn check_if_finished(&self) {
        {
            let status = guard(&self.status);
            if *status == Status::Finished {
                return;
            }
        }
        let complete = guard(&self.percent_done).values().all(|&v| v == 100);
        if !complete {
            return;
        }
        self.end_time.store(unix_millis(), Ordering::Release);
        *guard(&self.status) = Status::Finished;
        if guard(&self.response).is_none() {
            self.build_response();
        }
    }

    // ---- ranking -----------------------------------------------------------

    pub fn increment_thread_group_rankings(&self, material: &str, group: &'static str) {
        let mut rankings = guard(&self.rankings);
        *rankings
            .entry(material.to_string())
            .or_default()
            .entry(group)
            .or_insert(0) += 1;
    }

    pub fn thread_group_rankings(&self, material: &str) -> HashMap<&'static str, u32> {
        guard(&self.rankings).get(material).cloned().unwrap_or_default()
    }

    // ---- min-trim latch ----------------------------------------------------

    /// Monotonic latch: set when a candidate leaf was rejected only by the
    /// minimum trim constraint.
    pub fn set_min_trim_dimension_influenced(&self) {
        self.min_trim_influenced.store(true, Ordering::Relaxed);
    }

    pub fn is_min_trim_dimension_influenced(&self) -> bool {
        self.min_trim_influenced.load(Ordering::Relaxed)
    }

    // ---- log ---------------------------------------------------------------

    pub fn append_line_to_log(&self, line: &str) {
        let mut log = guard(&self.log);
        if !log.is_empty() {
            log.push('\n');
        }
        log.push_str(line);
    }

    pub fn log(&self) -> String {
        guard(&self.log).clone()
    }

    // ---- workers -----------------------------------------------------------

    pub fn add_worker(&self, handle: Arc<WorkerHandle>) {
        guard(&self.workers).push(handle);
    }

    pub fn owns_worker(&self, handle: &Arc<WorkerHandle>) -> bool {
        guard(&self.workers).iter().any(|w| Arc::ptr_eq(w, handle))
    }

    fn count_workers(&self, status: Status) -> usize {
        guard(&self.workers)
            .iter()
            .filter(|w| w.status() == status)
            .count()
    }

    pub fn nbr_running_threads(&self) -> usize {
        self.count_workers(Status::Running)
    }

    pub fn nbr_queued_threads(&self) -> usize {
        self.count_workers(Status::Queued)
    }

    pub fn nbr_error_threads(&self) -> usize {
        self.count_workers(Status::Error)
    }

    pub fn nbr_finished_threads_for_material(&self, material: &str) -> usize {
        guard(&self.workers)
            .iter()
            .filter(|w| w.status() == Status::Finished && w.material() == material)
            .count()
    }

    pub fn nbr_total_threads(&self) -> usize {
        guard(&self.workers).len()
    }

    /// Largest per-worker progress; the "initPercentage" early signal.
    pub fn max_thread_progress_percentage(&self) -> u8 {
        guard(&self.workers)
            .iter()
            .map(|w| w.percentage())
            .max()
            .unwrap_or(0)
    }

    // ---- response ----------------------------------------------------------

    /// Builds a fresh response from the current beams and replaces the cache.
    pub fn build_response(&self) {
        let response = Arc::new(report::build_response(self));
        *guard(&self.response) = Some(response);
    }

    pub fn response(&self) -> Option<Arc<CalculationResponse>> {
        guard(&self.response).clone()
    }

    pub fn has_solution(&self) -> bool {
        self.response().is_some_and(|r| r.has_panels())
    }

    /// True once the cached response places every demand panel.
    pub fn has_solution_all_fit(&self) -> bool {
        self.response().is_some_and(|r| r.is_all_fit())
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("percentage_done", &self.percentage_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutlist_core::{ClientInfo, Configuration};

    fn request() -> CalculationRequest {
        CalculationRequest {
            panels: vec![],
            stock_panels: vec![],
            configuration: Configuration::default(),
            client_info: ClientInfo::new("c1"),
        }
    }

    #[test]
    fn test_status_transitions() {
        let task = Task::new("t1".into(), request(), 1.0);
        assert_eq!(task.status(), Status::Idle);
        assert!(task.stop().is_err());
        assert!(task.set_running_status().is_ok());
        assert!(task.set_running_status().is_err());
        assert!(task.stop().is_ok());
        assert_eq!(task.status(), Status::Stopped);
        assert!(task.terminate().is_err());
    }

    #[test]
    fn test_percentage_average_and_finish() {
        let task = Task::new("t1".into(), request(), 1.0);
        task.add_material_to_compute("A");
        task.add_material_to_compute("B");
        task.set_running_status().unwrap();
        task.set_material_percentage_done("A", 100);
        assert_eq!(task.percentage_done(), 50);
        assert_eq!(task.status(), Status::Running);
        task.set_material_percentage_done("B", 100);
        assert_eq!(task.status(), Status::Finished);
        assert!(task.end_time() > 0);
    }

    #[test]
    fn test_worker_counting() {
        let task = Task::new("t1".into(), request(), 1.0);
        let a = Arc::new(WorkerHandle::new("A", "AREA"));
        let b = Arc::new(WorkerHandle::new("A", "AREA_HCUTS_1ST"));
        task.add_worker(a.clone());
        task.add_worker(b.clone());
        assert_eq!(task.nbr_queued_threads(), 2);
        a.set_status(Status::Running);
        a.set_percentage(40);
        b.set_status(Status::Finished);
        assert_eq!(task.nbr_running_threads(), 1);
        assert_eq!(task.nbr_finished_threads_for_material("A"), 1);
        assert_eq!(task.max_thread_progress_percentage(), 40);
    }

    #[test]
    fn test_ranking_increments() {
        let task = Task::new("t1".into(), request(), 1.0);
        task.add_material_to_compute("A");
        task.increment_thread_group_rankings("A", "AREA");
        task.increment_thread_group_rankings("A", "AREA");
        task.increment_thread_group_rankings("A", "AREA_VCUTS_1ST");
        let rankings = task.thread_group_rankings("A");
        assert_eq!(rankings["AREA"], 2);
        assert_eq!(rankings["AREA_VCUTS_1ST"], 1);
    }

    #[test]
    fn test_min_trim_latch_is_monotonic() {
        let task = Task::new("t1".into(), request(), 1.0);
        assert!(!task.is_min_trim_dimension_influenced());
        task.set_min_trim_dimension_influenced();
        task.set_min_trim_dimension_influenced();
        assert!(task.is_min_trim_dimension_influenced());
    }

    #[test]
    fn test_log_appends_lines() {
        let task = Task::new("t1".into(), request(), 1.0);
        task.append_line_to_log("first");
        task.append_line_to_log("second");
        assert_eq!(task.log(), "first\nsecond");
    }
}
