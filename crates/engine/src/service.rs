//! Service facade: admission, task lifecycle and the per-material driver.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Local;

use cutlist_core::scale::{
    decimal_places, integer_places, resolve_factor, scale_or_zero, scale_value,
};
use cutlist_core::{
    final_priority_list, CalculationRequest, CalculationSubmissionResult, Configuration, Error,
    Grain, GroupedTileDimensions, OptimizationPriority, Panel, PerformanceThresholds, Solution,
    Stats, Status, StatusCode, StockBundle, TaskError, TaskStatusResponse, TileDimensions,
};

use crate::executor::TaskExecutor;
use crate::grouping;
use crate::guard;
use crate::permutation::{
    generate_permutations, PermutationThreadSpawner, ProgressTracker, MAX_PERMUTATIONS_WITH_SOLUTION,
};
use crate::running::RunningTasks;
use crate::stock::StockBundlePicker;
use crate::task::{Task, WorkerHandle};
use crate::watchdog::WatchDog;
use crate::worker::{CutDirection, CutListWorker};

/// Upper bound on demand or stock panel instances per request.
const MAX_PANEL_COUNT: u32 = 5000;

/// Upper bound on stock bundles tried per permutation.
const MAX_STOCK_ITERATIONS: usize = 1000;

/// Group permutations fully permute at most this many distinct sizes; the
/// remainder keeps its input order.
const MAX_PERMUTED_GROUPS: usize = 7;

/// The optimizer service. Construct one per process (or per test) with
/// [`init`](Self::init); tasks run on background threads and are observed
/// through [`get_task_status`](Self::get_task_status).
pub struct CutListOptimizerService {
    registry: Arc<RunningTasks>,
    executor: Arc<TaskExecutor>,
    watchdog: Arc<WatchDog>,
    watchdog_thread: Mutex<Option<JoinHandle<()>>>,
    allow_multiple_tasks_per_client: AtomicBool,
    task_id_counter: AtomicU64,
}

impl CutListOptimizerService {
    /// Builds the worker executor with `pool_size` threads and starts the
    /// watchdog.
    pub fn init(pool_size: usize) -> Self {
        let registry = Arc::new(RunningTasks::new());
        let executor = Arc::new(TaskExecutor::new(pool_size, registry.clone()));
        let watchdog = WatchDog::new(registry.clone(), executor.clone());
        let runner = watchdog.clone();
        let watchdog_thread = std::thread::Builder::new()
            .name("watchdog".to_string())
            .spawn(move || runner.run())
            .expect("failed to spawn watchdog thread");
        Self {
            registry,
            executor,
            watchdog,
            watchdog_thread: Mutex::new(Some(watchdog_thread)),
            allow_multiple_tasks_per_client: AtomicBool::new(false),
            task_id_counter: AtomicU64::new(0),
        }
    }

    pub fn set_allow_multiple_tasks_per_client(&self, allow: bool) {
        self.allow_multiple_tasks_per_client
            .store(allow, Ordering::Relaxed);
    }

    /// Validates and enqueues one request. Returns immediately; the actual
    /// computation runs on background threads.
    pub fn submit_task(&self, request: CalculationRequest) -> CalculationSubmissionResult {
        let nbr_panels = request.nbr_valid_panels();
        if nbr_panels == 0 {
            return CalculationSubmissionResult::rejected(StatusCode::InvalidTiles);
        }
        if nbr_panels > MAX_PANEL_COUNT {
            return CalculationSubmissionResult::rejected(StatusCode::TooManyPanels);
        }
        let nbr_stock = request.nbr_valid_stock_panels();
        if nbr_stock == 0 {
            return CalculationSubmissionResult::rejected(StatusCode::InvalidStockTiles);
        }
        if nbr_stock > MAX_PANEL_COUNT {
            return CalculationSubmissionResult::rejected(StatusCode::TooManyStockPanels);
        }
        if !self.allow_multiple_tasks_per_client.load(Ordering::Relaxed) {
            let thresholds = request
                .configuration
                .performance_thresholds
                .unwrap_or_default();
            let client_id = &request.client_info.id;
            let running = self
                .registry
                .tasks()
                .iter()
                .filter(|t| t.is_running() && &t.client_info().id == client_id)
                .count();
            if running >= thresholds.max_simultaneous_tasks {
                log::warn!(
                    "client [{client_id}]: rejecting task due to [{running}] already running task(s)"
                );
                return CalculationSubmissionResult::rejected(StatusCode::TaskAlreadyRunning);
            }
        }
        let task_id = format!(
            "{}{}",
            Local::now().format("%Y%m%d%H%M"),
            self.task_id_counter.fetch_add(1, Ordering::Relaxed)
        );
        let executor = self.executor.clone();
        let registry = self.registry.clone();
        let thread_task_id = task_id.clone();
        match std::thread::Builder::new()
            .name(format!("task-{task_id}"))
            .spawn(move || compute_task(executor, registry, request, thread_task_id))
        {
            Ok(_) => CalculationSubmissionResult::accepted(task_id),
            Err(e) => {
                log::error!("error submitting calculation request: {e}");
                CalculationSubmissionResult::rejected(StatusCode::ServerUnavailable)
            }
        }
    }

    /// Refreshes and returns the task's status snapshot. A read apart from
    /// the last-queried stamp the watchdog uses for orphan detection.
    pub fn get_task_status(&self, task_id: &str) -> Option<TaskStatusResponse> {
        let task = self.registry.get_task(task_id)?;
        task.build_response();
        task.touch_last_queried();
        Some(self.snapshot(&task))
    }

    /// Requests a cooperative stop; running workers exit after their current
    /// panel. On a non-running task this is a plain read.
    pub fn stop_task(&self, task_id: &str) -> Option<TaskStatusResponse> {
        let task = self.registry.get_task(task_id)?;
        if let Err(status) = task.stop() {
            log::warn!(
                "unable to stop task {}; current status is {status}",
                task.id()
            );
        }
        Some(self.snapshot(&task))
    }

    /// Terminates a running task.
    pub fn terminate_task(&self, task_id: &str) -> Result<(), Error> {
        let task = self
            .registry
            .get_task(task_id)
            .ok_or_else(|| Error::Task(TaskError::NotFound(task_id.to_string())))?;
        task.terminate().map_err(|status| {
            log::warn!("unable to terminate task {task_id}; current status is {status}");
            Error::Task(TaskError::InvalidState {
                task_id: task_id.to_string(),
                status: status.to_string(),
                expected: Status::Running.to_string(),
            })
        })
    }

    /// Ids of this client's tasks currently in the given status.
    pub fn get_tasks(&self, client_id: &str, status: Status) -> Vec<String> {
        self.registry
            .tasks()
            .iter()
            .filter(|t| t.status() == status && t.client_info().id == client_id)
            .map(|t| t.id().to_string())
            .collect()
    }

    pub fn get_stats(&self) -> Stats {
        Stats {
            nbr_idle_tasks: self.registry.nbr_idle_tasks(),
            nbr_running_tasks: self.registry.nbr_running_tasks(),
            nbr_finished_tasks: self.registry.nbr_finished_tasks(),
            nbr_stopped_tasks: self.registry.nbr_stopped_tasks(),
            nbr_terminated_tasks: self.registry.nbr_terminated_tasks(),
            nbr_error_tasks: self.registry.nbr_error_tasks(),
            nbr_running_threads: self.executor.active_count(),
            nbr_queued_threads: self.executor.queued_count(),
            nbr_finished_threads: self.executor.completed_count(),
            task_reports: self.watchdog.task_reports(),
        }
    }

    /// Stops the watchdog and the executor pool. Detached task threads wind
    /// down on their own once their task leaves RUNNING.
    pub fn shutdown(&self) {
        self.watchdog.request_stop();
        if let Some(handle) = guard(&self.watchdog_thread).take() {
            let _ = handle.join();
        }
        self.executor.shutdown();
    }

    fn snapshot(&self, task: &Arc<Task>) -> TaskStatusResponse {
        TaskStatusResponse {
            status: task.status().to_string(),
            percentage_done: task.percentage_done(),
            init_percentage: task.max_thread_progress_percentage(),
            solution: task.response().map(|r| (*r).clone()),
        }
    }
}

impl Drop for CutListOptimizerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---- task driver -----------------------------------------------------------

fn max_decimal_places(panels: &[Panel]) -> usize {
    panels
        .iter()
        .filter(|p| p.is_valid())
        .map(|p| decimal_places(p.width.as_deref()).max(decimal_places(p.height.as_deref())))
        .max()
        .unwrap_or(0)
}

fn max_integer_places(panels: &[Panel]) -> usize {
    panels
        .iter()
        .filter(|p| p.is_valid())
        .map(|p| integer_places(p.width.as_deref()).max(integer_places(p.height.as_deref())))
        .max()
        .unwrap_or(0)
}

fn expand_panels(panels: &[Panel], factor: f64) -> Vec<TileDimensions> {
    let mut tiles = Vec::new();
    for panel in panels.iter().filter(|p| p.is_valid()) {
        let (width, height) = match (
            scale_value(panel.width.as_deref().unwrap_or_default(), factor),
            scale_value(panel.height.as_deref().unwrap_or_default(), factor),
        ) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                log::error!("error scaling panel {}", panel.id);
                continue;
            }
        };
        for _ in 0..panel.count {
            tiles.push(TileDimensions::new(
                panel.id,
                width,
                height,
                panel.material.clone(),
                Grain::from_code(panel.orientation),
                panel.label.clone(),
            ));
        }
    }
    tiles
}

fn partition_by_material(tiles: Vec<TileDimensions>) -> HashMap<String, Vec<TileDimensions>> {
    let mut map: HashMap<String, Vec<TileDimensions>> = HashMap::new();
    for tile in tiles {
        map.entry(tile.material.clone()).or_default().push(tile);
    }
    map
}

/// Body of the per-task driver thread: scales the request, partitions the
/// panels by material and fans one driver thread out per material.
fn compute_task(
    executor: Arc<TaskExecutor>,
    registry: Arc<RunningTasks>,
    request: CalculationRequest,
    task_id: String,
) {
    let configuration = &request.configuration;
    let max_decimal = max_decimal_places(&request.panels)
        .max(max_decimal_places(&request.stock_panels))
        .max(decimal_places(configuration.cut_thickness.as_deref()))
        .max(decimal_places(configuration.min_trim_dimension.as_deref()));
    let max_integer = max_integer_places(&request.panels)
        .max(max_integer_places(&request.stock_panels))
        .max(integer_places(configuration.cut_thickness.as_deref()))
        .max(integer_places(configuration.min_trim_dimension.as_deref()));
    let (factor, clamped) = resolve_factor(max_decimal, max_integer);
    if clamped {
        log::warn!(
            "task[{task_id}] maximum allowed digits exceeded: decimalPlaces[{max_decimal}] integerPlaces[{max_integer}]"
        );
    }

    let tiles = expand_panels(&request.panels, factor);
    let stock_tiles = expand_panels(&request.stock_panels, factor);

    let task = Arc::new(Task::new(task_id, request.clone(), factor));
    task.build_response();
    registry.add_task(task.clone());

    let tiles_per_material = partition_by_material(tiles);
    let stock_per_material = partition_by_material(stock_tiles);
    task.set_tiles_per_material(tiles_per_material.clone());

    let materials: HashSet<&String> = tiles_per_material
        .keys()
        .chain(stock_per_material.keys())
        .collect();
    for material in &materials {
        match (
            tiles_per_material.get(*material),
            stock_per_material.get(*material),
        ) {
            (Some(_), Some(_)) => task.add_material_to_compute(material.as_str()),
            (Some(demand), None) => task.add_no_material_tiles(demand.iter().cloned()),
            _ => {}
        }
    }

    for material in materials {
        let (Some(demand), Some(stock)) = (
            tiles_per_material.get(material),
            stock_per_material.get(material),
        ) else {
            continue;
        };
        let executor = executor.clone();
        let registry = registry.clone();
        let task = task.clone();
        let demand = demand.clone();
        let stock = stock.clone();
        let configuration = request.configuration.clone();
        let material = material.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("material-{material}"))
            .spawn(move || {
                compute_material(executor, registry, demand, stock, configuration, task, material)
            });
        if let Err(e) = spawned {
            log::error!("failed to spawn material driver thread: {e}");
        }
    }
    task.check_if_finished();
}

/// Everything a permutation thread needs to run its stock loop.
struct MaterialContext {
    executor: Arc<TaskExecutor>,
    registry: Arc<RunningTasks>,
    picker: StockBundlePicker,
    task: Arc<Task>,
    solutions: Arc<Mutex<Vec<Solution>>>,
    material: String,
    priorities: Vec<OptimizationPriority>,
    thresholds: PerformanceThresholds,
    consider_grain: bool,
    cut_orientation_preference: u8,
    cut_thickness: u32,
    min_trim_dimension: u32,
    accuracy: usize,
    total_permutations: usize,
    tracker: ProgressTracker,
}

/// Per-material driver: grouping, permutations, stock picker, spawn loop,
/// drain, completion.
fn compute_material(
    executor: Arc<TaskExecutor>,
    registry: Arc<RunningTasks>,
    tiles: Vec<TileDimensions>,
    stock: Vec<TileDimensions>,
    configuration: Configuration,
    task: Arc<Task>,
    material: String,
) {
    let thresholds = configuration.performance_thresholds.unwrap_or_else(|| {
        log::warn!("task[{}] no performance thresholds specified", task.id());
        PerformanceThresholds::default()
    });
    let Some(solutions) = task.solutions(&material) else {
        log::error!(
            "task[{}] material [{material}] was never registered",
            task.id()
        );
        return;
    };

    let groups = grouping::generate_groups(&tiles, &stock, task.id());
    let mut distinct: Vec<GroupedTileDimensions> = Vec::new();
    for group in &groups {
        if !distinct.contains(group) {
            distinct.push(group.clone());
        }
    }
    log::debug!(
        "task[{}] calculating permutations over [{}] distinct groups",
        task.id(),
        distinct.len()
    );
    distinct.sort_by_key(|g| std::cmp::Reverse(g.area()));
    let tail = if distinct.len() > MAX_PERMUTED_GROUPS {
        distinct.split_off(MAX_PERMUTED_GROUPS)
    } else {
        Vec::new()
    };
    let mut group_permutations = generate_permutations(distinct);
    for permutation in &mut group_permutations {
        permutation.extend(tail.iter().cloned());
    }

    log::debug!("task[{}] sorting tiles according to permutations", task.id());
    let mut permutations: Vec<Vec<TileDimensions>> = Vec::with_capacity(group_permutations.len());
    for group_permutation in &group_permutations {
        let rank: HashMap<&GroupedTileDimensions, usize> = group_permutation
            .iter()
            .enumerate()
            .map(|(position, group)| (group, position))
            .collect();
        let mut ordered = groups.clone();
        ordered.sort_by_key(|g| rank.get(g).copied().unwrap_or(usize::MAX));
        permutations.push(ordered.into_iter().map(|g| g.dims).collect());
    }
    let mut seen_sequences = HashSet::new();
    permutations.retain(|permutation| {
        let mut hash = 0u64;
        for tile in permutation {
            hash = hash.wrapping_mul(31).wrapping_add(tile.dimensions_hash());
        }
        seen_sequences.insert(hash)
    });

    if let Err(status) = task.set_running_status() {
        log::debug!(
            "task[{}] not moving to RUNNING from status {status}",
            task.id()
        );
    }

    let picker = StockBundlePicker::new(
        &tiles,
        stock,
        task.clone(),
        configuration.use_single_stock_unit.then_some(1),
    );
    if let Err(e) = picker.init() {
        log::error!("task[{}] stock picker failed to start: {e}", task.id());
        return;
    }

    let mut accuracy = if configuration.optimization_factor > 0.0 {
        (100.0 * configuration.optimization_factor) as usize
    } else {
        100
    };
    if tiles.len() > 100 {
        accuracy = (accuracy as f64 * (0.5 / (tiles.len() / 100) as f64)) as usize;
        log::info!(
            "task[{}] limiting solution pool elements to [{accuracy}]",
            task.id()
        );
    }

    let mut spawner = PermutationThreadSpawner::with_limits(
        thresholds.max_simultaneous_threads,
        thresholds.thread_check_interval,
    );
    let cut_thickness = scale_or_zero(configuration.cut_thickness.as_deref(), task.factor());
    let min_trim_dimension =
        scale_or_zero(configuration.min_trim_dimension.as_deref(), task.factor());
    let context = Arc::new(MaterialContext {
        executor,
        registry,
        picker,
        task: task.clone(),
        solutions,
        material: material.clone(),
        priorities: final_priority_list(&configuration),
        thresholds,
        consider_grain: configuration.consider_orientation,
        cut_orientation_preference: configuration.cut_orientation_preference,
        cut_thickness,
        min_trim_dimension,
        accuracy,
        total_permutations: permutations.len(),
        tracker: ProgressTracker::new(
            task.clone(),
            &material,
            permutations.len(),
            spawner.spawned_counter(),
        ),
    });

    for (permutation_index, permutation) in permutations.into_iter().enumerate() {
        if !task.is_running() {
            log::debug!(
                "task[{}] no longer running; stopping permutation spawner at idx[{permutation_index}]",
                task.id()
            );
            break;
        }
        if task.has_solution_all_fit()
            && spawner.nbr_total_threads() > MAX_PERMUTATIONS_WITH_SOLUTION
        {
            task.set_material_percentage_done(&material, 100);
            log::debug!(
                "task[{}] has a solution and spawned the maximum permutation threads",
                task.id()
            );
            break;
        }
        let thread_context = context.clone();
        spawner.spawn(
            move || stock_loop(&thread_context, &permutation, permutation_index),
            &context.tracker,
        );
    }

    loop {
        std::thread::sleep(Duration::from_secs(1));
        let unfinished = spawner.nbr_unfinished_threads();
        let running = task.nbr_running_threads();
        let queued = task.nbr_queued_threads();
        log::debug!(
            "task[{}] waiting for spawner[{unfinished}] queued[{queued}] running[{running}]",
            task.id()
        );
        if unfinished == 0 && running + queued == 0 {
            break;
        }
    }
    context.picker.stop();
    if task.status() == Status::Running {
        task.set_material_percentage_done(&material, 100);
    }
}

/// Body of one permutation thread: walks the stock bundles in ascending
/// area order and submits up to three policy workers per bundle.
fn stock_loop(context: &MaterialContext, permutation: &[TileDimensions], permutation_index: usize) {
    for bundle_index in 0..MAX_STOCK_ITERATIONS {
        let bundle = match context.picker.get_bundle(bundle_index) {
            Ok(Some(bundle)) => bundle,
            Ok(None) => {
                log::debug!(
                    "no more possible stock bundles: bundle[{bundle_index}] permutation[{permutation_index}]"
                );
                return;
            }
            Err(e) => {
                log::error!("stock picker failed: {e}");
                return;
            }
        };
        if !context.task.is_running() {
            log::debug!(
                "task no longer running; stopping stock loop for permutation[{permutation_index}]"
            );
            return;
        }
        let already_covered = context.task.has_solution_all_fit() && {
            let beam = guard(&context.solutions);
            beam.first()
                .is_some_and(|s| s.nbr_mosaics() == 1 && s.total_area() < bundle.total_area())
        };
        if already_covered {
            log::debug!(
                "skipping bundle[{bundle_index}] for permutation[{permutation_index}]: an all-fit solution uses a smaller sheet"
            );
            continue;
        }
        log::debug!(
            "starting permutation[{permutation_index}/{}] with bundle[{bundle_index}] {{nbrPanels[{}] area[{}] {}}}",
            context.total_permutations,
            bundle.len(),
            bundle.total_area(),
            bundle.to_string_grouped()
        );
        while context.task.nbr_running_threads() + context.task.nbr_queued_threads()
            >= context.thresholds.max_simultaneous_threads
        {
            log::trace!(
                "maximum number of active threads per task reached: running[{}] queued[{}]",
                context.task.nbr_running_threads(),
                context.task.nbr_queued_threads()
            );
            context.tracker.refresh();
            std::thread::sleep(Duration::from_millis(context.thresholds.thread_check_interval));
        }
        let preference = context.cut_orientation_preference;
        let policies: [(&'static str, CutDirection, bool); 3] = [
            ("AREA", CutDirection::Both, preference == 0),
            (
                "AREA_HCUTS_1ST",
                CutDirection::Horizontal,
                preference == 0 || preference == 1,
            ),
            (
                "AREA_VCUTS_1ST",
                CutDirection::Vertical,
                preference == 0 || preference == 2,
            ),
        ];
        for (group, direction, allowed) in policies {
            if !allowed || !is_thread_eligible(group, &context.task, &context.material) {
                continue;
            }
            submit_worker(
                context,
                permutation,
                &bundle,
                group,
                direction,
                bundle_index,
                permutation_index,
            );
        }
    }
}

fn submit_worker(
    context: &MaterialContext,
    permutation: &[TileDimensions],
    bundle: &StockBundle,
    group: &'static str,
    direction: CutDirection,
    bundle_index: usize,
    permutation_index: usize,
) {
    let handle = Arc::new(WorkerHandle::new(&context.material, group));
    context.task.add_worker(handle.clone());
    context.registry.add_worker(handle.clone());
    context.executor.execute(CutListWorker {
        tiles: permutation.to_vec(),
        bundle: bundle.clone(),
        first_cut: direction,
        cut_thickness: context.cut_thickness,
        min_trim_dimension: context.min_trim_dimension,
        consider_grain: context.consider_grain,
        thread_comparators: context.priorities.clone(),
        final_comparators: context.priorities.clone(),
        all_solutions: context.solutions.clone(),
        accuracy: context.accuracy,
        task: context.task.clone(),
        handle,
        aux_info: format!("stock[{bundle_index}] permutation[{permutation_index}]"),
    });
}

/// Worker groups that keep underperforming after the warm-up are pruned:
/// a group stays eligible while fewer than 10 of the material's workers
/// finished, and afterwards only while it holds more than a fifth of the
/// material's top-5 ranking points.
fn is_thread_eligible(group: &str, task: &Arc<Task>, material: &str) -> bool {
    let rankings = task.thread_group_rankings(material);
    if task.nbr_finished_threads_for_material(material) < 10 {
        return true;
    }
    let total: u32 = rankings.values().sum();
    rankings.get(group).copied().unwrap_or(0) > total / 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutlist_core::ClientInfo;

    fn request(panels: Vec<Panel>, stock: Vec<Panel>) -> CalculationRequest {
        CalculationRequest {
            panels,
            stock_panels: stock,
            configuration: Configuration::default(),
            client_info: ClientInfo::new("client-1"),
        }
    }

    #[test]
    fn test_submission_rejects_empty_demand() {
        let service = CutListOptimizerService::init(1);
        let result = service.submit_task(request(vec![], vec![Panel::new(1, "10", "10", 1)]));
        assert_eq!(result.status_code, "1");
        assert!(result.task_id.is_none());
    }

    #[test]
    fn test_submission_rejects_empty_stock() {
        let service = CutListOptimizerService::init(1);
        let result = service.submit_task(request(vec![Panel::new(1, "10", "10", 1)], vec![]));
        assert_eq!(result.status_code, "2");
    }

    #[test]
    fn test_submission_rejects_too_many_panels() {
        let service = CutListOptimizerService::init(1);
        // 5000 accepted means only the 5001st unit tips the request over
        let result = service.submit_task(request(
            vec![Panel::new(1, "10", "10", 5001)],
            vec![Panel::new(2, "100", "100", 1)],
        ));
        assert_eq!(result.status_code, "5");
        let result = service.submit_task(request(
            vec![Panel::new(1, "10", "10", 1)],
            vec![Panel::new(2, "100", "100", 5001)],
        ));
        assert_eq!(result.status_code, "6");
    }

    #[test]
    fn test_unknown_task_lookups() {
        let service = CutListOptimizerService::init(1);
        assert!(service.get_task_status("nope").is_none());
        assert!(service.stop_task("nope").is_none());
        assert!(service.terminate_task("nope").is_err());
    }

    #[test]
    fn test_expand_panels_multiplies_counts() {
        let tiles = expand_panels(&[Panel::new(1, "10.5", "20", 3)], 10.0);
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].width, 105);
        assert_eq!(tiles[0].height, 200);
    }

    #[test]
    fn test_eligibility_warm_up_is_permissive() {
        let task = Arc::new(Task::new(
            "t".into(),
            request(vec![], vec![]),
            1.0,
        ));
        task.add_material_to_compute("M");
        assert!(is_thread_eligible("AREA", &task, "M"));
    }
}
