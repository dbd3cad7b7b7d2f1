//! # Cutlist Engine
//!
//! Long-running task service around the guillotine cutting-stock optimizer.
//!
//! Clients submit a [`CalculationRequest`](cutlist_core::CalculationRequest)
//! through [`CutListOptimizerService::submit_task`]; the service partitions
//! the work by material, fans candidate-search workers across a bounded
//! executor, watches every task with a dedicated watchdog thread, and caches
//! a [`CalculationResponse`](cutlist_core::CalculationResponse) once the
//! search settles.
//!
//! ```no_run
//! use cutlist_core::{CalculationRequest, ClientInfo, Configuration, Panel};
//! use cutlist_engine::CutListOptimizerService;
//!
//! let service = CutListOptimizerService::init(4);
//! let request = CalculationRequest {
//!     panels: vec![Panel::new(1, "600", "400", 4)],
//!     stock_panels: vec![Panel::new(10, "2440", "1220", 2)],
//!     configuration: Configuration::default(),
//!     client_info: ClientInfo::new("client-1"),
//! };
//! let submission = service.submit_task(request);
//! if let Some(task_id) = submission.task_id {
//!     let status = service.get_task_status(&task_id);
//!     println!("{:?}", status.map(|s| s.status));
//! }
//! ```

pub mod executor;
pub mod grouping;
pub mod permutation;
pub mod report;
pub mod running;
pub mod service;
pub mod stock;
pub mod task;
pub mod watchdog;
pub mod worker;

pub use executor::TaskExecutor;
pub use permutation::{generate_permutations, PermutationThreadSpawner, ProgressTracker};
pub use running::RunningTasks;
pub use service::CutListOptimizerService;
pub use stock::{StockBundleGenerator, StockBundlePicker};
pub use task::{Task, WorkerHandle};
pub use watchdog::WatchDog;
pub use worker::{CutDirection, CutListWorker};

use std::sync::{Mutex, MutexGuard};

/// Locks a mutex, recovering the inner value if a worker panicked while
/// holding it. Beams and status cells stay structurally valid across
/// panics, so continuing with the recovered guard is always safe here.
pub(crate) fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
