//! Error taxonomy for the cutlist engine.
//!
//! Five error families, one per subsystem, wrapped by the crate-wide
//! [`Error`] enum. Long-running components catch errors at their top frame
//! and convert them to an `ERROR` status plus a log line; these types exist
//! so that what gets logged (and what tests assert on) carries structured
//! context instead of a bare string.

use thiserror::Error;

/// Result alias used across both cutlist crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Low-level failures at the input boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid number {value:?}: {reason}")]
    NumberParse { value: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Task lifecycle failures.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(String),

    #[error("invalid task id {0:?}")]
    InvalidId(String),

    #[error("task {0} already exists")]
    Duplicate(String),

    #[error("task {task_id} is in state {status}, expected {expected}")]
    InvalidState {
        task_id: String,
        status: String,
        expected: String,
    },

    #[error("illegal status transition for task {task_id}: {from} -> {to}")]
    IllegalTransition {
        task_id: String,
        from: String,
        to: String,
    },

    #[error("request is missing client info")]
    MissingClientInfo,

    #[error("worker terminated: {0}")]
    WorkerTerminated(String),

    #[error("worker synchronization failed: {0}")]
    WorkerSync(String),

    #[error("worker error: {0}")]
    WorkerError(String),

    #[error("material mismatch: {0}")]
    MaterialMismatch(String),

    #[error("task lock poisoned: {0}")]
    Lock(String),
}

/// Failures inside the optimization computation itself.
#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("optimization failed: {0}")]
    OptimizationFailed(String),

    #[error("solution computation failed: {0}")]
    SolutionCompute(String),

    #[error("solution comparison failed: {0}")]
    SolutionCompare(String),

    #[error("node copy failed: node id {0}")]
    NodeCopy(u32),

    #[error("candidate search failed for {aux_info}: {reason}")]
    CandidateSearch { aux_info: String, reason: String },
}

/// Service-level failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("task {0} already exists")]
    TaskAlreadyExists(String),

    #[error("client {0} already has a running task")]
    ClientAlreadyHasTask(String),

    #[error("invalid client: {0}")]
    InvalidClient(String),

    #[error("service is shutting down")]
    ShuttingDown,

    #[error("maximum number of simultaneous tasks reached ({0})")]
    MaxTasksReached(usize),

    #[error("service not initialized")]
    NotInitialized,

    #[error("failed to acquire service lock: {0}")]
    LockFailed(String),

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("worker pool error: {0}")]
    Pool(String),

    #[error("initialization error: {0}")]
    Init(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("service lock poisoned: {0}")]
    Lock(String),
}

/// Stock-bundle generation failures.
#[derive(Debug, Error)]
pub enum StockError {
    #[error("no stock panels available")]
    NoStockTiles,

    #[error("no demand panels to fit")]
    NoTilesToFit,

    #[error("computation limit exceeded after {0} bundles")]
    ComputationLimitExceeded(usize),

    #[error("stock picker not initialized")]
    PickerNotInitialized,

    #[error("stock bundle generation interrupted")]
    GenerationInterrupted,

    #[error("no more stock bundles")]
    NoMoreBundles,

    #[error("stock picker thread failed: {0}")]
    PickerThread(String),
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error("task timed out after {0} ms")]
    TaskTimeout(u64),
}

impl Error {
    /// Whether retrying the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Core(CoreError::Io(_))
                | Error::TaskTimeout(_)
                | Error::Task(TaskError::WorkerError(_))
                | Error::Task(TaskError::WorkerSync(_))
                | Error::Service(ServiceError::ResourceUnavailable(_))
                | Error::Service(ServiceError::LockFailed(_))
                | Error::Service(ServiceError::MaxTasksReached(_))
                | Error::Stock(StockError::GenerationInterrupted)
                | Error::Stock(StockError::PickerThread(_))
        )
    }

    /// Whether the failure was caused by the client's input rather than the
    /// service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Core(CoreError::InvalidInput(_))
                | Error::Task(TaskError::NotFound(_))
                | Error::Task(TaskError::Duplicate(_))
                | Error::Task(TaskError::InvalidState { .. })
                | Error::Service(ServiceError::Validation(_))
                | Error::Service(ServiceError::InvalidClient(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::TaskTimeout(1000).is_retryable());
        assert!(Error::Stock(StockError::GenerationInterrupted).is_retryable());
        assert!(!Error::Stock(StockError::NoStockTiles).is_retryable());
        assert!(!Error::Computation(ComputationError::NodeCopy(3)).is_retryable());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::Task(TaskError::NotFound("t1".into())).is_client_error());
        assert!(Error::Core(CoreError::InvalidInput("bad".into())).is_client_error());
        assert!(!Error::Service(ServiceError::ShuttingDown).is_client_error());
    }

    #[test]
    fn test_display_carries_context() {
        let err = Error::Computation(ComputationError::CandidateSearch {
            aux_info: "stock[3] permutation[7]".into(),
            reason: "worker panicked".into(),
        });
        let text = err.to_string();
        assert!(text.contains("stock[3] permutation[7]"));
        assert!(text.contains("worker panicked"));
    }
}
