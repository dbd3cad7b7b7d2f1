//! # Cutlist Core
//!
//! Core types for the cutlist guillotine cutting-stock engine.
//!
//! This crate holds everything the search engine in `cutlist-engine` operates
//! on: the integer-rectangle geometry, the guillotine split tree, the mosaic
//! and solution aggregates, the stock bundle, the solution ranking keys, the
//! decimal scaling boundary and the request/response data-transfer types.
//!
//! ## Coordinate system
//!
//! All dimensions are integers. Decimal inputs are scaled by `10^d` on ingest
//! (where `d` is the maximum number of decimal places across the request,
//! capped so the total digit count stays within [`scale::MAX_ALLOWED_DIGITS`])
//! and scaled back on egress. See the [`scale`] module.
//!
//! ## Feature flags
//!
//! - `serde`: enable serialization/deserialization for the DTO types

pub mod bundle;
pub mod cut;
pub mod error;
pub mod mosaic;
pub mod node;
pub mod rank;
pub mod request;
pub mod response;
pub mod scale;
pub mod solution;
pub mod stats;
pub mod status;
pub mod tile;

// Re-exports
pub use bundle::StockBundle;
pub use cut::Cut;
pub use error::{ComputationError, CoreError, Error, Result, ServiceError, StockError, TaskError};
pub use mosaic::Mosaic;
pub use node::{Tile, TileNode};
pub use rank::{compare_chain, final_priority_list, OptimizationPriority};
pub use request::{
    CalculationRequest, ClientInfo, Configuration, Edge, Panel, PerformanceThresholds,
};
pub use response::{
    CalculationResponse, CalculationSubmissionResult, FinalTile, NoFitTile, ResponseCut,
    ResponseMosaic, ResponseTile, StatusCode, TaskStatusResponse,
};
pub use solution::{unix_millis, Solution};
pub use stats::{format_elapsed, Stats, TaskReport};
pub use status::Status;
pub use tile::{Grain, GroupedTileDimensions, TileDimensions, DEFAULT_MATERIAL};
