//! Calculation response DTOs.
//!
//! Flat, transport-ready projections of the internal solution, with every
//! coordinate scaled back to input units. The response builder in
//! `cutlist-engine` produces these.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cut::Cut;
use crate::node::TileNode;
use crate::request::{CalculationRequest, Edge};

/// Wire format version of [`CalculationResponse`].
pub const RESPONSE_VERSION: &str = "1.2";

/// Outcome codes of a task submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    InvalidTiles,
    InvalidStockTiles,
    TaskAlreadyRunning,
    ServerUnavailable,
    TooManyPanels,
    TooManyStockPanels,
}

impl StatusCode {
    /// Numeric wire value, transmitted as a string.
    pub fn string_value(&self) -> &'static str {
        match self {
            StatusCode::Ok => "0",
            StatusCode::InvalidTiles => "1",
            StatusCode::InvalidStockTiles => "2",
            StatusCode::TaskAlreadyRunning => "3",
            StatusCode::ServerUnavailable => "4",
            StatusCode::TooManyPanels => "5",
            StatusCode::TooManyStockPanels => "6",
        }
    }
}

/// Result of `submit_task`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CalculationSubmissionResult {
    pub status_code: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub task_id: Option<String>,
}

impl CalculationSubmissionResult {
    pub fn rejected(code: StatusCode) -> Self {
        Self {
            status_code: code.string_value().to_string(),
            task_id: None,
        }
    }

    pub fn accepted(task_id: String) -> Self {
        Self {
            status_code: StatusCode::Ok.string_value().to_string(),
            task_id: Some(task_id),
        }
    }
}

/// Snapshot returned by `get_task_status` and `stop_task`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TaskStatusResponse {
    pub status: String,
    pub percentage_done: u8,
    /// Largest per-worker progress, giving clients an early signal before the
    /// task-level percentage ticks.
    pub init_percentage: u8,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub solution: Option<CalculationResponse>,
}

/// One flattened tree node of a mosaic, in pre-order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ResponseTile {
    pub id: u32,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub request_obj_id: Option<i32>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientation: u8,
    pub has_children: bool,
    pub is_final: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_rotated: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub edge: Option<Edge>,
}

impl ResponseTile {
    pub fn from_node(node: &TileNode, factor: f64) -> Self {
        Self {
            id: node.id(),
            request_obj_id: node.external_id,
            x: node.x1() as f64 / factor,
            y: node.y1() as f64 / factor,
            width: node.width() as f64 / factor,
            height: node.height() as f64 / factor,
            label: None,
            orientation: 0,
            has_children: node.has_children(),
            is_final: node.is_final,
            is_rotated: node.is_rotated,
            edge: None,
        }
    }
}

/// One cut of a mosaic, scaled back to input units.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ResponseCut {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub original_width: f64,
    pub original_height: f64,
    pub is_horizontal: bool,
    pub cut_coord: f64,
    pub original_tile_id: u32,
    pub child1_tile_id: u32,
    pub child2_tile_id: u32,
}

impl ResponseCut {
    pub fn from_cut(cut: &Cut, factor: f64) -> Self {
        Self {
            x1: cut.x1 as f64 / factor,
            y1: cut.y1 as f64 / factor,
            x2: cut.x2 as f64 / factor,
            y2: cut.y2 as f64 / factor,
            original_width: cut.original_width as f64 / factor,
            original_height: cut.original_height as f64 / factor,
            is_horizontal: cut.is_horizontal,
            cut_coord: cut.cut_coord as f64 / factor,
            original_tile_id: cut.original_tile_id,
            child1_tile_id: cut.child1_tile_id,
            child2_tile_id: cut.child2_tile_id,
        }
    }
}

/// Per-panel aggregation (dimensions, label, count).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FinalTile {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub request_obj_id: Option<i32>,
    pub width: f64,
    pub height: f64,
    pub count: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
}

/// Aggregated demand panel that could not be placed.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct NoFitTile {
    pub id: i32,
    pub width: f64,
    pub height: f64,
    pub count: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub material: Option<String>,
}

/// One stock sheet of the final layout.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ResponseMosaic {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub request_stock_id: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stock_label: Option<String>,
    pub used_area: f64,
    pub wasted_area: f64,
    pub used_area_ratio: f64,
    pub nbr_final_panels: usize,
    pub nbr_wasted_panels: usize,
    pub cut_length: f64,
    /// `None` stands for the default material.
    #[cfg_attr(feature = "serde", serde(default))]
    pub material: Option<String>,
    pub panels: Vec<FinalTile>,
    pub tiles: Vec<ResponseTile>,
    pub cuts: Vec<ResponseCut>,
    pub edge_bands: HashMap<String, f64>,
}

/// The final calculation response.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CalculationResponse {
    pub version: String,
    pub id: String,
    pub task_id: String,
    pub elapsed_time: u64,
    /// Milliseconds from task start to the best solution, when one exists.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub solution_elapsed_time: Option<u64>,
    pub total_used_area: f64,
    pub total_wasted_area: f64,
    pub total_used_area_ratio: f64,
    pub total_nbr_cuts: usize,
    pub total_cut_length: f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub request: Option<CalculationRequest>,
    pub panels: Vec<FinalTile>,
    pub used_stock_panels: Vec<FinalTile>,
    pub no_fit_panels: Vec<NoFitTile>,
    pub mosaics: Vec<ResponseMosaic>,
    pub edge_bands: HashMap<String, f64>,
}

impl CalculationResponse {
    pub fn new(task_id: String) -> Self {
        Self {
            version: RESPONSE_VERSION.to_string(),
            id: String::new(),
            task_id,
            elapsed_time: 0,
            solution_elapsed_time: None,
            total_used_area: 0.0,
            total_wasted_area: 0.0,
            total_used_area_ratio: 0.0,
            total_nbr_cuts: 0,
            total_cut_length: 0.0,
            request: None,
            panels: Vec::new(),
            used_stock_panels: Vec::new(),
            no_fit_panels: Vec::new(),
            mosaics: Vec::new(),
            edge_bands: HashMap::new(),
        }
    }

    /// True when at least one demand panel was placed.
    pub fn has_panels(&self) -> bool {
        !self.panels.is_empty()
    }

    /// True when every demand panel found a place.
    pub fn is_all_fit(&self) -> bool {
        self.has_panels() && self.no_fit_panels.is_empty()
    }
}
