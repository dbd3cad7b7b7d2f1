//! Calculation request DTOs.
//!
//! The shapes a transport hands to the engine, independent of how they were
//! carried. Numeric sides arrive as decimal strings; the engine scales them
//! to integers on ingest (see [`crate::scale`]).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::tile::DEFAULT_MATERIAL;

fn default_material() -> String {
    DEFAULT_MATERIAL.to_string()
}

/// Edge-banding tags of one demand panel, one per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Edge {
    pub top: Option<String>,
    pub left: Option<String>,
    pub bottom: Option<String>,
    pub right: Option<String>,
}

/// One demand or stock panel line of a request.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Panel {
    pub id: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub width: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub height: Option<String>,
    pub count: u32,
    #[cfg_attr(feature = "serde", serde(default = "default_material"))]
    pub material: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientation: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub edge: Option<Edge>,
}

impl Panel {
    pub fn new(id: i32, width: &str, height: &str, count: u32) -> Self {
        Self {
            id,
            width: Some(width.to_string()),
            height: Some(height.to_string()),
            count,
            material: default_material(),
            orientation: 0,
            label: None,
            enabled: true,
            edge: None,
        }
    }

    pub fn with_material(mut self, material: &str) -> Self {
        self.material = material.to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edge = Some(edge);
        self
    }

    /// A panel takes part in the optimization only when enabled, counted and
    /// carrying parseable positive sides.
    pub fn is_valid(&self) -> bool {
        if !self.enabled || self.count == 0 {
            return false;
        }
        let positive = |v: &Option<String>| {
            v.as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|n| n > 0.0)
                .unwrap_or(false)
        };
        positive(&self.width) && positive(&self.height)
    }
}

/// Concurrency limits a client may attach to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PerformanceThresholds {
    pub max_simultaneous_threads: usize,
    pub thread_check_interval: u64,
    pub max_simultaneous_tasks: usize,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            max_simultaneous_threads: 5,
            thread_check_interval: 1000,
            max_simultaneous_tasks: 1,
        }
    }
}

/// Identity of the submitting client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ClientInfo {
    pub id: String,
}

impl ClientInfo {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

/// Engine configuration of one request.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Configuration {
    #[cfg_attr(feature = "serde", serde(default))]
    pub cut_thickness: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_trim_dimension: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub use_single_stock_unit: bool,
    pub optimization_factor: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub optimization_priority: i32,
    /// 0 = no preference, 1 = horizontal cuts first, 2 = vertical cuts first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cut_orientation_preference: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub consider_orientation: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub units: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub performance_thresholds: Option<PerformanceThresholds>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            cut_thickness: None,
            min_trim_dimension: None,
            use_single_stock_unit: false,
            optimization_factor: 1.0,
            optimization_priority: 0,
            cut_orientation_preference: 0,
            consider_orientation: false,
            units: None,
            performance_thresholds: None,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cut_thickness(mut self, value: &str) -> Self {
        self.cut_thickness = Some(value.to_string());
        self
    }

    pub fn with_min_trim_dimension(mut self, value: &str) -> Self {
        self.min_trim_dimension = Some(value.to_string());
        self
    }

    pub fn with_optimization_factor(mut self, factor: f64) -> Self {
        self.optimization_factor = factor;
        self
    }

    pub fn with_optimization_priority(mut self, priority: i32) -> Self {
        self.optimization_priority = priority;
        self
    }

    pub fn with_cut_orientation_preference(mut self, preference: u8) -> Self {
        self.cut_orientation_preference = preference;
        self
    }

    pub fn with_consider_orientation(mut self, consider: bool) -> Self {
        self.consider_orientation = consider;
        self
    }

    pub fn with_use_single_stock_unit(mut self, single: bool) -> Self {
        self.use_single_stock_unit = single;
        self
    }

    pub fn with_performance_thresholds(mut self, thresholds: PerformanceThresholds) -> Self {
        self.performance_thresholds = Some(thresholds);
        self
    }
}

/// A full calculation request.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CalculationRequest {
    pub panels: Vec<Panel>,
    pub stock_panels: Vec<Panel>,
    pub configuration: Configuration,
    pub client_info: ClientInfo,
}

impl CalculationRequest {
    /// Sum of counts over valid demand panels.
    pub fn nbr_valid_panels(&self) -> u32 {
        self.panels
            .iter()
            .filter(|p| p.is_valid())
            .map(|p| p.count)
            .sum()
    }

    /// Sum of counts over valid stock panels.
    pub fn nbr_valid_stock_panels(&self) -> u32 {
        self.stock_panels
            .iter()
            .filter(|p| p.is_valid())
            .map(|p| p.count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_validity() {
        assert!(Panel::new(1, "100", "50", 1).is_valid());
        assert!(!Panel::new(1, "100", "50", 0).is_valid());
        assert!(!Panel::new(1, "0", "50", 1).is_valid());
        assert!(!Panel::new(1, "abc", "50", 1).is_valid());
        let mut disabled = Panel::new(1, "100", "50", 1);
        disabled.enabled = false;
        assert!(!disabled.is_valid());
        let mut missing = Panel::new(1, "100", "50", 1);
        missing.height = None;
        assert!(!missing.is_valid());
    }

    #[test]
    fn test_valid_panel_counting() {
        let request = CalculationRequest {
            panels: vec![Panel::new(1, "10", "10", 3), Panel::new(2, "x", "10", 4)],
            stock_panels: vec![Panel::new(3, "100", "100", 2)],
            configuration: Configuration::default(),
            client_info: ClientInfo::new("c1"),
        };
        assert_eq!(request.nbr_valid_panels(), 3);
        assert_eq!(request.nbr_valid_stock_panels(), 2);
    }

    #[test]
    fn test_configuration_builder() {
        let cfg = Configuration::new()
            .with_cut_thickness("3")
            .with_optimization_factor(2.0)
            .with_cut_orientation_preference(1);
        assert_eq!(cfg.cut_thickness.as_deref(), Some("3"));
        assert_eq!(cfg.optimization_factor, 2.0);
        assert_eq!(cfg.cut_orientation_preference, 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_request_deserializes_from_camel_case() {
        let json = r#"{
            "panels": [{"id": 1, "width": "100", "height": "50", "count": 1, "enabled": true}],
            "stockPanels": [{"id": 2, "width": "100", "height": "50", "count": 1, "enabled": true}],
            "configuration": {"optimizationFactor": 1.0},
            "clientInfo": {"id": "client-1"}
        }"#;
        let request: CalculationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.panels[0].material, DEFAULT_MATERIAL);
        assert_eq!(request.client_info.id, "client-1");
    }
}
