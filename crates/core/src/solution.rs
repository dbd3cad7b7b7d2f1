//! Candidate layouts.
//!
//! A [`Solution`] is one candidate final layout: a list of mosaics (kept
//! sorted ascending by unused area), the queue of bundle sheets not yet
//! opened, and the panels that could not be placed anywhere. Every copy
//! receives a fresh id from a process-wide counter so beam bookkeeping can
//! tell lineages apart.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bundle::StockBundle;
use crate::mosaic::Mosaic;
use crate::node::TileNode;
use crate::tile::TileDimensions;

static NEXT_SOLUTION_ID: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since the Unix epoch. Shared clock helper for solution
/// timestamps and task lifecycle bookkeeping.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug)]
pub struct Solution {
    id: u64,
    timestamp: u64,
    pub mosaics: Vec<Mosaic>,
    pub unused_stock_panels: VecDeque<TileDimensions>,
    pub no_fit_panels: Vec<TileDimensions>,
    pub creator_thread_group: Option<&'static str>,
    pub aux_info: Option<String>,
}

impl Solution {
    pub fn new() -> Self {
        Self {
            id: NEXT_SOLUTION_ID.fetch_add(1, Ordering::Relaxed),
            timestamp: unix_millis(),
            mosaics: Vec::new(),
            unused_stock_panels: VecDeque::new(),
            no_fit_panels: Vec::new(),
            creator_thread_group: None,
            aux_info: None,
        }
    }

    /// Seeds a solution from a stock bundle: the first sheet becomes an open
    /// mosaic, the remaining sheets wait in the unused-stock queue.
    pub fn from_bundle(bundle: &StockBundle) -> Self {
        let mut solution = Self::new();
        for panel in bundle.panels() {
            solution.unused_stock_panels.push_back(panel.clone());
        }
        if let Some(first) = solution.unused_stock_panels.pop_front() {
            solution.add_mosaic(Mosaic::from_stock(&first));
        }
        solution
    }

    /// Copies `base` without the mosaic at `excluded`, so a placement can
    /// substitute its own replacement mosaic. The copy keeps the unused-stock
    /// queue and no-fit list and draws a fresh id.
    pub fn derived_excluding(base: &Solution, excluded: usize) -> Self {
        let mut solution = Self::new();
        for (i, mosaic) in base.mosaics.iter().enumerate() {
            if i != excluded {
                solution.mosaics.push(mosaic.clone());
            }
        }
        solution.unused_stock_panels = base.unused_stock_panels.clone();
        solution.no_fit_panels = base.no_fit_panels.clone();
        solution
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wall-clock creation time in Unix milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn add_mosaic(&mut self, mosaic: Mosaic) {
        self.mosaics.push(mosaic);
        self.sort_mosaics();
    }

    pub fn add_all_mosaics(&mut self, mosaics: impl IntoIterator<Item = Mosaic>) {
        self.mosaics.extend(mosaics);
        self.sort_mosaics();
    }

    fn sort_mosaics(&mut self) {
        self.mosaics.sort_by_key(|m| m.unused_area());
    }

    /// Material of the solution, taken from its first mosaic.
    pub fn material(&self) -> Option<&str> {
        self.mosaics.first().map(|m| m.material.as_str())
    }

    pub fn nbr_mosaics(&self) -> usize {
        self.mosaics.len()
    }

    pub fn nbr_final_tiles(&self) -> usize {
        self.mosaics.iter().map(|m| m.root.nbr_final_tiles()).sum()
    }

    pub fn nbr_unused_tiles(&self) -> usize {
        self.mosaics.iter().map(|m| m.root.nbr_unused_tiles()).sum()
    }

    pub fn nbr_cuts(&self) -> usize {
        self.mosaics.iter().map(Mosaic::nbr_cuts).sum()
    }

    pub fn total_area(&self) -> u64 {
        self.mosaics.iter().map(|m| m.root.area()).sum()
    }

    pub fn used_area(&self) -> u64 {
        self.mosaics.iter().map(Mosaic::used_area).sum()
    }

    pub fn unused_area(&self) -> u64 {
        self.mosaics.iter().map(Mosaic::unused_area).sum()
    }

    /// Mean of the per-mosaic used-area ratios.
    pub fn used_area_ratio(&self) -> f64 {
        if self.mosaics.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.mosaics.iter().map(|m| m.root.used_area_ratio()).sum();
        sum / self.mosaics.len() as f64
    }

    /// Largest free leaf across all mosaics.
    pub fn biggest_unused_area(&self) -> u64 {
        self.mosaics
            .iter()
            .map(Mosaic::biggest_unused_area)
            .max()
            .unwrap_or(0)
    }

    /// Largest per-mosaic free area.
    pub fn most_unused_panel_area(&self) -> u64 {
        self.mosaics
            .iter()
            .map(Mosaic::unused_area)
            .max()
            .unwrap_or(0)
    }

    /// Largest per-mosaic distinct-shape count.
    pub fn distinct_tile_count(&self) -> usize {
        self.mosaics
            .iter()
            .map(|m| m.distinct_tile_set().len())
            .max()
            .unwrap_or(0)
    }

    /// Mean of the per-mosaic center-of-mass distances.
    pub fn center_of_mass_distance(&self) -> f64 {
        if self.mosaics.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.mosaics.iter().map(Mosaic::center_of_mass_distance).sum();
        sum / self.mosaics.len() as f64
    }

    pub fn max_depth(&self) -> usize {
        self.mosaics.iter().map(Mosaic::depth).max().unwrap_or(0)
    }

    pub fn final_nodes(&self) -> Vec<&TileNode> {
        self.mosaics.iter().flat_map(Mosaic::final_nodes).collect()
    }

    pub fn stock_dimensions(&self) -> Vec<TileDimensions> {
        self.mosaics
            .iter()
            .map(|m| m.root.to_tile_dimensions())
            .collect()
    }

    /// Short "[WxH][WxH]" rendering of the sheets in use, for log lines.
    pub fn bases_as_string(&self) -> String {
        self.mosaics
            .iter()
            .map(|m| format!("[{}x{}]", m.root.width(), m.root.height()))
            .collect()
    }

    /// Structural identifier spanning all mosaics, used to deduplicate beam
    /// entries that reached the same layout through different paths.
    pub fn tree_identifier(&self) -> String {
        self.mosaics
            .iter()
            .map(|m| m.root.string_identifier())
            .collect()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileDimensions;

    fn bundle(sheets: &[(u32, u32)]) -> StockBundle {
        StockBundle::new(
            sheets
                .iter()
                .enumerate()
                .map(|(i, &(w, h))| TileDimensions::new(i as i32, w, h, "M", Default::default(), None))
                .collect(),
        )
    }

    #[test]
    fn test_from_bundle_opens_first_sheet() {
        let solution = Solution::from_bundle(&bundle(&[(100, 50), (200, 100)]));
        assert_eq!(solution.nbr_mosaics(), 1);
        assert_eq!(solution.unused_stock_panels.len(), 1);
        assert_eq!(solution.mosaics[0].root.width(), 100);
    }

    #[test]
    fn test_derived_excluding_drops_one_mosaic() {
        let mut base = Solution::from_bundle(&bundle(&[(100, 50)]));
        base.add_mosaic(Mosaic::from_stock(&TileDimensions::sized(10, 10)));
        let derived = Solution::derived_excluding(&base, 0);
        assert_eq!(derived.nbr_mosaics(), 1);
        assert_ne!(derived.id(), base.id());
    }

    #[test]
    fn test_mosaics_sorted_by_unused_area() {
        let mut solution = Solution::new();
        solution.add_mosaic(Mosaic::from_stock(&TileDimensions::sized(100, 100)));
        solution.add_mosaic(Mosaic::from_stock(&TileDimensions::sized(10, 10)));
        assert!(solution.mosaics[0].unused_area() <= solution.mosaics[1].unused_area());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Solution::new();
        let b = Solution::new();
        assert_ne!(a.id(), b.id());
    }
}
