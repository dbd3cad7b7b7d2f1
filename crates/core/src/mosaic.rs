//! One stock sheet and its guillotine tree.

use std::collections::HashSet;

use crate::cut::Cut;
use crate::node::TileNode;
use crate::tile::{Grain, TileDimensions};

/// A mosaic is the split tree of a single stock-sheet instance together with
/// the cuts that produced it.
///
/// Invariant: the final leaves of `root` are disjoint and tile exactly the
/// area they claim; `cuts` describes every internal split in application
/// order.
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub root: TileNode,
    pub cuts: Vec<Cut>,
    pub material: String,
    pub grain: Grain,
    pub stock_id: i32,
}

impl Mosaic {
    /// Opens a fresh mosaic on one stock sheet.
    pub fn from_stock(stock: &TileDimensions) -> Self {
        let mut root = TileNode::from_dimensions(stock);
        root.external_id = Some(stock.id);
        Self {
            root,
            cuts: Vec::new(),
            material: stock.material.clone(),
            grain: stock.grain,
            stock_id: stock.id,
        }
    }

    /// Rebuilds a mosaic around an already-split tree, carrying over the
    /// originating mosaic's identity.
    pub fn with_root(root: TileNode, origin: &Mosaic) -> Self {
        Self {
            root,
            cuts: origin.cuts.clone(),
            material: origin.material.clone(),
            grain: origin.grain,
            stock_id: origin.stock_id,
        }
    }

    pub fn nbr_cuts(&self) -> usize {
        self.cuts.len()
    }

    pub fn used_area(&self) -> u64 {
        self.root.used_area()
    }

    pub fn unused_area(&self) -> u64 {
        self.root.unused_area()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn final_nodes(&self) -> Vec<&TileNode> {
        self.root.final_nodes()
    }

    pub fn biggest_unused_area(&self) -> u64 {
        self.root.biggest_unused_area()
    }

    pub fn distinct_tile_set(&self) -> HashSet<u64> {
        self.root.distinct_tile_set()
    }

    /// Absolute difference between horizontal and vertical final leaves.
    pub fn hv_diff(&self) -> f64 {
        (self.root.nbr_final_horizontal() as f64 - self.root.nbr_final_vertical() as f64).abs()
    }

    /// Distance of the placed panels' center of mass from the sheet origin,
    /// normalized by the sheet diagonal.
    pub fn center_of_mass_distance(&self) -> f64 {
        let used = self.used_area();
        if used == 0 {
            return 0.0;
        }
        let mut mx = 0.0f64;
        let mut my = 0.0f64;
        for node in self.final_nodes() {
            let area = node.area() as f64;
            mx += area * (node.x1() as f64 + node.width() as f64 * 0.5);
            my += area * (node.y1() as f64 + node.height() as f64 * 0.5);
        }
        let used = used as f64;
        let dist = ((mx / used).powi(2) + (my / used).powi(2)).sqrt();
        let diagonal =
            ((self.root.width() as f64).powi(2) + (self.root.height() as f64).powi(2)).sqrt();
        dist / diagonal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stock_roots_at_origin() {
        let stock = TileDimensions::new(3, 2440, 1220, "PLY", Grain::Horizontal, None);
        let mosaic = Mosaic::from_stock(&stock);
        assert_eq!(mosaic.root.width(), 2440);
        assert_eq!(mosaic.root.height(), 1220);
        assert_eq!(mosaic.root.external_id, Some(3));
        assert_eq!(mosaic.stock_id, 3);
        assert_eq!(mosaic.grain, Grain::Horizontal);
        assert_eq!(mosaic.nbr_cuts(), 0);
    }

    #[test]
    fn test_center_of_mass_zero_when_empty() {
        let mosaic = Mosaic::from_stock(&TileDimensions::sized(100, 100));
        assert_eq!(mosaic.center_of_mass_distance(), 0.0);
    }

    #[test]
    fn test_hv_diff_counts_final_leaves() {
        let stock = TileDimensions::sized(100, 50);
        let mut mosaic = Mosaic::from_stock(&stock);
        mosaic.root.is_final = true; // single 100x50 horizontal leaf
        assert_eq!(mosaic.hv_diff(), 1.0);
    }
}
