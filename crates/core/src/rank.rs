//! Solution ranking.
//!
//! Each [`OptimizationPriority`] is a total order on solutions. A comparator
//! chain applies them lexicographically: the first key that distinguishes two
//! solutions decides. This replaces an inheritance hierarchy of comparator
//! classes with a tagged enum plus one compare function.

use std::cmp::Ordering;
use std::fmt;

use crate::request::Configuration;
use crate::solution::Solution;

/// Ranking keys, best-first in the direction documented on each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationPriority {
    /// Descending by number of placed panels.
    MostTiles,
    /// Ascending by total unused area.
    LeastWastedArea,
    /// Ascending by total cut count.
    LeastNbrCuts,
    /// Ascending by largest per-mosaic distinct-shape count.
    MostHvDiscrepancy,
    /// Descending by largest free leaf area.
    BiggestUnusedTileArea,
    /// Ascending by mean center-of-mass distance.
    SmallestCenterOfMassDistToOrigin,
    /// Ascending by mosaic count.
    LeastNbrMosaics,
    /// Ascending by free-leaf count.
    LeastNbrUnusedTiles,
    /// Descending by largest per-mosaic free area.
    MostUnusedPanelArea,
}

impl OptimizationPriority {
    /// Parses the wire name, case-insensitively. Unknown names yield `None`
    /// so callers can skip them silently.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MOST_TILES" => Some(Self::MostTiles),
            "LEAST_WASTED_AREA" => Some(Self::LeastWastedArea),
            "LEAST_NBR_CUTS" => Some(Self::LeastNbrCuts),
            "MOST_HV_DISCREPANCY" => Some(Self::MostHvDiscrepancy),
            "BIGGEST_UNUSED_TILE_AREA" => Some(Self::BiggestUnusedTileArea),
            "SMALLEST_CENTER_OF_MASS_DIST_TO_ORIGIN" => {
                Some(Self::SmallestCenterOfMassDistToOrigin)
            }
            "LEAST_NBR_MOSAICS" => Some(Self::LeastNbrMosaics),
            "LEAST_NBR_UNUSED_TILES" => Some(Self::LeastNbrUnusedTiles),
            "MOST_UNUSED_PANEL_AREA" => Some(Self::MostUnusedPanelArea),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MostTiles => "MOST_TILES",
            Self::LeastWastedArea => "LEAST_WASTED_AREA",
            Self::LeastNbrCuts => "LEAST_NBR_CUTS",
            Self::MostHvDiscrepancy => "MOST_HV_DISCREPANCY",
            Self::BiggestUnusedTileArea => "BIGGEST_UNUSED_TILE_AREA",
            Self::SmallestCenterOfMassDistToOrigin => "SMALLEST_CENTER_OF_MASS_DIST_TO_ORIGIN",
            Self::LeastNbrMosaics => "LEAST_NBR_MOSAICS",
            Self::LeastNbrUnusedTiles => "LEAST_NBR_UNUSED_TILES",
            Self::MostUnusedPanelArea => "MOST_UNUSED_PANEL_AREA",
        }
    }

    /// Compares two solutions under this key alone; `Less` means `a` ranks
    /// better.
    pub fn compare(&self, a: &Solution, b: &Solution) -> Ordering {
        match self {
            Self::MostTiles => b.nbr_final_tiles().cmp(&a.nbr_final_tiles()),
            Self::LeastWastedArea => a.unused_area().cmp(&b.unused_area()),
            Self::LeastNbrCuts => a.nbr_cuts().cmp(&b.nbr_cuts()),
            Self::MostHvDiscrepancy => a.distinct_tile_count().cmp(&b.distinct_tile_count()),
            Self::BiggestUnusedTileArea => b.biggest_unused_area().cmp(&a.biggest_unused_area()),
            Self::SmallestCenterOfMassDistToOrigin => a
                .center_of_mass_distance()
                .partial_cmp(&b.center_of_mass_distance())
                .unwrap_or(Ordering::Equal),
            Self::LeastNbrMosaics => a.nbr_mosaics().cmp(&b.nbr_mosaics()),
            Self::LeastNbrUnusedTiles => a.nbr_unused_tiles().cmp(&b.nbr_unused_tiles()),
            Self::MostUnusedPanelArea => {
                b.most_unused_panel_area().cmp(&a.most_unused_panel_area())
            }
        }
    }
}

impl fmt::Display for OptimizationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lexicographic comparison under an ordered key chain.
pub fn compare_chain(keys: &[OptimizationPriority], a: &Solution, b: &Solution) -> Ordering {
    for key in keys {
        let ord = key.compare(a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Resolves a list of wire names into keys, skipping unknown names silently.
pub fn priorities_from_names(names: &[String]) -> Vec<OptimizationPriority> {
    names
        .iter()
        .filter_map(|n| OptimizationPriority::from_name(n))
        .collect()
}

/// Builds the configured final-ranking chain.
///
/// Priority 0 ranks waste before cut count; any other value swaps the two.
pub fn final_priority_list(configuration: &Configuration) -> Vec<OptimizationPriority> {
    let mut list = if configuration.optimization_priority == 0 {
        vec![
            OptimizationPriority::MostTiles,
            OptimizationPriority::LeastWastedArea,
            OptimizationPriority::LeastNbrCuts,
        ]
    } else {
        vec![
            OptimizationPriority::MostTiles,
            OptimizationPriority::LeastNbrCuts,
            OptimizationPriority::LeastWastedArea,
        ]
    };
    list.push(OptimizationPriority::LeastNbrMosaics);
    list.push(OptimizationPriority::BiggestUnusedTileArea);
    list.push(OptimizationPriority::MostHvDiscrepancy);
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosaic::Mosaic;
    use crate::tile::TileDimensions;

    fn empty_solution(width: u32, height: u32) -> Solution {
        let mut solution = Solution::new();
        solution.add_mosaic(Mosaic::from_stock(&TileDimensions::sized(width, height)));
        solution
    }

    fn full_solution(width: u32, height: u32) -> Solution {
        let mut mosaic = Mosaic::from_stock(&TileDimensions::sized(width, height));
        mosaic.root.is_final = true;
        let mut solution = Solution::new();
        solution.add_mosaic(mosaic);
        solution
    }

    fn two_tile_solution(width: u32, height: u32) -> Solution {
        let mut mosaic = Mosaic::from_stock(&TileDimensions::sized(width, height));
        let mut left = crate::node::TileNode::new(0, 0, width / 2, height);
        left.is_final = true;
        let mut right = crate::node::TileNode::new(width / 2, 0, width, height);
        right.is_final = true;
        mosaic.root.child1 = Some(Box::new(left));
        mosaic.root.child2 = Some(Box::new(right));
        let mut solution = Solution::new();
        solution.add_mosaic(mosaic);
        solution
    }

    #[test]
    fn test_most_tiles_prefers_more_placements() {
        let two = two_tile_solution(100, 50);
        let one = full_solution(100, 50);
        assert_eq!(
            OptimizationPriority::MostTiles.compare(&two, &one),
            Ordering::Less
        );
    }

    #[test]
    fn test_least_wasted_area_prefers_fuller_layouts() {
        let full = full_solution(100, 50);
        let empty = empty_solution(100, 50);
        assert_eq!(
            OptimizationPriority::LeastWastedArea.compare(&full, &empty),
            Ordering::Less
        );
    }

    #[test]
    fn test_chain_falls_through_on_ties() {
        let a = full_solution(100, 50);
        let b = full_solution(100, 50);
        let chain = [
            OptimizationPriority::MostTiles,
            OptimizationPriority::LeastWastedArea,
        ];
        assert_eq!(compare_chain(&chain, &a, &b), Ordering::Equal);
    }

    #[test]
    fn test_priority_zero_ranks_waste_before_cuts() {
        let cfg = Configuration::default();
        let list = final_priority_list(&cfg);
        assert_eq!(list[1], OptimizationPriority::LeastWastedArea);
        assert_eq!(list[2], OptimizationPriority::LeastNbrCuts);
        assert_eq!(list.len(), 6);

        let cfg = Configuration {
            optimization_priority: 1,
            ..Configuration::default()
        };
        let list = final_priority_list(&cfg);
        assert_eq!(list[1], OptimizationPriority::LeastNbrCuts);
        assert_eq!(list[2], OptimizationPriority::LeastWastedArea);
    }

    #[test]
    fn test_unknown_names_skipped() {
        let names = vec![
            "MOST_TILES".to_string(),
            "NOT_A_KEY".to_string(),
            "least_nbr_cuts".to_string(),
        ];
        let keys = priorities_from_names(&names);
        assert_eq!(
            keys,
            vec![
                OptimizationPriority::MostTiles,
                OptimizationPriority::LeastNbrCuts
            ]
        );
    }
}
