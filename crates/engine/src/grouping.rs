//! Demand grouping.
//!
//! Permutations are generated over panel groups, not individual panels.
//! Frequent sizes are split across groups so that one oversized batch does
//! not dominate every permutation.

use std::collections::{HashMap, HashSet};

use cutlist_core::{GroupedTileDimensions, TileDimensions};

/// True when one dimension value runs through the whole problem: the
/// intersection of {width, height} of the first demand panel with every
/// demand and stock panel's sides is non-empty.
pub fn is_one_dimensional(tiles: &[TileDimensions], stock: &[TileDimensions]) -> bool {
    let Some(first) = tiles.first() else {
        return false;
    };
    let mut candidates: HashSet<u32> = HashSet::from([first.width, first.height]);
    for tile in tiles.iter().chain(stock.iter()) {
        candidates.retain(|&v| v == tile.width || v == tile.height);
        if candidates.is_empty() {
            return false;
        }
    }
    true
}

/// Assigns a group tag to every demand panel, in input order.
///
/// The shared group counter advances whenever a size whose total count
/// exceeds `max(N/100, 1)` has already put more than a quarter of its units
/// into the current group. One-dimensional problems force the threshold down
/// to 1 so identical strips spread across groups aggressively.
pub fn generate_groups(
    tiles: &[TileDimensions],
    stock: &[TileDimensions],
    task_id: &str,
) -> Vec<GroupedTileDimensions> {
    let mut totals: HashMap<String, u32> = HashMap::new();
    for tile in tiles {
        *totals.entry(tile.to_string()).or_insert(0) += 1;
    }
    log::trace!(
        "task[{task_id}] totalNbrTiles[{}] distinctSizes[{}]",
        tiles.len(),
        totals.len()
    );

    let mut split_threshold = (tiles.len() as u32 / 100).max(1);
    if is_one_dimensional(tiles, stock) {
        log::info!("task[{task_id}] is a one dimensional optimization");
        split_threshold = 1;
    }

    let mut group = 0u32;
    let mut per_group: HashMap<String, u32> = HashMap::new();
    let mut out = Vec::with_capacity(tiles.len());
    for tile in tiles {
        let group_key = format!("{tile}{group}");
        let in_group = per_group.entry(group_key).or_insert(0);
        *in_group += 1;
        out.push(GroupedTileDimensions::new(tile.clone(), group));
        let total = totals[&tile.to_string()];
        if total > split_threshold && *in_group > total / 4 {
            log::debug!(
                "task[{task_id}] splitting panel set [{}] of [{total}] units into a new group",
                tile.dimensions_to_string()
            );
            group += 1;
        }
    }
    out
}
