//! Candidate-search worker.
//!
//! One worker owns a permutation of the demand panels and one stock bundle.
//! It grows a bounded beam of partial solutions by trying to place each panel
//! into every mosaic of every beam entry through guillotine splits, then
//! merges its local beam into the task-wide beam under the final ranking.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use cutlist_core::{
    compare_chain, ComputationError, Cut, Error, Grain, Mosaic, OptimizationPriority, Solution,
    Status, StockBundle, TileDimensions, TileNode,
};

use crate::guard;
use crate::task::{Task, WorkerHandle};

/// Which split is tried first when a panel does not fit a leaf exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutDirection {
    Both,
    Horizontal,
    Vertical,
}

pub struct CutListWorker {
    pub tiles: Vec<TileDimensions>,
    pub bundle: StockBundle,
    pub first_cut: CutDirection,
    pub cut_thickness: u32,
    pub min_trim_dimension: u32,
    pub consider_grain: bool,
    pub thread_comparators: Vec<OptimizationPriority>,
    pub final_comparators: Vec<OptimizationPriority>,
    pub all_solutions: Arc<Mutex<Vec<Solution>>>,
    pub accuracy: usize,
    pub task: Arc<Task>,
    pub handle: Arc<WorkerHandle>,
    pub aux_info: String,
}

impl CutListWorker {
    pub fn handle(&self) -> Arc<WorkerHandle> {
        self.handle.clone()
    }

    pub fn aux_info(&self) -> &str {
        &self.aux_info
    }

    /// Runs the search to completion, converting panics into an ERROR status
    /// instead of propagating into the pool thread.
    pub fn run(self) {
        let handle = self.handle.clone();
        let task = self.task.clone();
        let aux_info = self.aux_info.clone();
        handle.set_status(Status::Running);
        let outcome = catch_unwind(AssertUnwindSafe(|| self.compute()));
        match outcome {
            Ok(()) => {
                if handle.status() != Status::Terminated {
                    handle.set_status(Status::Finished);
                }
            }
            Err(payload) => {
                handle.set_status(Status::Error);
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker panicked".to_string());
                let error = Error::Computation(ComputationError::CandidateSearch {
                    aux_info,
                    reason,
                });
                log::error!("task {}: {}", task.id(), error);
            }
        }
    }

    fn compute(&self) {
        let mut beam = vec![Solution::from_bundle(&self.bundle)];
        let total = self.tiles.len();
        for (index, tile) in self.tiles.iter().enumerate() {
            if !self.task.is_running() {
                self.handle.set_status(Status::Terminated);
                return;
            }
            if (index + 1) % 3 == 0 {
                self.handle
                    .set_percentage(((index + 1) * 100 / total) as u8);
            }

            let mut next_beam = Vec::new();
            let mut children = Vec::new();
            for mut solution in beam {
                let offspring = self.place_into_solution(&mut solution, tile);
                if offspring.is_empty() {
                    // nothing accepted the panel: the parent survives with
                    // the panel on its no-fit list
                    solution.no_fit_panels.push(tile.clone());
                    next_beam.push(solution);
                } else {
                    children.extend(offspring);
                }
            }
            for child in &mut children {
                child.creator_thread_group = Some(self.handle.group());
                child.aux_info = Some(self.aux_info.clone());
            }
            next_beam.append(&mut children);
            remove_duplicates(&mut next_beam);
            next_beam.sort_by(|a, b| compare_chain(&self.thread_comparators, a, b));
            truncate_keeping_tail(&mut next_beam, self.accuracy);
            beam = next_beam;
        }
        self.merge_into_shared(beam);
    }

    /// Tries the panel against every mosaic of `solution`, opening sheets
    /// from the unused-stock queue if none accepts it. Returns the child
    /// solutions; an empty result means the panel fits nowhere.
    fn place_into_solution(
        &self,
        solution: &mut Solution,
        tile: &TileDimensions,
    ) -> Vec<Solution> {
        let mut children = Vec::new();
        for index in 0..solution.mosaics.len() {
            if solution.mosaics[index].material != tile.material {
                continue;
            }
            let placements = self.place(tile, &solution.mosaics[index]);
            if !placements.is_empty() {
                for mosaic in placements {
                    let mut child = Solution::derived_excluding(solution, index);
                    child.add_mosaic(mosaic);
                    children.push(child);
                }
                return children;
            }
        }
        // keep opening fitting sheets until one takes the panel; sheets that
        // fail (grain or trim) stay behind as empty mosaics, as consumed
        while let Some(position) = solution
            .unused_stock_panels
            .iter()
            .position(|sheet| sheet.fits(tile))
        {
            let sheet = solution
                .unused_stock_panels
                .remove(position)
                .expect("position is in range");
            solution.mosaics.push(Mosaic::from_stock(&sheet));
            let index = solution.mosaics.len() - 1;
            let placements = self.place(tile, &solution.mosaics[index]);
            if !placements.is_empty() {
                for mosaic in placements {
                    let mut child = Solution::derived_excluding(solution, index);
                    child.add_mosaic(mosaic);
                    children.push(child);
                }
                return children;
            }
        }
        children
    }

    /// Placement primitive: both panel orientations against one mosaic,
    /// honoring grain constraints.
    fn place(&self, tile: &TileDimensions, mosaic: &Mosaic) -> Vec<Mosaic> {
        let mut out = Vec::new();
        if self.consider_grain && mosaic.grain != Grain::Any && tile.grain != Grain::Any {
            if mosaic.grain != tile.grain {
                self.fit_tile(&tile.rotate90(), mosaic, &mut out);
            } else {
                self.fit_tile(tile, mosaic, &mut out);
            }
        } else {
            self.fit_tile(tile, mosaic, &mut out);
            if !tile.is_square() {
                self.fit_tile(&tile.rotate90(), mosaic, &mut out);
            }
        }
        out
    }

    fn fit_tile(&self, tile: &TileDimensions, mosaic: &Mosaic, out: &mut Vec<Mosaic>) {
        let mut candidates = Vec::new();
        self.find_candidates(tile.width, tile.height, &mosaic.root, &mut candidates);
        for (leaf_id, leaf_width, leaf_height) in candidates {
            if leaf_width == tile.width && leaf_height == tile.height {
                // exact fit, no cut
                let mut root = mosaic.root.clone();
                if let Some(node) = root.find_mut(leaf_id) {
                    node.external_id = Some(tile.id);
                    node.is_final = true;
                    node.is_rotated = tile.is_rotated;
                }
                out.push(Mosaic::with_root(root, mosaic));
                continue;
            }
            if matches!(self.first_cut, CutDirection::Both | CutDirection::Horizontal) {
                let mut root = mosaic.root.clone();
                let cuts = match root.find_mut(leaf_id) {
                    Some(node) => split_hv(node, tile, self.cut_thickness),
                    None => continue,
                };
                let mut next = Mosaic::with_root(root, mosaic);
                next.cuts.extend(cuts);
                out.push(next);
            }
            if matches!(self.first_cut, CutDirection::Both | CutDirection::Vertical) {
                let mut root = mosaic.root.clone();
                let cuts = match root.find_mut(leaf_id) {
                    Some(node) => split_vh(node, tile, self.cut_thickness),
                    None => continue,
                };
                let mut next = Mosaic::with_root(root, mosaic);
                next.cuts.extend(cuts);
                out.push(next);
            }
        }
    }

    /// Collects non-final leaves large enough for a `width` x `height` panel.
    /// A side must either match exactly or leave at least the minimum trim;
    /// a leaf rejected only by the trim rule latches the task flag.
    fn find_candidates(
        &self,
        width: u32,
        height: u32,
        node: &TileNode,
        out: &mut Vec<(u32, u32, u32)>,
    ) {
        if node.is_final || node.width() < width || node.height() < height {
            return;
        }
        if node.is_leaf() {
            let width_ok =
                node.width() == width || node.width() >= width + self.min_trim_dimension;
            if !width_ok && node.width() > width {
                self.task.set_min_trim_dimension_influenced();
            }
            let height_ok =
                node.height() == height || node.height() >= height + self.min_trim_dimension;
            if !height_ok && node.height() > height {
                self.task.set_min_trim_dimension_influenced();
            }
            if width_ok && height_ok {
                out.push((node.id(), node.width(), node.height()));
            }
            return;
        }
        if let Some(child) = node.child1.as_deref() {
            self.find_candidates(width, height, child, out);
        }
        if let Some(child) = node.child2.as_deref() {
            self.find_candidates(width, height, child, out);
        }
    }

    fn merge_into_shared(&self, beam: Vec<Solution>) {
        let mut shared = guard(&self.all_solutions);
        shared.extend(beam);
        shared.sort_by(|a, b| compare_chain(&self.final_comparators, a, b));
        truncate_keeping_tail(&mut shared, self.accuracy);
        for solution in shared.iter().take(5) {
            if let (Some(material), Some(group)) =
                (solution.material(), solution.creator_thread_group)
            {
                let material = material.to_string();
                self.task.increment_thread_group_rankings(&material, group);
            }
        }
        if let Some(best) = shared.first_mut() {
            best.mosaics.retain(|m| m.used_area() != 0);
            log::trace!(
                "{}: best solution now uses {}",
                self.aux_info,
                best.bases_as_string()
            );
        }
    }
}

/// Drops duplicated layouts, keeping the first occurrence of each tree shape.
pub(crate) fn remove_duplicates(beam: &mut Vec<Solution>) -> usize {
    let mut seen = HashSet::new();
    let before = beam.len();
    beam.retain(|s| seen.insert(s.tree_identifier()));
    before - beam.len()
}

/// Beam truncation, ported verbatim: drops the range
/// `[min(len - 1, k), len - 1)`, which always spares the final element.
/// The clean form would be `drain(min(len, k)..len)`; the tail-keeping
/// behavior is deliberate compatibility.
pub(crate) fn truncate_keeping_tail(beam: &mut Vec<Solution>, k: usize) {
    if beam.is_empty() {
        return;
    }
    let start = (beam.len() - 1).min(k);
    beam.drain(start..beam.len() - 1);
}

/// Splits a leaf at `width`, consuming `kerf` between the two children.
/// Child 1 is the left piece and inherits `external_id`; child 2 exists only
/// when material remains past the kerf.
fn split_horizontally(
    node: &mut TileNode,
    width: u32,
    kerf: u32,
    external_id: Option<i32>,
) -> Cut {
    let original_width = node.width();
    let original_height = node.height();
    let mut child1 = TileNode::new(node.x1(), node.y1(), node.x1() + width, node.y2());
    child1.external_id = external_id;
    let child2_x1 = (node.x1() + width + kerf).min(node.x2());
    let child2 = TileNode::new(child2_x1, node.y1(), node.x2(), node.y2());
    let cut = Cut {
        x1: node.x1() + width,
        y1: node.y1(),
        x2: node.x1() + width,
        y2: node.y2(),
        original_width,
        original_height,
        is_horizontal: true,
        cut_coord: width,
        original_tile_id: node.id(),
        child1_tile_id: child1.id(),
        child2_tile_id: child2.id(),
    };
    if child1.area() > 0 {
        node.child1 = Some(Box::new(child1));
    }
    if child2.area() > 0 {
        node.child2 = Some(Box::new(child2));
    }
    cut
}

fn split_vertically(node: &mut TileNode, height: u32, kerf: u32, external_id: Option<i32>) -> Cut {
    let original_width = node.width();
    let original_height = node.height();
    let mut child1 = TileNode::new(node.x1(), node.y1(), node.x2(), node.y1() + height);
    child1.external_id = external_id;
    let child2_y1 = (node.y1() + height + kerf).min(node.y2());
    let child2 = TileNode::new(node.x1(), child2_y1, node.x2(), node.y2());
    let cut = Cut {
        x1: node.x1(),
        y1: node.y1() + height,
        x2: node.x2(),
        y2: node.y1() + height,
        original_width,
        original_height,
        is_horizontal: false,
        cut_coord: height,
        original_tile_id: node.id(),
        child1_tile_id: child1.id(),
        child2_tile_id: child2.id(),
    };
    if child1.area() > 0 {
        node.child1 = Some(Box::new(child1));
    }
    if child2.area() > 0 {
        node.child2 = Some(Box::new(child2));
    }
    cut
}

/// Horizontal-first placement of `tile` into the leaf `node`.
fn split_hv(node: &mut TileNode, tile: &TileDimensions, kerf: u32) -> Vec<Cut> {
    let mut cuts = Vec::new();
    if node.width() > tile.width {
        cuts.push(split_horizontally(node, tile.width, kerf, None));
        let child1 = node.child1.as_deref_mut().expect("left piece always exists");
        if child1.height() > tile.height {
            cuts.push(split_vertically(child1, tile.height, kerf, Some(tile.id)));
            let inner = child1
                .child1
                .as_deref_mut()
                .expect("top piece always exists");
            inner.is_final = true;
            inner.is_rotated = tile.is_rotated;
        } else {
            child1.is_final = true;
            child1.is_rotated = tile.is_rotated;
            child1.external_id = Some(tile.id);
        }
    } else {
        cuts.push(split_vertically(node, tile.height, kerf, Some(tile.id)));
        let child1 = node.child1.as_deref_mut().expect("top piece always exists");
        child1.is_final = true;
        child1.is_rotated = tile.is_rotated;
    }
    cuts
}

/// Vertical-first placement of `tile` into the leaf `node`.
fn split_vh(node: &mut TileNode, tile: &TileDimensions, kerf: u32) -> Vec<Cut> {
    let mut cuts = Vec::new();
    if node.height() > tile.height {
        cuts.push(split_vertically(node, tile.height, kerf, None));
        let child1 = node.child1.as_deref_mut().expect("top piece always exists");
        if child1.width() > tile.width {
            cuts.push(split_horizontally(child1, tile.width, kerf, Some(tile.id)));
            let inner = child1
                .child1
                .as_deref_mut()
                .expect("left piece always exists");
            inner.is_final = true;
            inner.is_rotated = tile.is_rotated;
        } else {
            child1.is_final = true;
            child1.is_rotated = tile.is_rotated;
            child1.external_id = Some(tile.id);
        }
    } else {
        cuts.push(split_horizontally(node, tile.width, kerf, Some(tile.id)));
        let child1 = node.child1.as_deref_mut().expect("left piece always exists");
        child1.is_final = true;
        child1.is_rotated = tile.is_rotated;
    }
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutlist_core::{final_priority_list, CalculationRequest, ClientInfo, Configuration};

    fn task() -> Arc<Task> {
        let task = Task::new(
            "test-task".into(),
            CalculationRequest {
                panels: vec![],
                stock_panels: vec![],
                configuration: Configuration::default(),
                client_info: ClientInfo::new("c"),
            },
            1.0,
        );
        task.set_running_status().unwrap();
        Arc::new(task)
    }

    fn worker(
        tiles: Vec<TileDimensions>,
        stock: Vec<TileDimensions>,
        cut_thickness: u32,
        min_trim: u32,
    ) -> (CutListWorker, Arc<Mutex<Vec<Solution>>>, Arc<Task>) {
        let task = task();
        let shared = Arc::new(Mutex::new(Vec::new()));
        let comparators = final_priority_list(&Configuration::default());
        let handle = Arc::new(WorkerHandle::new(
            cutlist_core::DEFAULT_MATERIAL,
            "AREA",
        ));
        let worker = CutListWorker {
            tiles,
            bundle: StockBundle::new(stock),
            first_cut: CutDirection::Both,
            cut_thickness,
            min_trim_dimension: min_trim,
            consider_grain: false,
            thread_comparators: comparators.clone(),
            final_comparators: comparators,
            all_solutions: shared.clone(),
            accuracy: 100,
            task: task.clone(),
            handle,
            aux_info: "stock[0] permutation[0]".into(),
        };
        (worker, shared, task)
    }

    fn demand(id: i32, w: u32, h: u32) -> TileDimensions {
        TileDimensions::new(id, w, h, cutlist_core::DEFAULT_MATERIAL, Grain::Any, None)
    }

    #[test]
    fn test_exact_fit_places_without_cuts() {
        let (worker, shared, _task) =
            worker(vec![demand(2, 100, 50)], vec![demand(1, 100, 50)], 0, 0);
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        assert_eq!(best.nbr_mosaics(), 1);
        assert_eq!(best.nbr_cuts(), 0);
        assert_eq!(best.used_area(), 100 * 50);
        assert_eq!(best.unused_area(), 0);
        assert!(best.no_fit_panels.is_empty());
        let finals = best.final_nodes();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].external_id, Some(2));
        assert_eq!((finals[0].x1(), finals[0].y1()), (0, 0));
    }

    #[test]
    fn test_single_split_leaves_offcut() {
        let (worker, shared, _task) =
            worker(vec![demand(2, 60, 50)], vec![demand(1, 100, 50)], 0, 0);
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        assert_eq!(best.nbr_cuts(), 1);
        assert_eq!(best.used_area(), 3000);
        assert_eq!(best.unused_area(), 2000);
        let cut = best.mosaics[0].cuts[0];
        assert!(cut.is_horizontal);
        assert_eq!((cut.x1, cut.y1, cut.x2, cut.y2), (60, 0, 60, 50));
        let finals = best.final_nodes();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].width(), 60);
        assert!(!finals[0].is_rotated);
    }

    #[test]
    fn test_two_panels_one_sheet() {
        let (worker, shared, _task) = worker(
            vec![demand(2, 60, 50), demand(3, 40, 50)],
            vec![demand(1, 100, 100)],
            0,
            0,
        );
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        assert_eq!(best.nbr_final_tiles(), 2);
        assert_eq!(best.used_area(), 6000);
        assert_eq!(best.unused_area(), 4000);
        // the least-cuts layout stacks both panels on one 100x50 half
        assert_eq!(best.nbr_cuts(), 2);
        assert!(best.no_fit_panels.is_empty());
    }

    #[test]
    fn test_rotation_exact_fit() {
        let (worker, shared, _task) =
            worker(vec![demand(2, 100, 50)], vec![demand(1, 50, 100)], 0, 0);
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        assert_eq!(best.nbr_cuts(), 0);
        let finals = best.final_nodes();
        assert_eq!(finals.len(), 1);
        assert!(finals[0].is_rotated);
        // rotated leaf carries the demand's sides swapped
        assert_eq!(finals[0].width(), 50);
        assert_eq!(finals[0].height(), 100);
    }

    #[test]
    fn test_kerf_is_consumed_between_children() {
        let (worker, shared, _task) = worker(
            vec![demand(2, 45, 10), demand(2, 45, 10)],
            vec![demand(1, 100, 10)],
            10,
            0,
        );
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        assert_eq!(best.nbr_final_tiles(), 2);
        assert_eq!(best.used_area(), 900);
        assert_eq!(best.unused_area(), 100); // the 10x10 kerf strip
        assert_eq!(best.nbr_cuts(), 1);
        let mut xs: Vec<u32> = best.final_nodes().iter().map(|n| n.x1()).collect();
        xs.sort_unstable();
        assert_eq!(xs, vec![0, 55]);
    }

    #[test]
    fn test_min_trim_dimension_blocks_placement() {
        let (worker, shared, task) =
            worker(vec![demand(2, 95, 100)], vec![demand(1, 100, 100)], 0, 10);
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        assert_eq!(best.nbr_final_tiles(), 0);
        assert_eq!(best.no_fit_panels.len(), 1);
        assert!(task.is_min_trim_dimension_influenced());
    }

    #[test]
    fn test_second_sheet_opened_when_first_is_full() {
        let (worker, shared, _task) = worker(
            vec![demand(2, 100, 50), demand(3, 100, 50)],
            vec![demand(1, 100, 50), demand(1, 100, 50)],
            0,
            0,
        );
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        assert_eq!(best.nbr_mosaics(), 2);
        assert_eq!(best.nbr_final_tiles(), 2);
        assert!(best.unused_stock_panels.is_empty());
    }

    #[test]
    fn test_horizontal_only_policy_never_cuts_vertically_first() {
        let (mut worker, shared, _task) =
            worker(vec![demand(2, 60, 40)], vec![demand(1, 100, 50)], 0, 0);
        worker.first_cut = CutDirection::Horizontal;
        worker.run();
        let shared = shared.lock().unwrap();
        for solution in shared.iter() {
            for mosaic in &solution.mosaics {
                if let Some(first) = mosaic.cuts.first() {
                    assert!(first.is_horizontal);
                }
            }
        }
    }

    #[test]
    fn test_truncation_keeps_tail_element() {
        let mut beam: Vec<Solution> = (0..6).map(|_| Solution::new()).collect();
        let last_id = beam.last().unwrap().id();
        truncate_keeping_tail(&mut beam, 3);
        assert_eq!(beam.len(), 4);
        assert_eq!(beam.last().unwrap().id(), last_id);

        // below the limit nothing is dropped
        let mut small: Vec<Solution> = (0..3).map(|_| Solution::new()).collect();
        truncate_keeping_tail(&mut small, 3);
        assert_eq!(small.len(), 3);
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let stock = vec![demand(1, 100, 50)];
        let mut beam = vec![
            Solution::from_bundle(&StockBundle::new(stock.clone())),
            Solution::from_bundle(&StockBundle::new(stock)),
        ];
        let removed = remove_duplicates(&mut beam);
        assert_eq!(removed, 1);
        assert_eq!(beam.len(), 1);
    }

    #[test]
    fn test_grain_constraint_forces_orientation() {
        let task = task();
        let shared = Arc::new(Mutex::new(Vec::new()));
        let comparators = final_priority_list(&Configuration::default());
        let mut stock = demand(1, 100, 50);
        stock.grain = Grain::Horizontal;
        let mut tile = demand(2, 50, 100);
        tile.grain = Grain::Vertical;
        let worker = CutListWorker {
            tiles: vec![tile],
            bundle: StockBundle::new(vec![stock]),
            first_cut: CutDirection::Both,
            cut_thickness: 0,
            min_trim_dimension: 0,
            consider_grain: true,
            thread_comparators: comparators.clone(),
            final_comparators: comparators,
            all_solutions: shared.clone(),
            accuracy: 100,
            task,
            handle: Arc::new(WorkerHandle::new(cutlist_core::DEFAULT_MATERIAL, "AREA")),
            aux_info: "stock[0] permutation[0]".into(),
        };
        worker.run();
        let shared = shared.lock().unwrap();
        let best = &shared[0];
        // the panel must be rotated to align grains, yielding an exact fit
        assert_eq!(best.nbr_final_tiles(), 1);
        assert!(best.final_nodes()[0].is_rotated);
    }
}
