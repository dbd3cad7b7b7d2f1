//! Stock-bundle generation.
//!
//! The [`StockBundleGenerator`] lazily enumerates minimal multisets of stock
//! sheets whose total area covers the demand and which contain at least one
//! sheet long enough for the largest panel. The [`StockBundlePicker`] runs a
//! sorter thread that keeps an area-ascending list of generated bundles and
//! hands them out by index, blocking consumers until a bundle exists or the
//! generator is exhausted.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cutlist_core::{Error, StockBundle, StockError, TileDimensions};

use crate::guard;
use crate::task::Task;

/// Upper bound on the number of sheets in one bundle.
const NBR_STOCK_BUNDLE_MAX_LENGTH: usize = 1000;

/// The sorter keeps at least this many bundles ahead of the consumers.
const MIN_INIT_STOCK_BUNDLES_TO_GENERATE: usize = 10;

/// Once an all-fit solution exists, generation stops after this many bundles.
const MIN_STOCK_BUNDLES_WITH_ALL_FIT_SOLUTION: usize = 100;

pub struct StockBundleGenerator {
    stock_tiles: Vec<TileDimensions>,
    required_area: u64,
    required_max_dimension: u32,
    smallest_tile_area: u64,
    max_length_hint: Option<usize>,
    excluded: Vec<StockBundle>,
    prev_indexes: Vec<usize>,
    prev_slot: usize,
    all_panel_bundle: StockBundle,
}

impl StockBundleGenerator {
    /// `hint` caps the bundle size; the single-sheet mode passes 1.
    pub fn new(
        tiles_to_fit: &[TileDimensions],
        mut stock_tiles: Vec<TileDimensions>,
        hint: Option<usize>,
    ) -> Self {
        stock_tiles.sort_by_key(TileDimensions::area);
        let mut required_area = 0u64;
        let mut required_max_dimension = 0u32;
        let mut smallest_tile_area = u64::MAX;
        for tile in tiles_to_fit {
            required_area += tile.area();
            required_max_dimension = required_max_dimension.max(tile.max_dimension());
            smallest_tile_area = smallest_tile_area.min(tile.area());
        }
        let all_panel_bundle = Self::build_all_panel_bundle(&stock_tiles);
        Self {
            stock_tiles,
            required_area,
            required_max_dimension,
            smallest_tile_area,
            max_length_hint: hint,
            excluded: Vec::new(),
            prev_indexes: Vec::new(),
            prev_slot: 0,
            all_panel_bundle,
        }
    }

    pub fn required_area(&self) -> u64 {
        self.required_area
    }

    /// Safety-net bundle holding every sheet (largest first, capped), kept
    /// sorted ascending like every emitted bundle.
    fn build_all_panel_bundle(stock_tiles: &[TileDimensions]) -> StockBundle {
        let mut bundle = StockBundle::empty();
        for tile in stock_tiles
            .iter()
            .rev()
            .take(NBR_STOCK_BUNDLE_MAX_LENGTH)
        {
            bundle.add(tile.clone());
        }
        bundle.sort_panels_asc();
        bundle
    }

    fn is_unique_stock_panel(&self) -> bool {
        match self.stock_tiles.first() {
            None => true,
            Some(first) => self.stock_tiles.iter().all(|t| t.id == first.id),
        }
    }

    fn biggest_stock_tile_area(&self) -> u64 {
        self.stock_tiles
            .iter()
            .map(TileDimensions::area)
            .max()
            .unwrap_or(0)
    }

    fn is_excluded(&self, bundle: &StockBundle) -> bool {
        self.excluded.iter().any(|b| b == bundle)
    }

    fn is_excluded_indexes(&self, indexes: &[usize]) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let candidate = StockBundle::new(
            indexes
                .iter()
                .map(|&i| self.stock_tiles[i].clone())
                .collect(),
        );
        self.is_excluded(&candidate)
    }

    /// Next stock index after `current` that is not already used and whose
    /// sheet exceeds the current sheet on at least one side.
    fn next_unused_stock_tile(&self, indexes: &[usize], current: usize) -> Option<usize> {
        let base = &self.stock_tiles[current];
        ((current + 1)..self.stock_tiles.len()).find(|&i| {
            !indexes.contains(&i)
                && (self.stock_tiles[i].width > base.width
                    || self.stock_tiles[i].height > base.height)
        })
    }

    fn indexes_are_unique(indexes: &[usize]) -> bool {
        let mut seen = HashSet::new();
        indexes.iter().all(|i| seen.insert(*i))
    }

    /// Emits the next bundle, or `None` once the search space is exhausted.
    pub fn generate_bundle(&mut self) -> Option<StockBundle> {
        if self.stock_tiles.is_empty() {
            return None;
        }
        if self.is_unique_stock_panel() {
            // a single sheet id means one possible bundle
            if self.is_excluded(&self.all_panel_bundle) {
                return None;
            }
            self.excluded.push(self.all_panel_bundle.clone());
            return Some(self.all_panel_bundle.clone());
        }
        let start_size = (self
            .required_area
            .div_ceil(self.biggest_stock_tile_area().max(1)) as usize)
            .max(1);
        let max_length = match self.max_length_hint {
            Some(hint) if hint >= start_size => hint,
            _ => NBR_STOCK_BUNDLE_MAX_LENGTH,
        };
        if max_length == NBR_STOCK_BUNDLE_MAX_LENGTH && !self.is_excluded(&self.all_panel_bundle)
        {
            // the all-panel bundle goes out first as a reachability net
            self.excluded.push(self.all_panel_bundle.clone());
            return Some(self.all_panel_bundle.clone());
        }
        let mut size = start_size;
        while size < self.stock_tiles.len() && size <= max_length {
            if let Some(mut bundle) = self.candidate_of_size(size) {
                self.excluded.push(bundle.clone());
                bundle.sort_panels_asc();
                return Some(bundle);
            }
            size += 1;
        }
        None
    }

    fn candidate_of_size(&mut self, size: usize) -> Option<StockBundle> {
        let (mut indexes, slot) = if self.prev_indexes.len() == size {
            (self.prev_indexes.clone(), self.prev_slot)
        } else {
            ((0..size).collect(), 0)
        };
        self.iterate(&mut indexes, slot, size)
    }

    fn iterate(&mut self, indexes: &mut Vec<usize>, slot: usize, size: usize) -> Option<StockBundle> {
        if !Self::indexes_are_unique(&indexes[..slot]) {
            return None;
        }
        if slot + 1 < size {
            let mut width = 0u32;
            let mut height = 0u32;
            let mut position = 0usize;
            while position < self.stock_tiles.len() {
                if let Some(bundle) = self.iterate(indexes, slot + 1, size) {
                    return Some(bundle);
                }
                // advance to the next distinct sheet at least as large as the
                // smallest demand panel
                let mut next = position;
                loop {
                    next += 1;
                    if next >= self.stock_tiles.len() {
                        break;
                    }
                    let tile = &self.stock_tiles[next];
                    if (tile.width != width || tile.height != height)
                        && tile.area() >= self.smallest_tile_area
                    {
                        break;
                    }
                }
                position = next;
                if position < self.stock_tiles.len() {
                    width = self.stock_tiles[position].width;
                    height = self.stock_tiles[position].height;
                    let mut cursor = slot;
                    let mut value = position;
                    while cursor < indexes.len() && value < self.stock_tiles.len() {
                        indexes[cursor] = value;
                        cursor += 1;
                        value += 1;
                    }
                }
            }
        }
        loop {
            let mut deficit = self.required_area as i64;
            let mut covers_max_dimension = false;
            for &i in indexes.iter() {
                deficit -= self.stock_tiles[i].area() as i64;
                if self.stock_tiles[i].max_dimension() >= self.required_max_dimension {
                    covers_max_dimension = true;
                }
            }
            if deficit <= 0
                && covers_max_dimension
                && Self::indexes_are_unique(indexes)
                && !self.is_excluded_indexes(indexes)
            {
                let bundle = StockBundle::new(
                    indexes
                        .iter()
                        .map(|&i| self.stock_tiles[i].clone())
                        .collect(),
                );
                self.prev_indexes = indexes.clone();
                self.prev_slot = slot;
                return Some(bundle);
            }
            match self.next_unused_stock_tile(indexes, indexes[slot]) {
                Some(next) => indexes[slot] = next,
                None => return None,
            }
        }
    }
}

struct PickerState {
    bundles: Vec<StockBundle>,
    max_retrieved: usize,
    exhausted: bool,
}

struct PickerShared {
    task: Arc<Task>,
    state: Mutex<PickerState>,
    available: Condvar,
    stop: AtomicBool,
}

/// Consumer-facing side of the bundle stream.
pub struct StockBundlePicker {
    shared: Arc<PickerShared>,
    generator: Mutex<Option<StockBundleGenerator>>,
    sorter: Mutex<Option<JoinHandle<()>>>,
}

impl StockBundlePicker {
    pub fn new(
        tiles_to_fit: &[TileDimensions],
        stock_tiles: Vec<TileDimensions>,
        task: Arc<Task>,
        hint: Option<usize>,
    ) -> Self {
        Self {
            shared: Arc::new(PickerShared {
                task,
                state: Mutex::new(PickerState {
                    bundles: Vec::new(),
                    max_retrieved: 0,
                    exhausted: false,
                }),
                available: Condvar::new(),
                stop: AtomicBool::new(false),
            }),
            generator: Mutex::new(Some(StockBundleGenerator::new(
                tiles_to_fit,
                stock_tiles,
                hint,
            ))),
            sorter: Mutex::new(None),
        }
    }

    /// Starts the sorter thread. Must be called before [`get_bundle`].
    pub fn init(&self) -> Result<(), Error> {
        let generator = guard(&self.generator)
            .take()
            .ok_or(Error::Stock(StockError::PickerNotInitialized))?;
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("stock-bundle-sorter".to_string())
            .spawn(move || {
                let guard_shared = shared.clone();
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    sorter_loop(shared, generator)
                }));
                if outcome.is_err() {
                    // consumers must never wait on a dead sorter
                    let mut state = guard(&guard_shared.state);
                    state.exhausted = true;
                    guard_shared.available.notify_all();
                    log::error!("stock bundle sorter thread failed");
                }
            })
            .map_err(|e| Error::Stock(StockError::PickerThread(e.to_string())))?;
        *guard(&self.sorter) = Some(handle);
        Ok(())
    }

    /// Blocks until the bundle at `index` exists; `Ok(None)` signals
    /// exhaustion.
    pub fn get_bundle(&self, index: usize) -> Result<Option<StockBundle>, Error> {
        if guard(&self.sorter).is_none() {
            return Err(Error::Stock(StockError::PickerNotInitialized));
        }
        let mut state = guard(&self.shared.state);
        loop {
            if index < state.bundles.len() {
                state.max_retrieved = state.max_retrieved.max(index);
                return Ok(Some(state.bundles[index].clone()));
            }
            if state.exhausted {
                log::debug!("no more possible stock bundles at idx[{index}]");
                return Ok(None);
            }
            let (next, _timeout) = self
                .shared
                .available
                .wait_timeout(state, Duration::from_secs(1))
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = next;
        }
    }

    /// Asks the sorter thread to stop at its next check.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }
}

fn sorter_loop(shared: Arc<PickerShared>, mut generator: StockBundleGenerator) {
    let finish = |reason: &str| {
        let mut state = guard(&shared.state);
        state.exhausted = true;
        shared.available.notify_all();
        log::debug!(
            "finishing stock picker thread: nbrGeneratedBundles[{}] - {reason}",
            state.bundles.len()
        );
    };
    loop {
        let needs_more = {
            let state = guard(&shared.state);
            state.bundles.len() <= MIN_INIT_STOCK_BUNDLES_TO_GENERATE
                || state.max_retrieved >= state.bundles.len().saturating_sub(1)
        };
        if needs_more {
            match generator.generate_bundle() {
                Some(bundle) => {
                    let mut state = guard(&shared.state);
                    log::debug!(
                        "added idx[{}] [{}] area[{}][{}] to the bundle stack",
                        state.bundles.len(),
                        bundle.len(),
                        bundle.total_area(),
                        bundle
                    );
                    if !bundle.has_unique_panel_size() {
                        // also try the opposite placement order
                        let mut descending = bundle.clone();
                        descending.sort_panels_desc();
                        state.bundles.push(descending);
                    }
                    state.bundles.push(bundle);
                    state.bundles.sort_by_key(StockBundle::total_area);
                    shared.available.notify_all();
                }
                None => {
                    finish("there are no more available stock bundles");
                    return;
                }
            }
        } else {
            log::trace!("no need to generate a new candidate stock bundle");
        }
        let nbr_bundles = guard(&shared.state).bundles.len();
        if nbr_bundles > MIN_INIT_STOCK_BUNDLES_TO_GENERATE {
            std::thread::sleep(Duration::from_secs(1));
        }
        if shared.stop.load(Ordering::Acquire) || !shared.task.is_running() {
            finish("task no longer has running status");
            return;
        }
        if shared.task.has_solution_all_fit()
            && nbr_bundles >= MIN_STOCK_BUNDLES_WITH_ALL_FIT_SOLUTION
        {
            finish("task already has an all fit solution");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutlist_core::Grain;

    fn tile(id: i32, w: u32, h: u32) -> TileDimensions {
        TileDimensions::new(id, w, h, "M", Grain::Any, None)
    }

    #[test]
    fn test_unique_stock_emits_single_bundle() {
        let demand = vec![tile(1, 50, 50)];
        let stock = vec![tile(9, 100, 100), tile(9, 100, 100)];
        let mut generator = StockBundleGenerator::new(&demand, stock, None);
        let first = generator.generate_bundle().expect("one bundle");
        assert_eq!(first.len(), 2);
        assert!(generator.generate_bundle().is_none());
    }

    #[test]
    fn test_all_panel_bundle_emitted_first() {
        let demand = vec![tile(1, 50, 50)];
        let stock = vec![tile(8, 100, 100), tile(9, 60, 60)];
        let mut generator = StockBundleGenerator::new(&demand, stock, None);
        let first = generator.generate_bundle().expect("all-panel bundle");
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_bundles_cover_required_area_and_max_side() {
        let demand = vec![tile(1, 90, 90), tile(2, 50, 50)];
        let stock = vec![
            tile(10, 100, 100),
            tile(11, 60, 60),
            tile(12, 80, 80),
            tile(13, 120, 120),
        ];
        let required_area: u64 = 90 * 90 + 50 * 50;
        let mut generator = StockBundleGenerator::new(&demand, stock, None);
        let mut seen = Vec::new();
        while let Some(bundle) = generator.generate_bundle() {
            assert!(bundle.total_area() >= required_area, "bundle {bundle}");
            assert!(
                bundle.panels().iter().any(|p| p.max_dimension() >= 90),
                "bundle {bundle} lacks a sheet for the largest panel"
            );
            assert!(
                seen.iter().all(|b| b != &bundle),
                "bundle {bundle} emitted twice"
            );
            seen.push(bundle);
            if seen.len() > 64 {
                break;
            }
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_single_stock_unit_hint() {
        let demand = vec![tile(1, 50, 50)];
        let stock = vec![tile(10, 100, 100), tile(11, 60, 60), tile(12, 80, 80)];
        let mut generator = StockBundleGenerator::new(&demand, stock, Some(1));
        let mut sizes = Vec::new();
        while let Some(bundle) = generator.generate_bundle() {
            sizes.push(bundle.len());
            if sizes.len() > 16 {
                break;
            }
        }
        assert!(!sizes.is_empty());
        assert!(sizes.iter().all(|&s| s == 1), "sizes {sizes:?}");
    }

    #[test]
    fn test_exhaustion_when_stock_too_small() {
        let demand = vec![tile(1, 500, 500)];
        let stock = vec![tile(10, 100, 100), tile(11, 90, 90)];
        let mut generator = StockBundleGenerator::new(&demand, stock, None);
        // the all-panel safety-net bundle still comes out once
        let first = generator.generate_bundle().expect("all-panel bundle");
        assert_eq!(first.len(), 2);
        assert!(generator.generate_bundle().is_none());
    }
}
