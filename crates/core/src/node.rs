//! The guillotine split tree.
//!
//! A [`TileNode`] is either a leaf (possibly marked final, carrying the id of
//! the demand panel placed on it) or an internal node with up to two children
//! produced by one horizontal or vertical cut. The tree is owned by its
//! [`Mosaic`](crate::mosaic::Mosaic); placements clone the whole tree and
//! mutate the clone, so sibling solutions in a beam never share structure.
//!
//! Node ids come from a process-wide monotonic counter. Cloning preserves
//! ids, which is what lets a placement locate "the same" leaf inside the
//! cloned tree.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::tile::TileDimensions;

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(0);

fn next_node_id() -> u32 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Axis-aligned integer rectangle, addressed by its two corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Tile {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn max_side(&self) -> u32 {
        self.width().max(self.height())
    }

    pub fn is_horizontal(&self) -> bool {
        self.width() > self.height()
    }

    pub fn is_vertical(&self) -> bool {
        self.height() > self.width()
    }
}

/// One node of the guillotine tree.
#[derive(Debug, Clone)]
pub struct TileNode {
    id: u32,
    pub tile: Tile,
    pub external_id: Option<i32>,
    pub is_final: bool,
    pub is_rotated: bool,
    pub child1: Option<Box<TileNode>>,
    pub child2: Option<Box<TileNode>>,
}

impl TileNode {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            id: next_node_id(),
            tile: Tile::new(x1, y1, x2, y2),
            external_id: None,
            is_final: false,
            is_rotated: false,
            child1: None,
            child2: None,
        }
    }

    pub fn from_dimensions(dims: &TileDimensions) -> Self {
        Self::new(0, 0, dims.width, dims.height)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn x1(&self) -> u32 {
        self.tile.x1
    }

    pub fn y1(&self) -> u32 {
        self.tile.y1
    }

    pub fn x2(&self) -> u32 {
        self.tile.x2
    }

    pub fn y2(&self) -> u32 {
        self.tile.y2
    }

    pub fn width(&self) -> u32 {
        self.tile.width()
    }

    pub fn height(&self) -> u32 {
        self.tile.height()
    }

    pub fn area(&self) -> u64 {
        self.tile.area()
    }

    pub fn max_side(&self) -> u32 {
        self.tile.max_side()
    }

    pub fn has_children(&self) -> bool {
        self.child1.is_some() || self.child2.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        !self.has_children()
    }

    pub fn to_tile_dimensions(&self) -> TileDimensions {
        TileDimensions::sized(self.width(), self.height())
    }

    /// Finds the node with the given id, depth first.
    pub fn find(&self, id: u32) -> Option<&TileNode> {
        if self.id == id {
            return Some(self);
        }
        if let Some(found) = self.child1.as_deref().and_then(|c| c.find(id)) {
            return Some(found);
        }
        self.child2.as_deref().and_then(|c| c.find(id))
    }

    /// Mutable counterpart of [`find`](Self::find), used after cloning the
    /// tree to apply a placement to the copied leaf. Locates the subtree
    /// immutably first so each return path holds a single mutable borrow.
    pub fn find_mut(&mut self, id: u32) -> Option<&mut TileNode> {
        if self.id == id {
            return Some(self);
        }
        if self
            .child1
            .as_deref()
            .is_some_and(|c| c.find(id).is_some())
        {
            return self.child1.as_deref_mut().and_then(|c| c.find_mut(id));
        }
        self.child2.as_deref_mut().and_then(|c| c.find_mut(id))
    }

    /// Total area of final leaves under this node.
    pub fn used_area(&self) -> u64 {
        if self.is_final {
            return self.area();
        }
        self.child1.as_deref().map_or(0, |c| c.used_area())
            + self.child2.as_deref().map_or(0, |c| c.used_area())
    }

    pub fn unused_area(&self) -> u64 {
        self.area() - self.used_area()
    }

    pub fn used_area_ratio(&self) -> f64 {
        if self.area() == 0 {
            return 0.0;
        }
        self.used_area() as f64 / self.area() as f64
    }

    pub fn has_final(&self) -> bool {
        self.is_final
            || self.child1.as_deref().is_some_and(|c| c.has_final())
            || self.child2.as_deref().is_some_and(|c| c.has_final())
    }

    /// Non-final leaves under this node, in depth-first order.
    pub fn unused_tiles(&self) -> Vec<&TileNode> {
        let mut out = Vec::new();
        self.collect_unused(&mut out);
        out
    }

    fn collect_unused<'a>(&'a self, out: &mut Vec<&'a TileNode>) {
        if !self.is_final && self.is_leaf() {
            out.push(self);
        }
        if let Some(c) = self.child1.as_deref() {
            c.collect_unused(out);
        }
        if let Some(c) = self.child2.as_deref() {
            c.collect_unused(out);
        }
    }

    /// Final leaves under this node, in depth-first order.
    pub fn final_nodes(&self) -> Vec<&TileNode> {
        let mut out = Vec::new();
        self.collect_final(&mut out);
        out
    }

    fn collect_final<'a>(&'a self, out: &mut Vec<&'a TileNode>) {
        if self.is_final {
            out.push(self);
        }
        if let Some(c) = self.child1.as_deref() {
            c.collect_final(out);
        }
        if let Some(c) = self.child2.as_deref() {
            c.collect_final(out);
        }
    }

    pub fn nbr_final_tiles(&self) -> usize {
        usize::from(self.is_final)
            + self.child1.as_deref().map_or(0, |c| c.nbr_final_tiles())
            + self.child2.as_deref().map_or(0, |c| c.nbr_final_tiles())
    }

    pub fn nbr_unused_tiles(&self) -> usize {
        usize::from(!self.is_final && self.is_leaf())
            + self.child1.as_deref().map_or(0, |c| c.nbr_unused_tiles())
            + self.child2.as_deref().map_or(0, |c| c.nbr_unused_tiles())
    }

    /// Cumulative node count below this one (each child contributes its own
    /// subtree plus one).
    pub fn depth(&self) -> usize {
        self.child1.as_deref().map_or(0, |c| 1 + c.depth())
            + self.child2.as_deref().map_or(0, |c| 1 + c.depth())
    }

    /// Area of the largest non-final leaf under this node.
    pub fn biggest_unused_area(&self) -> u64 {
        let own = if self.is_leaf() && !self.is_final {
            self.area()
        } else {
            0
        };
        own.max(self.child1.as_deref().map_or(0, |c| c.biggest_unused_area()))
            .max(self.child2.as_deref().map_or(0, |c| c.biggest_unused_area()))
    }

    /// Number of final leaves wider than tall.
    pub fn nbr_final_horizontal(&self) -> usize {
        usize::from(self.is_final && self.tile.is_horizontal())
            + self.child1.as_deref().map_or(0, |c| c.nbr_final_horizontal())
            + self.child2.as_deref().map_or(0, |c| c.nbr_final_horizontal())
    }

    /// Number of final leaves taller than wide.
    pub fn nbr_final_vertical(&self) -> usize {
        usize::from(self.is_final && self.tile.is_vertical())
            + self.child1.as_deref().map_or(0, |c| c.nbr_final_vertical())
            + self.child2.as_deref().map_or(0, |c| c.nbr_final_vertical())
    }

    /// Distinct final-leaf shapes, encoded with the Cantor pairing of
    /// (width + height) and height so that WxH and HxW count as different
    /// shapes.
    pub fn distinct_tile_set(&self) -> HashSet<u64> {
        let mut set = HashSet::new();
        self.collect_distinct(&mut set);
        set
    }

    fn collect_distinct(&self, set: &mut HashSet<u64>) {
        if self.is_final {
            let sum = (self.width() + self.height()) as u64;
            set.insert(sum * (sum + 1) / 2 + self.height() as u64);
        } else {
            if let Some(c) = self.child1.as_deref() {
                c.collect_distinct(set);
            }
            if let Some(c) = self.child2.as_deref() {
                c.collect_distinct(set);
            }
        }
    }

    /// Compact structural identifier: corner coordinates and final flag of
    /// every node in pre-order. Two mosaics with equal identifiers hold the
    /// same layout.
    pub fn string_identifier(&self) -> String {
        let mut out = String::new();
        self.append_identifier(&mut out);
        out
    }

    fn append_identifier(&self, out: &mut String) {
        let _ = write!(
            out,
            "{}{}{}{}{}",
            self.tile.x1, self.tile.y1, self.tile.x2, self.tile.y2, self.is_final
        );
        if let Some(c) = self.child1.as_deref() {
            c.append_identifier(out);
        }
        if let Some(c) = self.child2.as_deref() {
            c.append_identifier(out);
        }
    }
}
