//! Panel descriptors.
//!
//! [`TileDimensions`] is the immutable description of one physical panel
//! (demand or stock) after scaling: integer sides, material tag, grain
//! constraint and label. [`GroupedTileDimensions`] adds the group tag used to
//! bound the permutation explosion.

use std::fmt;

/// Material tag applied when a request leaves the material blank.
pub const DEFAULT_MATERIAL: &str = "DEFAULT_MATERIAL";

/// Grain direction constraint of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grain {
    /// No constraint; the panel may be rotated freely.
    #[default]
    Any,
    /// Grain runs along the width.
    Horizontal,
    /// Grain runs along the height.
    Vertical,
}

impl Grain {
    /// Decodes the wire representation (0 = any, 1 = horizontal,
    /// 2 = vertical). Unknown codes fall back to `Any`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Grain::Horizontal,
            2 => Grain::Vertical,
            _ => Grain::Any,
        }
    }

    /// Encodes back to the wire representation.
    pub fn code(self) -> u8 {
        match self {
            Grain::Any => 0,
            Grain::Horizontal => 1,
            Grain::Vertical => 2,
        }
    }

    /// The constraint after a 90° rotation of the panel.
    pub fn rotated(self) -> Self {
        match self {
            Grain::Horizontal => Grain::Vertical,
            Grain::Vertical => Grain::Horizontal,
            Grain::Any => Grain::Any,
        }
    }
}

/// Immutable dimensions of one panel instance.
///
/// Equality and hashing consider only the id and the sides, so two instances
/// expanded from the same request panel compare equal regardless of material
/// or label.
#[derive(Debug, Clone)]
pub struct TileDimensions {
    pub id: i32,
    pub width: u32,
    pub height: u32,
    pub material: String,
    pub grain: Grain,
    pub label: Option<String>,
    pub is_rotated: bool,
}

impl TileDimensions {
    pub fn new(
        id: i32,
        width: u32,
        height: u32,
        material: impl Into<String>,
        grain: Grain,
        label: Option<String>,
    ) -> Self {
        Self {
            id,
            width,
            height,
            material: material.into(),
            grain,
            label,
            is_rotated: false,
        }
    }

    /// Anonymous panel with default material, used for derived dimensions.
    pub fn sized(width: u32, height: u32) -> Self {
        Self::new(-1, width, height, DEFAULT_MATERIAL, Grain::Any, None)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn is_horizontal(&self) -> bool {
        self.width > self.height
    }

    /// Returns the panel turned by 90°: sides swapped, grain constraint
    /// flipped, rotation flag set.
    pub fn rotate90(&self) -> Self {
        Self {
            id: self.id,
            width: self.height,
            height: self.width,
            material: self.material.clone(),
            grain: self.grain.rotated(),
            label: self.label.clone(),
            is_rotated: true,
        }
    }

    /// True if both panels have the same sides, in either orientation.
    pub fn has_same_dimensions(&self, other: &TileDimensions) -> bool {
        (self.width == other.width && self.height == other.height)
            || (self.width == other.height && self.height == other.width)
    }

    /// True if `other` fits inside this panel, in either orientation.
    pub fn fits(&self, other: &TileDimensions) -> bool {
        (self.width >= other.width && self.height >= other.height)
            || (self.height >= other.width && self.width >= other.height)
    }

    /// Hash over the sides only, ignoring the id. Used to deduplicate
    /// permutations that place identical rectangles in the same order.
    pub fn dimensions_hash(&self) -> u64 {
        self.width as u64 * 31 + self.height as u64
    }

    pub fn dimensions_to_string(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl PartialEq for TileDimensions {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.width == other.width && self.height == other.height
    }
}

impl Eq for TileDimensions {}

impl std::hash::Hash for TileDimensions {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.width.hash(state);
        self.height.hash(state);
    }
}

impl fmt::Display for TileDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={}[{}x{}]", self.id, self.width, self.height)
    }
}

/// A panel together with its permutation group tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupedTileDimensions {
    pub dims: TileDimensions,
    pub group: u32,
}

impl GroupedTileDimensions {
    pub fn new(dims: TileDimensions, group: u32) -> Self {
        Self { dims, group }
    }

    pub fn area(&self) -> u64 {
        self.dims.area()
    }
}

impl fmt::Display for GroupedTileDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={}, group={}[{}x{}]",
            self.dims.id, self.group, self.dims.width, self.dims.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate90_swaps_sides_and_flips_grain() {
        let t = TileDimensions::new(7, 100, 50, "MDF", Grain::Horizontal, None);
        let r = t.rotate90();
        assert_eq!(r.width, 50);
        assert_eq!(r.height, 100);
        assert_eq!(r.grain, Grain::Vertical);
        assert!(r.is_rotated);
        assert_eq!(r.rotate90().grain, Grain::Horizontal);
    }

    #[test]
    fn test_equality_uses_id_and_sides() {
        let a = TileDimensions::new(1, 10, 20, "A", Grain::Any, None);
        let b = TileDimensions::new(1, 10, 20, "B", Grain::Vertical, Some("x".into()));
        let c = TileDimensions::new(2, 10, 20, "A", Grain::Any, None);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fits_either_orientation() {
        let stock = TileDimensions::sized(50, 100);
        assert!(stock.fits(&TileDimensions::sized(100, 50)));
        assert!(stock.fits(&TileDimensions::sized(50, 100)));
        assert!(!stock.fits(&TileDimensions::sized(101, 50)));
    }

    #[test]
    fn test_dimensions_hash_ignores_id() {
        let a = TileDimensions::new(1, 10, 20, "A", Grain::Any, None);
        let b = TileDimensions::new(9, 10, 20, "A", Grain::Any, None);
        assert_eq!(a.dimensions_hash(), b.dimensions_hash());
    }

    #[test]
    fn test_group_distinguishes_equal_dims() {
        let dims = TileDimensions::sized(10, 20);
        let g0 = GroupedTileDimensions::new(dims.clone(), 0);
        let g1 = GroupedTileDimensions::new(dims, 1);
        assert_ne!(g0, g1);
    }
}
