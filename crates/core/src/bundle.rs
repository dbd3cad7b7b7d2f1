//! Stock bundles.

use std::collections::HashMap;
use std::fmt;

use crate::tile::TileDimensions;

/// One candidate multiset of stock sheets proposed as the containers for a
/// whole solution.
///
/// Equality is multiset equality over (width, height) pairs, regardless of
/// order or sheet ids.
#[derive(Debug, Clone)]
pub struct StockBundle {
    panels: Vec<TileDimensions>,
}

impl StockBundle {
    pub fn new(panels: Vec<TileDimensions>) -> Self {
        Self { panels }
    }

    pub fn empty() -> Self {
        Self { panels: Vec::new() }
    }

    pub fn add(&mut self, panel: TileDimensions) {
        self.panels.push(panel);
    }

    pub fn panels(&self) -> &[TileDimensions] {
        &self.panels
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn total_area(&self) -> u64 {
        self.panels.iter().map(TileDimensions::area).sum()
    }

    pub fn sort_panels_asc(&mut self) {
        self.panels.sort_by_key(TileDimensions::area);
    }

    pub fn sort_panels_desc(&mut self) {
        self.panels.sort_by_key(|p| std::cmp::Reverse(p.area()));
    }

    /// True when every sheet in the bundle shares the same dimensions
    /// (in either orientation).
    pub fn has_unique_panel_size(&self) -> bool {
        match self.panels.first() {
            None => true,
            Some(first) => self.panels.iter().all(|p| p.has_same_dimensions(first)),
        }
    }

    fn dimension_counts(&self) -> HashMap<(u32, u32), usize> {
        let mut counts = HashMap::new();
        for panel in &self.panels {
            *counts.entry((panel.width, panel.height)).or_insert(0) += 1;
        }
        counts
    }

    /// "WxH*count" rendering grouped by sheet size, for log lines.
    pub fn to_string_grouped(&self) -> String {
        let counts = self.dimension_counts();
        let mut entries: Vec<_> = counts.into_iter().collect();
        entries.sort();
        entries
            .into_iter()
            .map(|((w, h), n)| format!("{}x{}*{}", w, h, n))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PartialEq for StockBundle {
    fn eq(&self, other: &Self) -> bool {
        self.panels.len() == other.panels.len()
            && self.dimension_counts() == other.dimension_counts()
    }
}

impl Eq for StockBundle {}

impl fmt::Display for StockBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for panel in &self.panels {
            write!(f, "[{}x{}]", panel.width, panel.height)?;
        }
        Ok(())
    }
}
