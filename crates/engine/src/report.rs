//! Response building.
//!
//! Takes the best solution of every material beam, unions them and projects
//! the result into the flat [`CalculationResponse`], scaling every coordinate
//! back to input units.

use std::collections::HashMap;

use cutlist_core::scale::{unscale, unscale_area};
use cutlist_core::{
    CalculationResponse, Cut, FinalTile, NoFitTile, Panel, ResponseCut, ResponseMosaic,
    ResponseTile, Solution, TileDimensions, TileNode, DEFAULT_MATERIAL,
};

use crate::guard;
use crate::task::Task;

/// Accumulates edge-banding lengths per tag over the placed panels.
///
/// Top and bottom edges contribute the panel width (the height when the leaf
/// is rotated); left and right edges contribute the other side.
pub fn calc_edge_bands(
    nodes: &[&TileNode],
    panels: &[Panel],
    factor: f64,
) -> HashMap<String, f64> {
    let mut bands = HashMap::new();
    for panel in panels {
        let Some(edge) = &panel.edge else { continue };
        for node in nodes {
            if node.external_id != Some(panel.id) {
                continue;
            }
            let (top_bottom, left_right) = if node.is_rotated {
                (node.height() as f64 / factor, node.width() as f64 / factor)
            } else {
                (node.width() as f64 / factor, node.height() as f64 / factor)
            };
            for (tag, length) in [
                (&edge.top, top_bottom),
                (&edge.bottom, top_bottom),
                (&edge.left, left_right),
                (&edge.right, left_right),
            ] {
                if let Some(tag) = tag {
                    *bands.entry(tag.clone()).or_insert(0.0) += length;
                }
            }
        }
    }
    bands
}

/// Builds the response from the task's current beams.
pub fn build_response(task: &Task) -> CalculationResponse {
    let request = task.request();
    let factor = task.factor();
    let mut response = CalculationResponse::new(task.id().to_string());

    // union the best solution of every material
    let mut aggregate = Solution::new();
    let mut contributing_ids: Vec<i64> = Vec::new();
    let mut latest_timestamp = 0u64;
    let mut empty_materials: Vec<String> = Vec::new();
    for material in task.materials() {
        let Some(beam) = task.solutions(&material) else {
            continue;
        };
        let beam = guard(&beam);
        match beam.first() {
            Some(best) => {
                contributing_ids.push(best.id() as i64);
                aggregate.add_all_mosaics(best.mosaics.iter().cloned());
                aggregate
                    .no_fit_panels
                    .extend(best.no_fit_panels.iter().cloned());
                latest_timestamp = latest_timestamp.max(best.timestamp());
            }
            None => empty_materials.push(material),
        }
    }
    if !aggregate.mosaics.is_empty() {
        for material in &empty_materials {
            for tile in task.tiles_for_material(material) {
                add_no_fit_tile(&mut response, &tile, request.panels.as_slice(), factor);
            }
        }
    }
    aggregate.no_fit_panels.extend(task.no_material_tiles());

    let mut id_hash: i32 = 1;
    for id in &contributing_ids {
        id_hash = id_hash.wrapping_mul(31).wrapping_add(*id as i32);
    }
    response.id = id_hash.to_string();
    response.solution_elapsed_time =
        (latest_timestamp > 0).then(|| latest_timestamp.saturating_sub(task.start_time()));
    response.request = Some(request.clone());

    for mosaic in &aggregate.mosaics {
        let mut dto = ResponseMosaic {
            request_stock_id: Some(mosaic.stock_id),
            used_area: unscale_area(mosaic.used_area(), factor),
            wasted_area: unscale_area(mosaic.unused_area(), factor),
            used_area_ratio: mosaic.root.used_area_ratio(),
            nbr_final_panels: mosaic.root.nbr_final_tiles(),
            nbr_wasted_panels: mosaic.root.nbr_unused_tiles(),
            material: Some(mosaic.material.clone()).filter(|m| m != DEFAULT_MATERIAL),
            ..ResponseMosaic::default()
        };
        flatten_tiles(&mosaic.root, &mut dto.tiles, factor);
        let cut_length: u64 = mosaic.cuts.iter().map(Cut::length).sum();
        dto.cut_length = unscale(cut_length, factor);
        dto.edge_bands = calc_edge_bands(&mosaic.final_nodes(), &request.panels, factor);

        for panel in &request.panels {
            for tile in dto.tiles.iter_mut() {
                if tile.request_obj_id == Some(panel.id) {
                    tile.orientation = panel.orientation;
                    if let Some(label) = &panel.label {
                        tile.label = Some(label.clone());
                    }
                    if let Some(edge) = &panel.edge {
                        tile.edge = Some(edge.clone());
                    }
                }
            }
        }
        for stock_panel in &request.stock_panels {
            if dto.request_stock_id == Some(stock_panel.id) {
                dto.stock_label = stock_panel.label.clone();
                if let Some(root_tile) = dto.tiles.first_mut() {
                    root_tile.orientation = stock_panel.orientation;
                }
            }
        }
        dto.panels =
            aggregate_final_tiles(&mosaic.final_nodes(), &request.panels, factor, false);
        dto.cuts = mosaic
            .cuts
            .iter()
            .map(|cut| ResponseCut::from_cut(cut, factor))
            .collect();
        response.mosaics.push(dto);
    }

    for tile in &aggregate.no_fit_panels {
        add_no_fit_tile(&mut response, tile, request.panels.as_slice(), factor);
    }

    let mut used_area = 0.0;
    let mut wasted_area = 0.0;
    let mut cut_length = 0.0;
    let mut nbr_cuts = 0usize;
    for mosaic in &response.mosaics {
        used_area += mosaic.used_area;
        wasted_area += mosaic.wasted_area;
        nbr_cuts += mosaic.cuts.len();
        cut_length += mosaic.cut_length;
    }
    response.total_used_area = used_area;
    response.total_wasted_area = wasted_area;
    response.total_used_area_ratio = if used_area + wasted_area > 0.0 {
        used_area / (used_area + wasted_area)
    } else {
        0.0
    };
    response.total_nbr_cuts = nbr_cuts;
    response.total_cut_length = cut_length;
    response.elapsed_time = task.elapsed_millis();
    response.edge_bands = calc_edge_bands(&aggregate.final_nodes(), &request.panels, factor);
    response.panels = aggregate_final_tiles(&aggregate.final_nodes(), &request.panels, factor, true);
    response.used_stock_panels = aggregate_used_stock(&aggregate, &request.stock_panels, factor);
    response
}

/// Pre-order flattening of one mosaic tree.
fn flatten_tiles(node: &TileNode, out: &mut Vec<ResponseTile>, factor: f64) {
    out.push(ResponseTile::from_node(node, factor));
    if let Some(child) = node.child1.as_deref() {
        flatten_tiles(child, out, factor);
    }
    if let Some(child) = node.child2.as_deref() {
        flatten_tiles(child, out, factor);
    }
}

/// Aggregates final leaves by demand id. The global variant
/// (`rotation_corrected`) reports the demand's own width x height for rotated
/// leaves and carries the demand id; the per-mosaic variant reports the
/// leaves as placed.
fn aggregate_final_tiles(
    nodes: &[&TileNode],
    panels: &[Panel],
    factor: f64,
    rotation_corrected: bool,
) -> Vec<FinalTile> {
    let mut order: Vec<i32> = Vec::new();
    let mut by_id: HashMap<i32, FinalTile> = HashMap::new();
    for node in nodes {
        let id = node.external_id.unwrap_or(-1);
        if let Some(existing) = by_id.get_mut(&id) {
            existing.count += 1;
            continue;
        }
        let (width, height) = if rotation_corrected && node.is_rotated {
            (node.height(), node.width())
        } else {
            (node.width(), node.height())
        };
        let label = panels
            .iter()
            .find(|p| p.id == id && p.label.is_some())
            .and_then(|p| p.label.clone());
        by_id.insert(
            id,
            FinalTile {
                request_obj_id: rotation_corrected.then_some(id),
                width: width as f64 / factor,
                height: height as f64 / factor,
                count: 1,
                label,
            },
        );
        order.push(id);
    }
    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

/// Aggregates the sheets in use by stock id.
fn aggregate_used_stock(
    aggregate: &Solution,
    stock_panels: &[Panel],
    factor: f64,
) -> Vec<FinalTile> {
    let mut order: Vec<i32> = Vec::new();
    let mut by_id: HashMap<i32, FinalTile> = HashMap::new();
    for mosaic in &aggregate.mosaics {
        let id = mosaic.stock_id;
        if let Some(existing) = by_id.get_mut(&id) {
            existing.count += 1;
            continue;
        }
        let label = stock_panels
            .iter()
            .find(|p| p.id == id && p.label.is_some())
            .and_then(|p| p.label.clone());
        by_id.insert(
            id,
            FinalTile {
                request_obj_id: Some(id),
                width: mosaic.root.width() as f64 / factor,
                height: mosaic.root.height() as f64 / factor,
                count: 1,
                label,
            },
        );
        order.push(id);
    }
    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

fn add_no_fit_tile(
    response: &mut CalculationResponse,
    tile: &TileDimensions,
    panels: &[Panel],
    factor: f64,
) {
    if let Some(existing) = response.no_fit_panels.iter_mut().find(|t| t.id == tile.id) {
        existing.count += 1;
        return;
    }
    let source = panels.iter().find(|p| p.id == tile.id);
    response.no_fit_panels.push(NoFitTile {
        id: tile.id,
        width: tile.width as f64 / factor,
        height: tile.height as f64 / factor,
        count: 1,
        label: source.and_then(|p| p.label.clone()),
        material: source
            .map(|p| p.material.clone())
            .filter(|m| m != DEFAULT_MATERIAL),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutlist_core::{Edge, Grain};

    fn final_leaf(id: i32, w: u32, h: u32, rotated: bool) -> TileNode {
        let mut node = TileNode::new(0, 0, w, h);
        node.external_id = Some(id);
        node.is_final = true;
        node.is_rotated = rotated;
        node
    }

    fn edged_panel(id: i32, w: &str, h: &str) -> Panel {
        Panel::new(id, w, h, 1).with_edge(Edge {
            top: Some("pvc".into()),
            left: Some("abs".into()),
            bottom: None,
            right: None,
        })
    }

    #[test]
    fn test_edge_bands_accumulate_by_tag() {
        let panels = vec![edged_panel(1, "100", "50")];
        let a = final_leaf(1, 100, 50, false);
        let b = final_leaf(1, 100, 50, false);
        let bands = calc_edge_bands(&[&a, &b], &panels, 1.0);
        assert_eq!(bands["pvc"], 200.0); // two top edges of width 100
        assert_eq!(bands["abs"], 100.0); // two left edges of height 50
    }

    #[test]
    fn test_edge_bands_swap_for_rotated_leaves() {
        let panels = vec![edged_panel(1, "100", "50")];
        // placed rotated: leaf is 50x100
        let node = final_leaf(1, 50, 100, true);
        let bands = calc_edge_bands(&[&node], &panels, 1.0);
        assert_eq!(bands["pvc"], 100.0); // top edge still the demand width
        assert_eq!(bands["abs"], 50.0);
    }

    #[test]
    fn test_edge_bands_scale_back() {
        let panels = vec![edged_panel(1, "10.0", "5.0")];
        let node = final_leaf(1, 100, 50, false);
        let bands = calc_edge_bands(&[&node], &panels, 10.0);
        assert_eq!(bands["pvc"], 10.0);
        assert_eq!(bands["abs"], 5.0);
    }

    #[test]
    fn test_aggregate_final_tiles_counts_and_rotation() {
        let a = final_leaf(1, 100, 50, false);
        let b = final_leaf(1, 100, 50, false);
        let c = final_leaf(2, 30, 80, true);
        let panels = vec![Panel::new(1, "100", "50", 2).with_label("shelf")];
        let tiles = aggregate_final_tiles(&[&a, &b, &c], &panels, 1.0, true);
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].request_obj_id, Some(1));
        assert_eq!(tiles[0].count, 2);
        assert_eq!(tiles[0].label.as_deref(), Some("shelf"));
        // rotated leaf reports the demand's own orientation
        assert_eq!(tiles[1].width, 80.0);
        assert_eq!(tiles[1].height, 30.0);
    }

    #[test]
    fn test_no_fit_aggregation_by_id() {
        let mut response = CalculationResponse::new("t".into());
        let tile = TileDimensions::new(7, 10, 20, DEFAULT_MATERIAL, Grain::Any, None);
        let panels = vec![Panel::new(7, "10", "20", 2)];
        add_no_fit_tile(&mut response, &tile, &panels, 1.0);
        add_no_fit_tile(&mut response, &tile, &panels, 1.0);
        assert_eq!(response.no_fit_panels.len(), 1);
        assert_eq!(response.no_fit_panels[0].count, 2);
        assert!(response.no_fit_panels[0].material.is_none());
    }
}
