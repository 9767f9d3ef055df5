//! Visibility across several viewers.
//!
//! A point stays hidden only while every viewer has it in shadow; one viewer
//! with a clear line of sight reveals it. Per-viewer shadow sets are
//! independent, so they are computed in parallel.

use rayon::prelude::*;

use super::shadow::{is_point_in_shadow_set, shadow_polygons_for};
use super::types::{MapBounds, Obstacle, Point, ShadowSet};

/// Shadow sets for each viewer, in viewer order.
pub fn shadow_sets_for<'a>(viewers: &[Point], obstacles: &'a [Obstacle], bounds: &MapBounds) -> Vec<ShadowSet<'a>> {
    viewers
        .par_iter()
        .map(|viewer| shadow_polygons_for(viewer, obstacles, bounds))
        .collect()
}

/// True when the point is hidden from every one of the given shadow sets.
///
/// An empty list reveals nothing and hides nothing, so it returns `false`.
pub fn is_point_hidden_in_all(target: &Point, sets: &[ShadowSet<'_>]) -> bool {
    !sets.is_empty() && sets.iter().all(|set| is_point_in_shadow_set(target, set))
}

/// Check if a point is hidden from all viewers.
pub fn is_point_hidden_from_all(target: &Point, viewers: &[Point], obstacles: &[Obstacle], bounds: &MapBounds) -> bool {
    if viewers.is_empty() || obstacles.is_empty() {
        return false;
    }
    let sets = shadow_sets_for(viewers, obstacles, bounds);
    is_point_hidden_in_all(target, &sets)
}

/// Indices of the targets visible to at least one viewer.
///
/// Shadow sets are built once and reused for every target.
pub fn visible_targets(targets: &[Point], viewers: &[Point], obstacles: &[Obstacle], bounds: &MapBounds) -> Vec<usize> {
    let sets = shadow_sets_for(viewers, obstacles, bounds);
    targets
        .iter()
        .enumerate()
        .filter(|(_, t)| !is_point_hidden_in_all(t, &sets))
        .map(|(i, _)| i)
        .collect()
}
