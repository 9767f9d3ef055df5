//! Shadow casting for a single viewer.
//!
//! Every occluding segment sweeps a quadrilateral away from the viewer that
//! is long enough to leave the map. Closed polygons are handled separately:
//! seen from outside, their interior is hidden; seen from inside, everything
//! outside them is hidden (the compositor builds that inverted mask from
//! `ShadowSet::containing_polygons`).

use log::{debug, trace};

use super::geometry::{distance, point_in_polygon, segment_faces_viewer};
use super::segments::segments_of;
use super::types::{Direction, MapBounds, Obstacle, ObstacleKind, Point, Segment, ShadowPolygon, ShadowSet};

/// Below this length the viewer is treated as sitting on the endpoint.
const MIN_RAY_LENGTH: f64 = 0.001;

/// Calculate the shadow polygon cast by a segment from a viewer's position.
///
/// # Parameters
///
/// * `viewer` - Position the shadow is cast from
/// * `segment` - Occluding segment
/// * `bounds` - Map size, picks how far the shadow is extended
///
/// # Returns
///
/// `[p1, far1, far2, p2]`, or `None` when the viewer coincides with an
/// endpoint and the direction is undefined.
pub fn shadow_polygon_for(viewer: &Point, segment: &Segment, bounds: &MapBounds) -> Option<ShadowPolygon> {
    let extend = bounds.extend_distance();

    let (dx1, dy1) = (segment.p1.x - viewer.x, segment.p1.y - viewer.y);
    let (dx2, dy2) = (segment.p2.x - viewer.x, segment.p2.y - viewer.y);

    let len1 = distance(viewer, &segment.p1);
    let len2 = distance(viewer, &segment.p2);
    if len1 < MIN_RAY_LENGTH || len2 < MIN_RAY_LENGTH {
        return None;
    }

    let far1 = Point {
        x: segment.p1.x + dx1 / len1 * extend,
        y: segment.p1.y + dy1 / len1 * extend,
    };
    let far2 = Point {
        x: segment.p2.x + dx2 / len2 * extend,
        y: segment.p2.y + dy2 / len2 * extend,
    };

    Some(vec![segment.p1, far1, far2, segment.p2])
}

/// Whether a one-way wall blocks sight for this viewer.
///
/// The wall normal is oriented along the permitted viewing direction; a
/// viewer on the side that normal points to looks against the allowed
/// direction and is blocked.
pub fn one_way_wall_blocks(viewer: &Point, segment: &Segment, direction: Direction) -> bool {
    segment_faces_viewer(viewer, &oriented_one_way(segment, direction))
}

/// Unit normal of a one-way wall, pointing along the permitted direction.
///
/// Diagonal walls keep their own normal; only its sign follows `direction`.
/// Zero-length walls have no normal and return `(0.0, 0.0)`.
pub fn one_way_normal(segment: &Segment, direction: Direction) -> (f64, f64) {
    let oriented = oriented_one_way(segment, direction);
    let (dx, dy) = (oriented.p2.x - oriented.p1.x, oriented.p2.y - oriented.p1.y);
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (0.0, 0.0);
    }
    (-dy / len, dx / len)
}

fn oriented_one_way(segment: &Segment, direction: Direction) -> Segment {
    let (tx, ty) = direction.unit_vector();
    let (nx, ny) = (-(segment.p2.y - segment.p1.y), segment.p2.x - segment.p1.x);
    if nx * tx + ny * ty < 0.0 { segment.reversed() } else { *segment }
}

/// Closed polygon obstacles whose interior contains the viewer.
pub fn polygons_containing_viewer<'a>(viewer: &Point, obstacles: &'a [Obstacle]) -> Vec<&'a Obstacle> {
    obstacles
        .iter()
        .filter(|obs| obs.is_closed_polygon() && point_in_polygon(viewer, &obs.points))
        .collect()
}

fn push_segment_shadows(viewer: &Point, segments: &[Segment], bounds: &MapBounds, shadows: &mut Vec<ShadowPolygon>) {
    for segment in segments {
        if let Some(shadow) = shadow_polygon_for(viewer, segment, bounds) {
            shadows.push(shadow);
        }
    }
}

/// Calculate every shadow polygon for one viewer.
///
/// Walls, rectangles, closed doors and blocking one-way walls cast a shadow
/// from each of their segments. Polygons seen from outside hide their own
/// interior; polygons containing the viewer are reported in
/// `containing_polygons` instead.
pub fn shadow_polygons_for<'a>(viewer: &Point, obstacles: &'a [Obstacle], bounds: &MapBounds) -> ShadowSet<'a> {
    let mut set = ShadowSet::default();

    for obstacle in obstacles {
        match obstacle.kind {
            ObstacleKind::Polygon => {
                if obstacle.points.len() < 3 {
                    trace!("Polygon {} has fewer than 3 points, skipped", obstacle.id);
                    continue;
                }
                if point_in_polygon(viewer, &obstacle.points) {
                    set.containing_polygons.push(obstacle);
                } else {
                    set.shadows.push(obstacle.points.clone());
                }
            }
            ObstacleKind::Door { is_open: true } => {}
            ObstacleKind::OneWayWall { direction } => {
                let segments = segments_of(obstacle);
                let blocking: Vec<Segment> = segments
                    .into_iter()
                    .filter(|s| one_way_wall_blocks(viewer, s, direction))
                    .collect();
                push_segment_shadows(viewer, &blocking, bounds, &mut set.shadows);
            }
            ObstacleKind::Wall | ObstacleKind::Rectangle | ObstacleKind::Door { is_open: false } => {
                push_segment_shadows(viewer, &segments_of(obstacle), bounds, &mut set.shadows);
            }
        }
    }

    debug!(
        "Viewer ({:.1}, {:.1}): {} shadows, {} containing polygons from {} obstacles",
        viewer.x,
        viewer.y,
        set.shadows.len(),
        set.containing_polygons.len(),
        obstacles.len()
    );
    set
}

/// Test a point against an already computed shadow set.
pub fn is_point_in_shadow_set(target: &Point, set: &ShadowSet<'_>) -> bool {
    if set.shadows.iter().any(|shadow| point_in_polygon(target, shadow)) {
        return true;
    }
    set.containing_polygons
        .iter()
        .any(|polygon| !point_in_polygon(target, &polygon.points))
}

/// Check if a point is hidden from a viewer by the given obstacles.
///
/// Occluded when the target lies inside any shadow polygon, or outside any
/// closed polygon the viewer stands in.
pub fn is_point_in_shadow(target: &Point, viewer: &Point, obstacles: &[Obstacle], bounds: &MapBounds) -> bool {
    if obstacles.is_empty() {
        return false;
    }
    let set = shadow_polygons_for(viewer, obstacles, bounds);
    is_point_in_shadow_set(target, &set)
}
