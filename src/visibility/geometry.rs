//! Geometry calculations for line-of-sight and occlusion.
//!
//! Contains helper functions for:
//! - Point-in-polygon tests (ray casting)
//! - Segment facing tests against a viewer position
//! - Distance helpers used when extending shadows

use super::types::{Point, Segment};

/// Squared Euclidean distance (avoids a sqrt when only comparing distances).
pub fn distance2(a: &Point, b: &Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Euclidean distance between two points.
pub fn distance(a: &Point, b: &Point) -> f64 {
    distance2(a, b).sqrt()
}

/// Ray-casting point-in-polygon test.
///
/// Casts a horizontal ray from `point` towards +x and toggles on every edge
/// crossing. The division by `yj - yi` is only reached when the edge
/// endpoints sit on opposite sides of the ray, so horizontal edges never
/// count as crossings.
///
/// # Parameters
///
/// * `point` - Point to classify
/// * `polygon` - Vertices of a closed polygon, in either winding order
///
/// # Returns
///
/// `true` if the point lies inside the polygon, `false` otherwise or when
/// the polygon has fewer than 3 vertices.
pub fn point_in_polygon(point: &Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);
        if (yi > point.y) != (yj > point.y) {
            let intersect_x = (xj - xi) * (point.y - yi) / (yj - yi) + xi;
            if point.x < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Check whether the viewer is on the side a segment's normal points to.
///
/// The normal is `(-dy, dx)` for the segment direction `(dx, dy)`, so
/// reversing a segment flips the side it faces.
pub fn segment_faces_viewer(viewer: &Point, segment: &Segment) -> bool {
    let mid = segment.midpoint();
    let to_viewer_x = viewer.x - mid.x;
    let to_viewer_y = viewer.y - mid.y;

    let dx = segment.p2.x - segment.p1.x;
    let dy = segment.p2.y - segment.p1.y;
    let (nx, ny) = (-dy, dx);

    to_viewer_x * nx + to_viewer_y * ny > 0.0
}

/// Shoelace area of a polygon. Positive when the vertices run clockwise on a
/// y-down map, negative for the opposite winding.
pub fn signed_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (polygon[i], polygon[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice / 2.0
}

/// Squared distance from a point to the closest point of a segment.
pub fn point_to_segment_distance2(p: &Point, segment: &Segment) -> f64 {
    let dx = segment.p2.x - segment.p1.x;
    let dy = segment.p2.y - segment.p1.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return distance2(p, &segment.p1);
    }
    let t = (((p.x - segment.p1.x) * dx + (p.y - segment.p1.y) * dy) / len2).clamp(0.0, 1.0);
    let closest = Point {
        x: segment.p1.x + t * dx,
        y: segment.p1.y + t * dy,
    };
    distance2(p, &closest)
}
