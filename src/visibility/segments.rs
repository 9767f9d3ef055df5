//! Obstacle to boundary-segment decomposition.

use super::geometry::point_in_polygon;
use super::types::{Obstacle, ObstacleKind, Point, Segment};

/// The four sides of the rectangle spanned by two corners: top, right,
/// bottom, left.
pub fn rectangle_segments(top_left: Point, bottom_right: Point) -> [Segment; 4] {
    let top_right = Point { x: bottom_right.x, y: top_left.y };
    let bottom_left = Point { x: top_left.x, y: bottom_right.y };
    [
        Segment::new(top_left, top_right),
        Segment::new(top_right, bottom_right),
        Segment::new(bottom_right, bottom_left),
        Segment::new(bottom_left, top_left),
    ]
}

/// Decompose an obstacle into its boundary segments.
///
/// * `Wall` - one segment per consecutive pair (open chain).
/// * `Rectangle` - four sides of the two corner points.
/// * `Polygon` - consecutive pairs plus the closing segment.
/// * `OneWayWall`, `Door` - the segment between the first two points.
///
/// Obstacles without enough points yield an empty list.
pub fn segments_of(obstacle: &Obstacle) -> Vec<Segment> {
    let pts = &obstacle.points;
    match obstacle.kind {
        ObstacleKind::Wall => pts.windows(2).map(|w| Segment::new(w[0], w[1])).collect(),
        ObstacleKind::Rectangle => {
            if pts.len() < 2 {
                return Vec::new();
            }
            rectangle_segments(pts[0], pts[1]).to_vec()
        }
        ObstacleKind::Polygon => {
            let n = pts.len();
            if n < 3 {
                return Vec::new();
            }
            (0..n).map(|i| Segment::new(pts[i], pts[(i + 1) % n])).collect()
        }
        ObstacleKind::OneWayWall { .. } | ObstacleKind::Door { .. } => {
            if pts.len() < 2 {
                return Vec::new();
            }
            vec![Segment::new(pts[0], pts[1])]
        }
    }
}

/// Collect the segments of every obstacle in order.
pub fn segments_from_obstacles(obstacles: &[Obstacle]) -> Vec<Segment> {
    obstacles.iter().flat_map(segments_of).collect()
}

impl Obstacle {
    /// Boundary segments of this obstacle.
    pub fn segments(&self) -> Vec<Segment> {
        segments_of(self)
    }

    /// Containment test, only meaningful for closed polygons.
    pub fn contains(&self, point: &Point) -> bool {
        self.is_closed_polygon() && point_in_polygon(point, &self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::types::Direction;

    fn p(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    #[test]
    fn two_point_wall_is_one_segment() {
        let wall = Obstacle::wall("w", vec![p(100.0, 0.0), p(100.0, 100.0)]);
        assert_eq!(segments_of(&wall), vec![Segment::new(p(100.0, 0.0), p(100.0, 100.0))]);
    }

    #[test]
    fn wall_chain_is_open() {
        let wall = Obstacle::wall("w", vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]);
        let segs = segments_of(&wall);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[2], Segment::new(p(10.0, 10.0), p(0.0, 10.0)));
        assert!(segs.iter().all(|s| s.p2 != p(0.0, 0.0)));
    }

    #[test]
    fn rectangle_sides_in_order() {
        let rect = Obstacle::rectangle("r", p(50.0, 50.0), p(150.0, 150.0));
        let segs = segments_of(&rect);
        assert_eq!(
            segs,
            vec![
                Segment::new(p(50.0, 50.0), p(150.0, 50.0)),
                Segment::new(p(150.0, 50.0), p(150.0, 150.0)),
                Segment::new(p(150.0, 150.0), p(50.0, 150.0)),
                Segment::new(p(50.0, 150.0), p(50.0, 50.0)),
            ]
        );
    }

    #[test]
    fn polygon_closes_loop() {
        let tri = Obstacle::polygon("t", vec![p(0.0, 0.0), p(10.0, 0.0), p(5.0, 8.0)]);
        let segs = segments_of(&tri);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[2], Segment::new(p(5.0, 8.0), p(0.0, 0.0)));
    }

    #[test]
    fn degenerate_obstacles_have_no_segments() {
        assert!(segments_of(&Obstacle::wall("w", vec![p(1.0, 1.0)])).is_empty());
        assert!(segments_of(&Obstacle::wall("w", vec![])).is_empty());
        assert!(segments_of(&Obstacle::polygon("p", vec![p(0.0, 0.0), p(1.0, 1.0)])).is_empty());
        assert!(segments_of(&Obstacle::new("r", ObstacleKind::Rectangle, vec![p(0.0, 0.0)])).is_empty());
        assert!(segments_of(&Obstacle::new("d", ObstacleKind::Door { is_open: false }, vec![])).is_empty());
    }

    #[test]
    fn door_and_one_way_wall_use_first_two_points() {
        let door = Obstacle::door("d", p(0.0, 0.0), p(0.0, 5.0), true);
        assert_eq!(door.segments().len(), 1);
        let one_way = Obstacle::one_way_wall("o", p(0.0, 0.0), p(5.0, 0.0), Direction::South);
        assert_eq!(one_way.segments(), vec![Segment::new(p(0.0, 0.0), p(5.0, 0.0))]);
    }

    #[test]
    fn contains_only_for_closed_polygons() {
        let square = Obstacle::polygon("s", vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]);
        assert!(square.contains(&p(5.0, 5.0)));
        assert!(!square.contains(&p(15.0, 5.0)));
        let rect = Obstacle::rectangle("r", p(0.0, 0.0), p(10.0, 10.0));
        assert!(!rect.contains(&p(5.0, 5.0)));
    }

    #[test]
    fn segments_from_obstacles_concatenates() {
        let obstacles = vec![
            Obstacle::wall("w", vec![p(0.0, 0.0), p(1.0, 0.0)]),
            Obstacle::rectangle("r", p(0.0, 0.0), p(1.0, 1.0)),
        ];
        assert_eq!(segments_from_obstacles(&obstacles).len(), 5);
    }
}
