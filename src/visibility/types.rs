//! Core data structures for the visibility engine.
//!
//! Obstacles are authored by the surrounding application and handed in as a
//! borrowed slice for every query. Everything derived from them (segments,
//! shadow polygons, containing sets) lives only for the call that built it.

use serde::{Deserialize, Serialize};

/// Simple 2D point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// True when both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Ordered pair of points. Orientation matters only for facing tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
}

impl Segment {
    pub const fn new(p1: Point, p2: Point) -> Self {
        Segment { p1, p2 }
    }

    /// Same segment walked the other way, which flips its normal.
    pub fn reversed(&self) -> Segment {
        Segment { p1: self.p2, p2: self.p1 }
    }

    pub fn midpoint(&self) -> Point {
        Point {
            x: (self.p1.x + self.p2.x) / 2.0,
            y: (self.p1.y + self.p2.y) / 2.0,
        }
    }
}

/// Permitted viewing direction of a one-way wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Unit vector in map space (y grows downwards).
    pub fn unit_vector(self) -> (f64, f64) {
        match self {
            Direction::North => (0.0, -1.0),
            Direction::South => (0.0, 1.0),
            Direction::East => (1.0, 0.0),
            Direction::West => (-1.0, 0.0),
        }
    }
}

/// Obstacle kinds represented as tagged enum.
///
/// * `Wall` - 2 points form one segment, more points an open chain.
/// * `Rectangle` - top-left and bottom-right corners.
/// * `Polygon` - 3 or more points forming a closed loop.
/// * `OneWayWall` - single segment that only blocks from one side.
/// * `Door` - single segment that blocks while closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ObstacleKind {
    Wall,
    Rectangle,
    Polygon,
    OneWayWall {
        #[serde(default)]
        direction: Direction,
    },
    Door {
        #[serde(default)]
        is_open: bool,
    },
}

impl ObstacleKind {
    /// Short lowercase name used in logs and the inspector.
    pub fn label(&self) -> &'static str {
        match self {
            ObstacleKind::Wall => "wall",
            ObstacleKind::Rectangle => "rectangle",
            ObstacleKind::Polygon => "polygon",
            ObstacleKind::OneWayWall { .. } => "one-way-wall",
            ObstacleKind::Door { .. } => "door",
        }
    }
}

/// An authored shape that blocks line of sight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Opaque identifier, only meaningful to the editor.
    pub id: String,
    #[serde(flatten)]
    pub kind: ObstacleKind,
    #[serde(default)]
    pub points: Vec<Point>,
    /// Presentation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Presentation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

impl Obstacle {
    pub fn new(id: impl Into<String>, kind: ObstacleKind, points: Vec<Point>) -> Self {
        Obstacle {
            id: id.into(),
            kind,
            points,
            color: None,
            opacity: None,
        }
    }

    pub fn wall(id: impl Into<String>, points: Vec<Point>) -> Self {
        Self::new(id, ObstacleKind::Wall, points)
    }

    pub fn rectangle(id: impl Into<String>, top_left: Point, bottom_right: Point) -> Self {
        Self::new(id, ObstacleKind::Rectangle, vec![top_left, bottom_right])
    }

    pub fn polygon(id: impl Into<String>, points: Vec<Point>) -> Self {
        Self::new(id, ObstacleKind::Polygon, points)
    }

    pub fn one_way_wall(id: impl Into<String>, p1: Point, p2: Point, direction: Direction) -> Self {
        Self::new(id, ObstacleKind::OneWayWall { direction }, vec![p1, p2])
    }

    pub fn door(id: impl Into<String>, p1: Point, p2: Point, is_open: bool) -> Self {
        Self::new(id, ObstacleKind::Door { is_open }, vec![p1, p2])
    }

    /// Closed polygon with enough points to enclose an area.
    pub fn is_closed_polygon(&self) -> bool {
        matches!(self.kind, ObstacleKind::Polygon) && self.points.len() >= 3
    }
}

/// Size of the rendered map area.
///
/// Only used to pick how far shadows are extended; it is not a clip boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub width: f64,
    pub height: f64,
}

impl MapBounds {
    pub const fn new(width: f64, height: f64) -> Self {
        MapBounds { width, height }
    }

    /// Distance that takes a shadow edge past any point of the map.
    pub fn extend_distance(&self) -> f64 {
        self.width.max(self.height) * 2.0
    }
}

/// Ordered vertex list of a region hidden from one viewer.
pub type ShadowPolygon = Vec<Point>;

/// Everything the compositor needs to paint one viewer's occlusion.
#[derive(Debug, Clone, Default)]
pub struct ShadowSet<'a> {
    /// Regions to paint as occluded: wall shadows and polygon interiors.
    pub shadows: Vec<ShadowPolygon>,
    /// Closed polygons containing the viewer; everything outside them is hidden.
    pub containing_polygons: Vec<&'a Obstacle>,
}

impl ShadowSet<'_> {
    pub fn is_empty(&self) -> bool {
        self.shadows.is_empty() && self.containing_polygons.is_empty()
    }
}
