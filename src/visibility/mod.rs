//! Line-of-sight engine.
//!
//! This module turns obstacle lists and viewer positions into occlusion
//! data. It integrates:
//! - Geometry primitives (point-in-polygon, segment facing)
//! - Obstacle to segment decomposition
//! - Per-viewer shadow casting and the point-in-shadow predicate
//! - Multi-viewer union of visible regions
//!
//! ## Module Organization
//!
//! - `types`: Core data structures (Point, Segment, Obstacle, ShadowSet)
//! - `geometry`: Containment and orientation tests
//! - `segments`: Boundary segments of each obstacle kind
//! - `shadow`: Shadow polygons for a single viewer
//! - `combined`: Visibility across several viewers
//!
//! Nothing here keeps state between calls: the caller owns the obstacle list
//! and passes it in for every query.

pub mod combined;
pub mod geometry;
pub mod segments;
pub mod shadow;
pub mod types;

// Re-export commonly used items
pub use combined::{is_point_hidden_from_all, shadow_sets_for, visible_targets};
pub use geometry::{point_in_polygon, segment_faces_viewer};
pub use segments::segments_of;
pub use shadow::{is_point_in_shadow, shadow_polygon_for, shadow_polygons_for};
pub use types::{Direction, MapBounds, Obstacle, ObstacleKind, Point, Segment, ShadowPolygon, ShadowSet};
