//! Dynamic line-of-sight ("fog of war") engine for a tabletop map view.
//!
//! Obstacles (walls, rectangles, closed polygons, one-way walls and doors)
//! block sight from one or more viewers. The engine answers whether a point
//! is visible and paints the occluded area as a translucent fog layer.
//!
//! - `visibility`: Pure geometry and occlusion queries
//! - `render`: Fog compositing onto a 2D surface
//! - `common`: Scene files and configuration used by the viewer binary

pub mod common;
pub mod render;
pub mod visibility;

pub use render::{DrawOutcome, FogCompositor, FogRequest, RasterSurface, Surface};
pub use visibility::{
    Direction, MapBounds, Obstacle, ObstacleKind, Point, Segment, ShadowSet, is_point_hidden_from_all, is_point_in_shadow,
    point_in_polygon, segment_faces_viewer, segments_of, shadow_polygon_for, shadow_polygons_for,
};
