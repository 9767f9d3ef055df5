//! Rendering-surface contract used by the fog compositor.
//!
//! Any immediate-mode 2D backend can host the fog layer as long as it can
//! fill polygons opaquely, subtract a polygon from what is already drawn and
//! blit another surface 1:1 with an opacity.

use crate::visibility::Point;

/// How a fill or blit combines with existing pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composite {
    /// Normal painting on top of existing content.
    #[default]
    SourceOver,
    /// Erase existing content where the source is opaque.
    DestinationOut,
    /// Keep existing content only where the source is opaque.
    DestinationIn,
}

/// Per-axis device pixel ratio applied to polygon coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    /// Ratio of backing resolution to logical size, falling back to 1 when
    /// the logical size is unknown.
    pub fn from_sizes(pixels: (u32, u32), logical: (f32, f32)) -> Scale {
        let ratio = |px: u32, lg: f32| if lg > 0.0 && lg.is_finite() { px as f32 / lg } else { 1.0 };
        Scale {
            x: ratio(pixels.0, logical.0),
            y: ratio(pixels.1, logical.1),
        }
    }
}

/// Paint settings for a single fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub color: [u8; 3],
    pub composite: Composite,
    pub anti_alias: bool,
}

impl Fill {
    pub fn opaque(color: [u8; 3], anti_alias: bool) -> Self {
        Fill { color, composite: Composite::SourceOver, anti_alias }
    }

    pub fn with_composite(self, composite: Composite) -> Self {
        Fill { composite, ..self }
    }
}

/// A 2D surface the compositor can draw onto and allocate layers of.
pub trait Surface: Sized {
    /// Allocate a blank, fully transparent surface. `None` when the backend
    /// cannot provide one (zero size, out of memory).
    fn create(width: u32, height: u32) -> Option<Self>;

    /// Backing resolution in device pixels.
    fn pixel_size(&self) -> (u32, u32);

    /// Size in layout units; differs from `pixel_size` on high-DPI targets.
    fn logical_size(&self) -> (f32, f32) {
        let (w, h) = self.pixel_size();
        (w as f32, h as f32)
    }

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    /// Fill the whole surface.
    fn fill_all(&mut self, fill: Fill);

    /// Fill a closed polygon given in logical coordinates, scaled to pixels.
    fn fill_polygon(&mut self, points: &[Point], scale: Scale, fill: Fill);

    /// Fill several polygons as one shape.
    ///
    /// Backends that can should rasterize the union in a single pass so that
    /// edges shared by neighbouring polygons get full coverage. The fallback
    /// fills them one at a time.
    fn fill_polygons(&mut self, polygons: &[Vec<Point>], scale: Scale, fill: Fill) {
        for polygon in polygons {
            self.fill_polygon(polygon, scale, fill);
        }
    }

    /// Blit `layer` at the origin, pixel for pixel, ignoring any transform.
    fn draw_layer(&mut self, layer: &Self, opacity: f32, composite: Composite);
}
