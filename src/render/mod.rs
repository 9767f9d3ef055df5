//! Fog rendering.
//!
//! - `surface`: The contract a 2D drawing surface must satisfy
//! - `raster`: Software surface backed by tiny-skia
//! - `compositor`: Accumulates shadow masks and blends them as fog
//! - `export`: Headless PNG output for a whole scene

pub mod compositor;
pub mod export;
pub mod raster;
pub mod surface;

pub use compositor::{DrawOutcome, FogCompositor, FogRequest};
pub use raster::RasterSurface;
pub use surface::{Composite, Fill, Scale, Surface};
