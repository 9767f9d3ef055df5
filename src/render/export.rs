//! Headless rendering of a scene's fog into an image file.

use anyhow::{Context, bail};
use log::{debug, info, warn};
use std::path::Path;

use super::compositor::{DrawOutcome, FogCompositor, FogRequest};
use super::raster::RasterSurface;
use crate::common::config::FogConfig;
use crate::common::scene::Scene;
use crate::visibility::{Point, visible_targets};

/// Backdrop used when the scene has no background image.
const BACKDROP: [u8; 4] = [48, 48, 48, 255];

/// Render the fog shared by all of the scene's viewers.
///
/// The surface is `pixels_per_unit` device pixels per map unit; polygons stay
/// in map coordinates and are scaled by the surface.
pub fn render_scene(
    scene: &Scene,
    config: &FogConfig,
    pixels_per_unit: f32,
    background: Option<&image::RgbaImage>,
) -> anyhow::Result<RasterSurface> {
    if !(pixels_per_unit.is_finite() && pixels_per_unit > 0.0) {
        bail!("Invalid pixels per unit: {}", pixels_per_unit);
    }
    let width = (scene.map.width as f32 * pixels_per_unit).round().max(1.0) as u32;
    let height = (scene.map.height as f32 * pixels_per_unit).round().max(1.0) as u32;

    let surface = match background {
        Some(img) => {
            let resized = image::imageops::resize(img, width, height, image::imageops::FilterType::Triangle);
            RasterSurface::from_rgba_image(&resized)
        }
        None => RasterSurface::new(width, height).map(|mut s| {
            s.fill_background(BACKDROP);
            s
        }),
    };
    let mut surface = surface
        .with_context(|| format!("Cannot allocate {}x{} surface", width, height))?
        .with_logical_size(scene.map.width as f32, scene.map.height as f32);

    let request = FogRequest {
        obstacles: &scene.obstacles,
        bounds: scene.map,
        fog_opacity: config.fog_opacity,
        transform_point: |p: Point| p,
    };
    let mut compositor = FogCompositor::new()
        .with_fog_color(config.fog_color)
        .with_anti_alias(config.anti_alias);

    match compositor.draw_combined_shadows(&mut surface, &scene.viewers, &request, None) {
        DrawOutcome::SurfaceUnavailable => bail!("Fog layers of {}x{} could not be allocated", width, height),
        outcome => debug!("Fog draw for {} viewers: {:?}", scene.viewers.len(), outcome),
    }
    Ok(surface)
}

/// Render the scene and write it to `out` as PNG.
///
/// A background image that cannot be decoded is skipped with a warning.
pub fn export_png(scene: &Scene, config: &FogConfig, pixels_per_unit: f32, out: &Path) -> anyhow::Result<()> {
    let background = scene.background_image.as_deref().and_then(|path| match image::open(path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            warn!("Ignoring background image {}: {}", path, e);
            None
        }
    });

    let surface = render_scene(scene, config, pixels_per_unit, background.as_ref())?;
    surface
        .to_rgba_image()
        .save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    let tokens = scene.token_positions();
    let visible = visible_targets(&tokens, &scene.viewers, &scene.obstacles, &scene.map);
    for (idx, token) in scene.tokens.iter().enumerate() {
        let state = if visible.contains(&idx) { "visible" } else { "hidden" };
        info!("Token {} at ({}, {}): {}", token.name, token.position.x, token.position.y, state);
    }
    info!("Wrote {} ({} of {} tokens visible)", out.display(), visible.len(), tokens.len());
    Ok(())
}
