//! # Fog Compositor
//!
//! Paints the occlusion computed by the visibility engine onto a target
//! surface as a single translucent fog layer.
//!
//! ## Accumulate, then blend once
//!
//! Shadow polygons overlap heavily (every rectangle side casts its own quad).
//! Blending each of them onto the target would darken the overlaps, so every
//! shadow is filled fully opaque into an off-screen accumulation layer, and
//! that layer is blended onto the target exactly once at the fog opacity.
//!
//! ## Inverted mask for containing polygons
//!
//! When the viewer stands inside a closed polygon, a second layer is filled
//! completely and the polygon interiors are erased from it. The result is
//! painted over the accumulation layer, so "outside the room" and "behind a
//! wall inside the room" are unioned rather than blended.
//!
//! ## Several viewers
//!
//! Each viewer's mask is built in its own layer and intersected into the
//! accumulation layer: only pixels hidden from every viewer keep their fog.
//!
//! All shadows of one viewer are rasterized together as a single shape, so
//! the edges that neighbouring shadow quads share are not left half covered.
//!
//! Layers are kept between calls and only reallocated when the target size
//! changes; they are always cleared before use.

use log::{debug, warn};

use super::surface::{Composite, Fill, Scale, Surface};
use crate::visibility::combined::shadow_sets_for;
use crate::visibility::shadow::shadow_polygons_for;
use crate::visibility::{MapBounds, Obstacle, Point, ShadowSet};

/// Result of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Fog was blended onto the target.
    Drawn,
    /// Nothing to hide; the target was left untouched.
    Skipped,
    /// A layer could not be allocated; the target was left untouched.
    SurfaceUnavailable,
}

/// Inputs shared by every draw call of a frame.
pub struct FogRequest<'a, T>
where
    T: Fn(Point) -> Point,
{
    pub obstacles: &'a [Obstacle],
    pub bounds: MapBounds,
    /// Blend strength of the final fog layer, clamped to `0.0..=1.0`.
    pub fog_opacity: f32,
    /// Maps world coordinates to the target's logical coordinates (pan/zoom).
    pub transform_point: T,
}

/// Reusable fog renderer for one kind of surface.
pub struct FogCompositor<S: Surface> {
    accumulation: Option<S>,
    exterior: Option<S>,
    viewer_layer: Option<S>,
    fog_color: [u8; 3],
    anti_alias: bool,
}

impl<S: Surface> Default for FogCompositor<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface> FogCompositor<S> {
    pub fn new() -> Self {
        FogCompositor {
            accumulation: None,
            exterior: None,
            viewer_layer: None,
            fog_color: [0, 0, 0],
            anti_alias: true,
        }
    }

    pub fn with_fog_color(mut self, rgb: [u8; 3]) -> Self {
        self.fog_color = rgb;
        self
    }

    pub fn with_anti_alias(mut self, anti_alias: bool) -> Self {
        self.anti_alias = anti_alias;
        self
    }

    pub fn set_fog_color(&mut self, rgb: [u8; 3]) {
        self.fog_color = rgb;
    }

    pub fn set_anti_alias(&mut self, anti_alias: bool) {
        self.anti_alias = anti_alias;
    }

    /// Drop the cached layers, e.g. after the target was resized for good.
    pub fn release_layers(&mut self) {
        self.accumulation = None;
        self.exterior = None;
        self.viewer_layer = None;
    }

    /// Draw the fog for a single viewer.
    ///
    /// # Parameters
    ///
    /// * `target` - Surface the fog is blended onto
    /// * `viewer` - Position sight is evaluated from
    /// * `request` - Obstacles, bounds, opacity and coordinate transform
    /// * `precalculated` - Shadow set already computed for this viewer, if any
    pub fn draw_shadows<T>(
        &mut self,
        target: &mut S,
        viewer: &Point,
        request: &FogRequest<'_, T>,
        precalculated: Option<&ShadowSet<'_>>,
    ) -> DrawOutcome
    where
        T: Fn(Point) -> Point,
    {
        if request.obstacles.is_empty() {
            return DrawOutcome::Skipped;
        }

        let computed;
        let set = match precalculated {
            Some(set) => set,
            None => {
                computed = shadow_polygons_for(viewer, request.obstacles, &request.bounds);
                &computed
            }
        };
        if set.is_empty() {
            return DrawOutcome::Skipped;
        }

        let size = target.pixel_size();
        let scale = Scale::from_sizes(size, target.logical_size());
        let fill = Fill::opaque(self.fog_color, self.anti_alias);

        let Self { accumulation, exterior, .. } = self;
        let Some(acc) = prepare_layer(accumulation, size) else {
            warn!("Fog accumulation layer {}x{} unavailable, skipping frame", size.0, size.1);
            return DrawOutcome::SurfaceUnavailable;
        };
        if !paint_viewer_mask(acc, exterior, set, size, scale, fill, &request.transform_point) {
            return DrawOutcome::SurfaceUnavailable;
        }

        target.draw_layer(acc, clamp_opacity(request.fog_opacity), Composite::SourceOver);
        DrawOutcome::Drawn
    }

    /// Draw the fog shared by several viewers.
    ///
    /// A pixel is fogged only when it is hidden from every viewer. An empty
    /// viewer list draws nothing.
    ///
    /// `precalculated` holds one shadow set per viewer, in viewer order. Sets
    /// whose count does not match `viewers` are ignored and recomputed.
    pub fn draw_combined_shadows<T>(
        &mut self,
        target: &mut S,
        viewers: &[Point],
        request: &FogRequest<'_, T>,
        precalculated: Option<&[ShadowSet<'_>]>,
    ) -> DrawOutcome
    where
        T: Fn(Point) -> Point,
    {
        if request.obstacles.is_empty() || viewers.is_empty() {
            return DrawOutcome::Skipped;
        }

        let computed;
        let sets = match precalculated {
            Some(sets) if sets.len() == viewers.len() => sets,
            other => {
                if let Some(sets) = other {
                    warn!(
                        "Got {} precalculated shadow sets for {} viewers, recomputing",
                        sets.len(),
                        viewers.len()
                    );
                }
                computed = shadow_sets_for(viewers, request.obstacles, &request.bounds);
                computed.as_slice()
            }
        };
        // A viewer with nothing in the way sees the whole map.
        if sets.iter().any(ShadowSet::is_empty) {
            return DrawOutcome::Skipped;
        }

        let size = target.pixel_size();
        let scale = Scale::from_sizes(size, target.logical_size());
        let fill = Fill::opaque(self.fog_color, self.anti_alias);

        let Self {
            accumulation,
            exterior,
            viewer_layer,
            ..
        } = self;
        let Some(acc) = prepare_layer(accumulation, size) else {
            warn!("Fog accumulation layer {}x{} unavailable, skipping frame", size.0, size.1);
            return DrawOutcome::SurfaceUnavailable;
        };

        let Some((first, rest)) = sets.split_first() else {
            return DrawOutcome::Skipped;
        };
        if !paint_viewer_mask(acc, exterior, first, size, scale, fill, &request.transform_point) {
            return DrawOutcome::SurfaceUnavailable;
        }
        for set in rest {
            let Some(layer) = prepare_layer(viewer_layer, size) else {
                warn!("Per-viewer fog layer {}x{} unavailable, skipping frame", size.0, size.1);
                return DrawOutcome::SurfaceUnavailable;
            };
            if !paint_viewer_mask(layer, exterior, set, size, scale, fill, &request.transform_point) {
                return DrawOutcome::SurfaceUnavailable;
            }
            acc.draw_layer(layer, 1.0, Composite::DestinationIn);
        }
        debug!("Combined fog for {} viewers", viewers.len());

        target.draw_layer(acc, clamp_opacity(request.fog_opacity), Composite::SourceOver);
        DrawOutcome::Drawn
    }
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) }
}

/// Reuse the layer in `slot` when it matches `size`, otherwise reallocate.
fn prepare_layer<S: Surface>(slot: &mut Option<S>, size: (u32, u32)) -> Option<&mut S> {
    let reusable = slot.as_ref().is_some_and(|layer| layer.pixel_size() == size);
    if reusable {
        if let Some(layer) = slot.as_mut() {
            layer.clear();
        }
    } else {
        *slot = S::create(size.0, size.1);
    }
    slot.as_mut()
}

fn transformed<T: Fn(Point) -> Point>(points: &[Point], transform_point: &T) -> Vec<Point> {
    points.iter().map(|p| transform_point(*p)).collect()
}

/// Paint one viewer's full-opacity occlusion mask into `layer`.
///
/// Returns `false` if the exterior layer was needed but unavailable.
fn paint_viewer_mask<S, T>(
    layer: &mut S,
    exterior_slot: &mut Option<S>,
    set: &ShadowSet<'_>,
    size: (u32, u32),
    scale: Scale,
    fill: Fill,
    transform_point: &T,
) -> bool
where
    S: Surface,
    T: Fn(Point) -> Point,
{
    let shadows: Vec<Vec<Point>> = set
        .shadows
        .iter()
        .filter(|shadow| shadow.len() >= 3)
        .map(|shadow| transformed(shadow, transform_point))
        .collect();
    layer.fill_polygons(&shadows, scale, fill);

    if set.containing_polygons.is_empty() {
        return true;
    }

    let Some(exterior) = prepare_layer(exterior_slot, size) else {
        warn!("Exterior fog layer {}x{} unavailable", size.0, size.1);
        return false;
    };
    exterior.fill_all(fill);
    let cut = fill.with_composite(Composite::DestinationOut);
    for polygon in &set.containing_polygons {
        if polygon.points.len() < 3 {
            continue;
        }
        exterior.fill_polygon(&transformed(&polygon.points, transform_point), scale, cut);
    }
    layer.draw_layer(exterior, 1.0, Composite::SourceOver);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::raster::RasterSurface;

    fn p(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    fn square(id: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Obstacle {
        Obstacle::polygon(id, vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)])
    }

    fn request(obstacles: &[Obstacle], fog_opacity: f32) -> FogRequest<'_, impl Fn(Point) -> Point> {
        FogRequest {
            obstacles,
            bounds: MapBounds::new(100.0, 100.0),
            fog_opacity,
            transform_point: |p: Point| p,
        }
    }

    fn compositor() -> FogCompositor<RasterSurface> {
        FogCompositor::new().with_anti_alias(false)
    }

    #[test]
    fn overlapping_shadows_do_not_stack_opacity() {
        let obstacles = vec![square("a", 10.0, 10.0, 60.0, 60.0), square("b", 40.0, 40.0, 90.0, 90.0)];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let outcome = compositor().draw_shadows(&mut target, &p(95.0, 5.0), &request(&obstacles, 0.5), None);
        assert_eq!(outcome, DrawOutcome::Drawn);

        let single = target.alpha_at(20, 20);
        let overlap = target.alpha_at(50, 50);
        assert!((120..=135).contains(&single), "alpha {single}");
        assert_eq!(overlap, single);
        // Naive per-polygon blending would reach 1 - (1 - 0.5)^2 = 0.75.
        assert!(overlap < 180);
        assert_eq!(target.alpha_at(95, 95), 0);
    }

    #[test]
    fn viewer_inside_room_clears_interior_only() {
        let obstacles = vec![square("room", 25.0, 25.0, 75.0, 75.0)];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let outcome = compositor().draw_shadows(&mut target, &p(50.0, 50.0), &request(&obstacles, 1.0), None);
        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(target.alpha_at(50, 50), 0);
        assert_eq!(target.alpha_at(30, 70), 0);
        assert_eq!(target.alpha_at(5, 5), 255);
        assert_eq!(target.alpha_at(90, 50), 255);
    }

    #[test]
    fn wall_shadow_inside_room_is_unioned_with_exterior() {
        let obstacles = vec![
            square("room", 10.0, 10.0, 90.0, 90.0),
            Obstacle::wall("w", vec![p(60.0, 20.0), p(60.0, 80.0)]),
        ];
        let mut target = RasterSurface::new(100, 100).unwrap();
        compositor().draw_shadows(&mut target, &p(30.0, 50.0), &request(&obstacles, 0.5), None);
        let behind_wall = target.alpha_at(75, 50);
        let outside = target.alpha_at(3, 50);
        assert!(behind_wall > 0);
        assert_eq!(behind_wall, outside);
        assert_eq!(target.alpha_at(40, 50), 0);
    }

    #[test]
    fn no_obstacles_skips_without_touching_target() {
        let mut target = RasterSurface::new(10, 10).unwrap();
        let outcome = compositor().draw_shadows(&mut target, &p(5.0, 5.0), &request(&[], 1.0), None);
        assert_eq!(outcome, DrawOutcome::Skipped);
        assert_eq!(target.alpha_at(5, 5), 0);
    }

    #[test]
    fn open_doors_only_skip() {
        let obstacles = vec![Obstacle::door("d", p(50.0, 0.0), p(50.0, 100.0), true)];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let outcome = compositor().draw_shadows(&mut target, &p(10.0, 50.0), &request(&obstacles, 1.0), None);
        assert_eq!(outcome, DrawOutcome::Skipped);
    }

    #[test]
    fn hidpi_target_scales_world_coordinates() {
        let obstacles = vec![square("a", 10.0, 10.0, 40.0, 40.0)];
        let mut target = RasterSurface::new(200, 200).unwrap().with_logical_size(100.0, 100.0);
        compositor().draw_shadows(&mut target, &p(90.0, 90.0), &request(&obstacles, 1.0), None);
        assert_eq!(target.alpha_at(60, 60), 255);
        assert_eq!(target.alpha_at(90, 90), 0);
        assert_eq!(target.alpha_at(25, 25), 255);
    }

    #[test]
    fn transform_point_is_applied() {
        let obstacles = vec![square("a", 0.0, 0.0, 10.0, 10.0)];
        let req = FogRequest {
            obstacles: &obstacles,
            bounds: MapBounds::new(100.0, 100.0),
            fog_opacity: 1.0,
            transform_point: |q: Point| Point::new(q.x * 2.0 + 50.0, q.y * 2.0 + 50.0),
        };
        let mut target = RasterSurface::new(100, 100).unwrap();
        compositor().draw_shadows(&mut target, &p(90.0, 90.0), &req, None);
        assert_eq!(target.alpha_at(60, 60), 255);
        assert_eq!(target.alpha_at(5, 5), 0);
    }

    #[test]
    fn reused_layers_are_cleared_between_frames() {
        let obstacles = vec![square("room", 25.0, 25.0, 75.0, 75.0)];
        let mut comp = compositor();

        let mut first = RasterSurface::new(100, 100).unwrap();
        comp.draw_shadows(&mut first, &p(5.0, 5.0), &request(&obstacles, 1.0), None);
        assert_eq!(first.alpha_at(50, 50), 255);

        let mut second = RasterSurface::new(100, 100).unwrap();
        comp.draw_shadows(&mut second, &p(50.0, 50.0), &request(&obstacles, 1.0), None);
        assert_eq!(second.alpha_at(50, 50), 0);
        assert_eq!(second.alpha_at(5, 5), 255);

        // Resized target reallocates the layers.
        let mut third = RasterSurface::new(50, 50).unwrap();
        comp.draw_shadows(&mut third, &p(5.0, 5.0), &request(&obstacles, 1.0), None);
        assert_eq!(third.alpha_at(40, 40), 255);
    }

    #[test]
    fn precalculated_set_is_used() {
        let obstacles = vec![square("a", 10.0, 10.0, 40.0, 40.0)];
        let set = ShadowSet {
            shadows: vec![vec![p(60.0, 60.0), p(90.0, 60.0), p(90.0, 90.0), p(60.0, 90.0)]],
            containing_polygons: Vec::new(),
        };
        let mut target = RasterSurface::new(100, 100).unwrap();
        compositor().draw_shadows(&mut target, &p(0.0, 0.0), &request(&obstacles, 1.0), Some(&set));
        assert_eq!(target.alpha_at(75, 75), 255);
        assert_eq!(target.alpha_at(25, 25), 0);
    }

    #[test]
    fn combined_fog_keeps_only_commonly_hidden_area() {
        let obstacles = vec![Obstacle::wall("divider", vec![p(50.0, -10.0), p(50.0, 110.0)])];
        let mut comp = compositor();

        let mut west_only = RasterSurface::new(100, 100).unwrap();
        let outcome = comp.draw_combined_shadows(&mut west_only, &[p(10.0, 50.0)], &request(&obstacles, 1.0), None);
        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(west_only.alpha_at(80, 50), 255);
        assert_eq!(west_only.alpha_at(20, 50), 0);

        let mut both = RasterSurface::new(100, 100).unwrap();
        comp.draw_combined_shadows(&mut both, &[p(10.0, 50.0), p(90.0, 50.0)], &request(&obstacles, 1.0), None);
        assert_eq!(both.alpha_at(80, 50), 0);
        assert_eq!(both.alpha_at(20, 50), 0);
    }

    #[test]
    fn combined_fog_intersects_rooms() {
        let obstacles = vec![square("west", 5.0, 5.0, 45.0, 95.0), square("east", 55.0, 5.0, 95.0, 95.0)];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let viewers = [p(25.0, 50.0), p(75.0, 50.0)];
        compositor().draw_combined_shadows(&mut target, &viewers, &request(&obstacles, 1.0), None);
        assert_eq!(target.alpha_at(25, 50), 0);
        assert_eq!(target.alpha_at(75, 50), 0);
        assert_eq!(target.alpha_at(50, 50), 255);
    }

    fn quad(x0: f64, y0: f64, x1: f64, y1: f64) -> ShadowSet<'static> {
        ShadowSet {
            shadows: vec![vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)]],
            containing_polygons: Vec::new(),
        }
    }

    #[test]
    fn precalculated_sets_are_used_for_combined_fog() {
        let obstacles = vec![square("a", 10.0, 10.0, 40.0, 40.0)];
        let viewers = [p(0.0, 0.0), p(99.0, 0.0)];
        let sets = vec![quad(50.0, 50.0, 90.0, 90.0), quad(60.0, 60.0, 95.0, 95.0)];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let outcome = compositor().draw_combined_shadows(&mut target, &viewers, &request(&obstacles, 1.0), Some(sets.as_slice()));
        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(target.alpha_at(75, 75), 255);
        assert_eq!(target.alpha_at(55, 55), 0);
        // The room interior would be hidden from both viewers if recomputed.
        assert_eq!(target.alpha_at(25, 25), 0);
    }

    #[test]
    fn mismatched_precalculated_sets_are_recomputed() {
        let obstacles = vec![square("a", 10.0, 10.0, 40.0, 40.0)];
        let viewers = [p(0.0, 0.0), p(99.0, 0.0)];
        let sets = vec![quad(50.0, 50.0, 90.0, 90.0)];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let outcome = compositor().draw_combined_shadows(&mut target, &viewers, &request(&obstacles, 1.0), Some(sets.as_slice()));
        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(target.alpha_at(25, 25), 255);
        assert_eq!(target.alpha_at(75, 75), 0);
    }

    #[test]
    fn wall_chain_joint_has_no_seam() {
        let obstacles = vec![Obstacle::wall("chain", vec![p(13.0, 40.0), p(50.0, 40.0), p(87.3, 40.0)])];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let mut comp: FogCompositor<RasterSurface> = FogCompositor::new();
        let outcome = comp.draw_shadows(&mut target, &p(50.3, 90.0), &request(&obstacles, 1.0), None);
        assert_eq!(outcome, DrawOutcome::Drawn);
        // The shadows of both wall pieces meet along the ray through (50, 40).
        for y in 2..=30 {
            for x in 40..=60 {
                let a = target.alpha_at(x, y);
                assert!(a >= 250, "seam at ({x}, {y}): alpha {a}");
            }
        }
    }

    #[test]
    fn combined_fog_without_viewers_is_skipped() {
        let obstacles = vec![square("a", 10.0, 10.0, 40.0, 40.0)];
        let mut target = RasterSurface::new(100, 100).unwrap();
        let outcome = compositor().draw_combined_shadows(&mut target, &[], &request(&obstacles, 1.0), None);
        assert_eq!(outcome, DrawOutcome::Skipped);
    }

    struct UnavailableSurface;

    impl Surface for UnavailableSurface {
        fn create(_: u32, _: u32) -> Option<Self> {
            None
        }
        fn pixel_size(&self) -> (u32, u32) {
            (10, 10)
        }
        fn clear(&mut self) {}
        fn fill_all(&mut self, _: Fill) {}
        fn fill_polygon(&mut self, _: &[Point], _: Scale, _: Fill) {}
        fn draw_layer(&mut self, _: &Self, _: f32, _: Composite) {
            panic!("nothing should be blitted");
        }
    }

    #[test]
    fn unavailable_layers_no_op() {
        let obstacles = vec![square("a", 1.0, 1.0, 4.0, 4.0)];
        let mut comp: FogCompositor<UnavailableSurface> = FogCompositor::new();
        let mut target = UnavailableSurface;
        let outcome = comp.draw_shadows(&mut target, &p(9.0, 9.0), &request(&obstacles, 1.0), None);
        assert_eq!(outcome, DrawOutcome::SurfaceUnavailable);
    }
}
