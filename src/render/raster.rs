//! Software raster surface backed by a tiny-skia pixmap.
//!
//! Pixels are stored premultiplied (tiny-skia's native format), which egui
//! accepts directly for texture upload.

use tiny_skia as sk;

use super::surface::{Composite, Fill, Scale, Surface};
use crate::visibility::Point;
use crate::visibility::geometry::signed_area;

impl From<Composite> for sk::BlendMode {
    fn from(c: Composite) -> Self {
        match c {
            Composite::SourceOver => sk::BlendMode::SourceOver,
            Composite::DestinationOut => sk::BlendMode::DestinationOut,
            Composite::DestinationIn => sk::BlendMode::DestinationIn,
        }
    }
}

pub struct RasterSurface {
    pixmap: sk::Pixmap,
    logical: (f32, f32),
}

impl RasterSurface {
    /// Transparent surface whose logical size equals its pixel size.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let pixmap = sk::Pixmap::new(width, height)?;
        Some(RasterSurface {
            pixmap,
            logical: (width as f32, height as f32),
        })
    }

    /// Declare the layout size this surface represents (high-DPI targets).
    pub fn with_logical_size(mut self, width: f32, height: f32) -> Self {
        self.logical = (width, height);
        self
    }

    /// Surface initialised from straight-alpha pixels, e.g. a decoded map image.
    pub fn from_rgba_image(img: &image::RgbaImage) -> Option<Self> {
        let mut surface = RasterSurface::new(img.width(), img.height())?;
        for (dst, src) in surface.pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = sk::ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Some(surface)
    }

    /// Fill every polygon as a subpath of one path.
    ///
    /// Subpaths are pushed with the same winding, so under the non-zero rule
    /// overlaps stay filled and shared edges cancel out instead of leaving a
    /// partially covered seam.
    fn fill_subpaths<'p>(&mut self, polygons: impl Iterator<Item = &'p [Point]>, scale: Scale, fill: Fill) {
        let mut pb = sk::PathBuilder::new();
        for points in polygons {
            if points.len() < 3 {
                continue;
            }
            let ordered: Vec<&Point> = if signed_area(points) < 0.0 {
                points.iter().rev().collect()
            } else {
                points.iter().collect()
            };
            pb.move_to(ordered[0].x as f32, ordered[0].y as f32);
            for p in &ordered[1..] {
                pb.line_to(p.x as f32, p.y as f32);
            }
            pb.close();
        }
        // Empty or zero-area input produces no path.
        let Some(path) = pb.finish() else {
            return;
        };
        let transform = sk::Transform::from_scale(scale.x, scale.y);
        self.pixmap
            .fill_path(&path, &Self::paint(fill), sk::FillRule::Winding, transform, None);
    }

    /// Premultiplied RGBA bytes, row-major.
    pub fn premultiplied_rgba(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Alpha of one pixel, `0` outside the surface.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixmap.pixel(x, y).map(|c| c.alpha()).unwrap_or(0)
    }

    /// Fill with a solid background colour.
    pub fn fill_background(&mut self, rgba: [u8; 4]) {
        self.pixmap.fill(sk::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
    }

    /// Straight-alpha copy for encoders that expect unmultiplied pixels.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        let mut img = image::RgbaImage::new(w, h);
        for (dst, src) in img.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        img
    }

    fn paint(fill: Fill) -> sk::Paint<'static> {
        let mut paint = sk::Paint::default();
        paint.set_color_rgba8(fill.color[0], fill.color[1], fill.color[2], 255);
        paint.anti_alias = fill.anti_alias;
        paint.blend_mode = fill.composite.into();
        paint
    }
}

impl Surface for RasterSurface {
    fn create(width: u32, height: u32) -> Option<Self> {
        RasterSurface::new(width, height)
    }

    fn pixel_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn logical_size(&self) -> (f32, f32) {
        self.logical
    }

    fn clear(&mut self) {
        self.pixmap.fill(sk::Color::TRANSPARENT);
    }

    fn fill_all(&mut self, fill: Fill) {
        let (w, h) = self.pixel_size();
        let Some(rect) = sk::Rect::from_xywh(0.0, 0.0, w as f32, h as f32) else {
            return;
        };
        self.pixmap.fill_rect(rect, &Self::paint(fill), sk::Transform::identity(), None);
    }

    fn fill_polygon(&mut self, points: &[Point], scale: Scale, fill: Fill) {
        self.fill_subpaths(std::iter::once(points), scale, fill);
    }

    fn fill_polygons(&mut self, polygons: &[Vec<Point>], scale: Scale, fill: Fill) {
        self.fill_subpaths(polygons.iter().map(Vec::as_slice), scale, fill);
    }

    fn draw_layer(&mut self, layer: &Self, opacity: f32, composite: Composite) {
        let paint = sk::PixmapPaint {
            opacity,
            blend_mode: composite.into(),
            quality: sk::FilterQuality::Nearest,
        };
        self.pixmap
            .draw_pixmap(0, 0, layer.pixmap.as_ref(), &paint, sk::Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 3] = [0, 0, 0];

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![Point::new(x0, y0), Point::new(x1, y0), Point::new(x1, y1), Point::new(x0, y1)]
    }

    #[test]
    fn zero_sized_surface_is_unavailable() {
        assert!(RasterSurface::new(0, 10).is_none());
        assert!(<RasterSurface as Surface>::create(10, 0).is_none());
    }

    #[test]
    fn fill_polygon_respects_scale() {
        let mut s = RasterSurface::new(100, 100).unwrap();
        s.fill_polygon(&square(10.0, 10.0, 20.0, 20.0), Scale { x: 2.0, y: 2.0 }, Fill::opaque(BLACK, false));
        assert_eq!(s.alpha_at(30, 30), 255);
        assert_eq!(s.alpha_at(15, 15), 0);
        assert_eq!(s.alpha_at(45, 45), 0);
    }

    #[test]
    fn fill_polygons_keeps_overlap_of_opposite_windings() {
        let a = square(10.0, 10.0, 30.0, 30.0);
        let mut b = square(20.0, 20.0, 40.0, 40.0);
        b.reverse();
        let mut s = RasterSurface::new(50, 50).unwrap();
        s.fill_polygons(&[a, b], Scale::IDENTITY, Fill::opaque(BLACK, false));
        assert_eq!(s.alpha_at(25, 25), 255);
        assert_eq!(s.alpha_at(15, 15), 255);
        assert_eq!(s.alpha_at(35, 35), 255);
        assert_eq!(s.alpha_at(35, 15), 0);
    }

    #[test]
    fn fill_polygons_leaves_no_seam_on_shared_edge() {
        // Two triangles split a square along its diagonal.
        let upper = vec![Point::new(10.0, 10.0), Point::new(40.0, 10.0), Point::new(40.0, 40.0)];
        let lower = vec![Point::new(10.0, 10.0), Point::new(10.0, 40.0), Point::new(40.0, 40.0)];
        let mut s = RasterSurface::new(50, 50).unwrap();
        s.fill_polygons(&[upper, lower], Scale::IDENTITY, Fill::opaque(BLACK, true));
        for k in 12..38 {
            let a = s.alpha_at(k, k);
            assert!(a >= 250, "seam at ({k}, {k}): alpha {a}");
        }
    }

    #[test]
    fn destination_out_cuts_hole() {
        let mut s = RasterSurface::new(50, 50).unwrap();
        s.fill_all(Fill::opaque(BLACK, false));
        s.fill_polygon(
            &square(10.0, 10.0, 40.0, 40.0),
            Scale::IDENTITY,
            Fill::opaque(BLACK, false).with_composite(Composite::DestinationOut),
        );
        assert_eq!(s.alpha_at(25, 25), 0);
        assert_eq!(s.alpha_at(5, 5), 255);
    }

    #[test]
    fn draw_layer_applies_opacity_once() {
        let mut layer = RasterSurface::new(20, 20).unwrap();
        layer.fill_all(Fill::opaque(BLACK, false));
        let mut target = RasterSurface::new(20, 20).unwrap();
        target.draw_layer(&layer, 0.5, Composite::SourceOver);
        let a = target.alpha_at(10, 10);
        assert!((120..=135).contains(&a), "alpha {a}");
    }

    #[test]
    fn destination_in_keeps_intersection() {
        let mut a = RasterSurface::new(40, 40).unwrap();
        a.fill_polygon(&square(0.0, 0.0, 30.0, 40.0), Scale::IDENTITY, Fill::opaque(BLACK, false));
        let mut b = RasterSurface::new(40, 40).unwrap();
        b.fill_polygon(&square(10.0, 0.0, 40.0, 40.0), Scale::IDENTITY, Fill::opaque(BLACK, false));
        a.draw_layer(&b, 1.0, Composite::DestinationIn);
        assert_eq!(a.alpha_at(5, 20), 0);
        assert_eq!(a.alpha_at(20, 20), 255);
        assert_eq!(a.alpha_at(35, 20), 0);
    }

    #[test]
    fn loads_from_straight_alpha_image() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([200, 100, 50, 255]));
        let s = RasterSurface::from_rgba_image(&img).unwrap();
        assert_eq!(s.pixel_size(), (3, 2));
        assert_eq!(s.alpha_at(2, 1), 255);
        assert_eq!(s.to_rgba_image().get_pixel(0, 0).0, [200, 100, 50, 255]);
    }

    #[test]
    fn rgba_image_is_unmultiplied() {
        let mut s = RasterSurface::new(4, 4).unwrap();
        s.fill_background([255, 0, 0, 128]);
        let img = s.to_rgba_image();
        let px = img.get_pixel(1, 1);
        assert!(px[0] >= 250);
        assert_eq!(px[3], 128);
    }
}
