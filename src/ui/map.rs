//! # Central Map Visualization
//!
//! This module renders the main 2D map view showing:
//! - The background image and a grid over the map bounds
//! - The fog layer, rendered off-screen by `FogCompositor` and shown as a texture
//! - The obstacle overlay (GM view) with kind-specific colors
//! - Tokens, dimmed while hidden from the viewers shown
//! - Viewers, which can be dragged around
//!
//! ## Coordinate Mapping
//!
//! Map coordinates run from `(0, 0)` to `(width, height)` with y pointing down.
//! They are linearly mapped to screen pixels using `egui::lerp`, maintaining
//! aspect ratio by fitting the map centered in the available space.
//!
//! ## Fog Texture
//!
//! The fog is rasterized at device-pixel resolution (`pixels_per_point`) and
//! only re-rendered when the scene, the display options or the map size change.

use eframe::egui;
use egui::Color32;
use log::{debug, info, warn};

use crate::ui::AppState;
use tabletop_fog::render::{DrawOutcome, FogRequest, RasterSurface};
use tabletop_fog::visibility::combined::{is_point_hidden_in_all, shadow_sets_for};
use tabletop_fog::visibility::geometry::point_to_segment_distance2;
use tabletop_fog::visibility::shadow::{is_point_in_shadow_set, one_way_normal, shadow_polygons_for};
use tabletop_fog::{MapBounds, Obstacle, ObstacleKind, Point, Segment};

/// Screen distance (points) within which a click or drag hits an item.
const PICK_RADIUS: f32 = 8.0;
const VIEWER_RADIUS: f32 = 7.0;
const TOKEN_RADIUS: f32 = 6.0;
const HANDLE_RADIUS: f32 = 4.0;

/// Screen placement of the map.
#[derive(Debug, Clone, Copy)]
struct MapView {
    rect: egui::Rect,
    bounds: MapBounds,
}

impl MapView {
    fn to_screen(&self, p: Point) -> egui::Pos2 {
        egui::pos2(
            egui::lerp(self.rect.left()..=self.rect.right(), (p.x / self.bounds.width) as f32),
            egui::lerp(self.rect.top()..=self.rect.bottom(), (p.y / self.bounds.height) as f32),
        )
    }

    fn to_world(&self, pos: egui::Pos2) -> Point {
        Point::new(
            ((pos.x - self.rect.left()) / self.rect.width()) as f64 * self.bounds.width,
            ((pos.y - self.rect.top()) / self.rect.height()) as f64 * self.bounds.height,
        )
    }

    /// Screen points per map unit (the map is fitted with its aspect ratio).
    fn points_per_unit(&self) -> f32 {
        self.rect.width() / self.bounds.width as f32
    }

    /// Pick radius expressed in map units, squared.
    fn pick_radius2(&self) -> f64 {
        let r = (PICK_RADIUS / self.points_per_unit()) as f64;
        r * r
    }
}

/// Render the central map panel.
///
/// 1. Reserves a drawing area with proper aspect ratio, centered in the available space
/// 2. Handles pointer input (dragging viewers, selection, doors)
/// 3. Refreshes the fog texture and token visibility if anything changed
/// 4. Draws background, grid, fog, obstacles, tokens and viewers in that order
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(bounds) = state.scene.as_ref().map(|s| s.map) else {
            ui.centered_and_justified(|ui| {
                ui.label("Open a scene file to start");
            });
            return;
        };

        let aspect_ratio = (bounds.width / bounds.height) as f32;

        let avail_rect = ui.available_rect_before_wrap();
        let avail_width = avail_rect.width();
        let avail_height = avail_rect.height();

        // Calculate best fit dimensions maintaining aspect ratio
        let (map_width, map_height) = if avail_width / avail_height > aspect_ratio {
            // Container is wider than map aspect ratio - constrain by height
            (avail_height * aspect_ratio, avail_height)
        } else {
            // Container is taller than map aspect ratio - constrain by width
            (avail_width, avail_width / aspect_ratio)
        };

        let x = avail_rect.center().x - map_width / 2.0;
        let y = avail_rect.center().y - map_height / 2.0;
        let rect = egui::Rect::from_min_size(egui::pos2(x, y), egui::vec2(map_width, map_height));
        let view = MapView { rect, bounds };
        let response = ui.interact(rect, egui::Id::new("map_canvas"), egui::Sense::click_and_drag());

        handle_pointer(&response, &view, state);
        refresh_fog(ctx, &view, state);

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);

        let full_uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        if let Some(ref texture) = state.background_image_texture {
            painter.image(texture.id(), rect, full_uv, Color32::WHITE);
        }

        draw_grid(&painter, &view);

        if let Some(ref texture) = state.fog_texture {
            painter.image(texture.id(), rect, full_uv, Color32::WHITE);
        }

        if state.config.show_obstacles {
            draw_obstacles(&painter, &view, state);
        }
        draw_tokens(&painter, &view, state);
        draw_viewers(&painter, &view, state);
    });
}

/// Draw the coordinate grid with square cells.
///
/// The longer dimension is divided into 10 cells, and that spacing is used for
/// both axes.
fn draw_grid(painter: &egui::Painter, view: &MapView) {
    let grid_stroke = egui::Stroke::new(1.0, Color32::from_rgba_unmultiplied(0, 0, 100, 120));
    let spacing = view.bounds.width.max(view.bounds.height) / 10.0;
    let rect = view.rect;

    let mut x = spacing;
    while x < view.bounds.width {
        let screen_x = view.to_screen(Point::new(x, 0.0)).x;
        painter.line_segment([egui::pos2(screen_x, rect.top()), egui::pos2(screen_x, rect.bottom())], grid_stroke);
        x += spacing;
    }

    let mut y = spacing;
    while y < view.bounds.height {
        let screen_y = view.to_screen(Point::new(0.0, y)).y;
        painter.line_segment([egui::pos2(rect.left(), screen_y), egui::pos2(rect.right(), screen_y)], grid_stroke);
        y += spacing;
    }
}

/// Parse a `#rrggbb` color string.
pub fn parse_hex_color(text: &str) -> Option<Color32> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Overlay color for an obstacle: its own color if set, else one per kind.
fn obstacle_color(obstacle: &Obstacle) -> Color32 {
    let base = obstacle.color.as_deref().and_then(parse_hex_color).unwrap_or(match obstacle.kind {
        ObstacleKind::Wall => Color32::from_rgb(255, 255, 255),
        ObstacleKind::Rectangle => Color32::from_rgb(200, 200, 200),
        ObstacleKind::Polygon => Color32::from_rgb(120, 180, 255),
        ObstacleKind::OneWayWall { .. } => Color32::from_rgb(255, 200, 0),
        ObstacleKind::Door { is_open: false } => Color32::from_rgb(170, 90, 40),
        ObstacleKind::Door { is_open: true } => Color32::from_rgb(60, 200, 60),
    });
    let alpha = obstacle.opacity.unwrap_or(1.0).clamp(0.0, 1.0);
    base.gamma_multiply(alpha)
}

/// Draw the obstacle overlay.
///
/// Rectangles get a faint fill, every segment an outline. One-way walls
/// show an arrow in their permitted viewing direction, doors a marker at
/// their midpoint. The selected obstacle is outlined in yellow and, when
/// enabled, shows its vertex handles.
fn draw_obstacles(painter: &egui::Painter, view: &MapView, state: &AppState) {
    let Some(scene) = state.scene.as_ref() else {
        return;
    };

    for (idx, obstacle) in scene.obstacles.iter().enumerate() {
        let selected = state.selected_obstacle == Some(idx);
        let color = obstacle_color(obstacle);
        let stroke = if selected {
            egui::Stroke::new(3.0, Color32::YELLOW)
        } else {
            egui::Stroke::new(2.0, color)
        };

        if obstacle.kind == ObstacleKind::Rectangle && obstacle.points.len() >= 2 {
            let rect_px = egui::Rect::from_two_pos(view.to_screen(obstacle.points[0]), view.to_screen(obstacle.points[1]));
            painter.rect_filled(rect_px, 0.0, color.gamma_multiply(0.15));
        }
        for segment in obstacle.segments() {
            let a = view.to_screen(segment.p1);
            let b = view.to_screen(segment.p2);
            if matches!(obstacle.kind, ObstacleKind::Door { is_open: true }) {
                painter.add(egui::Shape::dashed_line(&[a, b], stroke, 6.0, 4.0));
            } else {
                painter.line_segment([a, b], stroke);
            }
        }

        if obstacle.points.len() >= 2 {
            let first = Segment::new(obstacle.points[0], obstacle.points[1]);
            let mid = view.to_screen(first.midpoint());
            match obstacle.kind {
                ObstacleKind::OneWayWall { direction } => {
                    let (nx, ny) = one_way_normal(&first, direction);
                    painter.arrow(mid, egui::vec2(nx as f32, ny as f32) * 16.0, egui::Stroke::new(2.0, color));
                }
                ObstacleKind::Door { .. } => {
                    painter.circle_filled(mid, 4.0, color);
                }
                _ => {}
            }
        }

        if selected && state.config.show_handles {
            for p in &obstacle.points {
                let pos = view.to_screen(*p);
                painter.circle_filled(pos, HANDLE_RADIUS, Color32::WHITE);
                painter.circle_stroke(pos, HANDLE_RADIUS, egui::Stroke::new(1.0, Color32::BLACK));
            }
        }
    }
}

/// Draw tokens with their names; hidden tokens are dimmed.
fn draw_tokens(painter: &egui::Painter, view: &MapView, state: &AppState) {
    let Some(scene) = state.scene.as_ref() else {
        return;
    };

    for (idx, token) in scene.tokens.iter().enumerate() {
        let hidden = state.token_hidden.get(idx).copied().unwrap_or(false);
        let alpha = if hidden { 0.3 } else { 1.0 };
        let color = Color32::from_rgb(220, 60, 60).gamma_multiply(alpha);
        let pos = view.to_screen(token.position);

        painter.circle_filled(pos, TOKEN_RADIUS, color);
        painter.text(
            egui::pos2(pos.x + 8.0, pos.y - 8.0),
            egui::Align2::LEFT_BOTTOM,
            &token.name,
            egui::FontId::proportional(12.0),
            Color32::WHITE.gamma_multiply(alpha),
        );
    }
}

/// Draw viewers; the one whose sight is shown gets a highlight ring.
fn draw_viewers(painter: &egui::Painter, view: &MapView, state: &AppState) {
    let Some(scene) = state.scene.as_ref() else {
        return;
    };

    for (idx, viewer) in scene.viewers.iter().enumerate() {
        let pos = view.to_screen(*viewer);
        painter.circle_filled(pos, VIEWER_RADIUS, Color32::from_rgb(40, 200, 255));
        let shown = state.combined_view || idx == state.active_viewer;
        if shown {
            painter.circle_stroke(pos, VIEWER_RADIUS + 3.0, egui::Stroke::new(2.0, Color32::WHITE));
        }
        painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            format!("{}", idx + 1),
            egui::FontId::monospace(10.0),
            Color32::BLACK,
        );
    }
}

/// Index of the viewer under `pos`, if any.
fn viewer_at(view: &MapView, state: &AppState, pos: egui::Pos2) -> Option<usize> {
    let scene = state.scene.as_ref()?;
    scene
        .viewers
        .iter()
        .enumerate()
        .map(|(i, v)| (i, view.to_screen(*v).distance_sq(pos)))
        .filter(|(_, d2)| *d2 <= (VIEWER_RADIUS + PICK_RADIUS).powi(2))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Index of the obstacle nearest to `world`, within the pick radius.
fn obstacle_at(view: &MapView, obstacles: &[Obstacle], world: &Point) -> Option<usize> {
    let limit = view.pick_radius2();
    obstacles
        .iter()
        .enumerate()
        .filter_map(|(i, obstacle)| {
            let nearest = obstacle
                .segments()
                .iter()
                .map(|s| point_to_segment_distance2(world, s))
                .fold(f64::INFINITY, f64::min);
            let inside = obstacle.contains(world);
            let d2 = if inside { 0.0 } else { nearest };
            (d2 <= limit).then_some((i, d2))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Handle dragging viewers and clicking obstacles.
///
/// A drag that starts on a viewer moves it (clamped to the map). A click on a
/// viewer makes it the active one, a click on a door toggles it and a click
/// elsewhere selects the nearest obstacle, or clears the selection.
fn handle_pointer(response: &egui::Response, view: &MapView, state: &mut AppState) {
    if response.drag_started() {
        if let Some(pos) = response.interact_pointer_pos() {
            state.dragging_viewer = viewer_at(view, state, pos);
        }
    }

    if let (Some(idx), Some(pos)) = (state.dragging_viewer, response.interact_pointer_pos()) {
        if response.dragged() {
            let world = view.to_world(pos);
            let clamped = Point::new(world.x.clamp(0.0, view.bounds.width), world.y.clamp(0.0, view.bounds.height));
            if let Some(viewer) = state.scene.as_mut().and_then(|s| s.viewers.get_mut(idx)) {
                if *viewer != clamped {
                    *viewer = clamped;
                    state.fog_dirty = true;
                }
            }
        }
    }

    if response.drag_stopped() {
        if let Some(idx) = state.dragging_viewer.take() {
            if let Some(viewer) = state.scene.as_ref().and_then(|s| s.viewers.get(idx)) {
                debug!("Viewer {} moved to ({:.1}, {:.1})", idx + 1, viewer.x, viewer.y);
            }
        }
    }

    if !response.clicked() {
        return;
    }
    let Some(pos) = response.interact_pointer_pos() else {
        return;
    };

    if let Some(idx) = viewer_at(view, state, pos) {
        if !state.combined_view && state.active_viewer != idx {
            state.active_viewer = idx;
            state.mark_dirty();
        }
        return;
    }

    let world = view.to_world(pos);
    let Some(scene) = state.scene.as_mut() else {
        return;
    };
    let hit = obstacle_at(view, &scene.obstacles, &world);
    if let Some(idx) = hit {
        let obstacle = &mut scene.obstacles[idx];
        if let ObstacleKind::Door { is_open } = &mut obstacle.kind {
            *is_open = !*is_open;
            info!("Door {} is now {}", obstacle.id, if *is_open { "open" } else { "closed" });
            state.fog_dirty = true;
        }
    }
    state.selected_obstacle = hit;
}

/// Recompute the fog texture and token visibility when needed.
fn refresh_fog(ctx: &egui::Context, view: &MapView, state: &mut AppState) {
    let ppp = ctx.pixels_per_point();
    let size = (
        (view.rect.width() * ppp).round().max(0.0) as u32,
        (view.rect.height() * ppp).round().max(0.0) as u32,
    );
    if !state.fog_dirty && state.fog_texture_size == size {
        return;
    }
    state.fog_dirty = false;
    state.fog_texture_size = size;

    let Some(scene) = state.scene.as_ref() else {
        state.fog_texture = None;
        return;
    };

    // Everything below works in the fog surface's logical space: map origin at
    // (0, 0), one unit per screen point.
    let sx = view.rect.width() as f64 / scene.map.width;
    let sy = view.rect.height() as f64 / scene.map.height;
    let request = FogRequest {
        obstacles: &scene.obstacles,
        bounds: scene.map,
        fog_opacity: state.config.fog_opacity,
        transform_point: move |p: Point| Point::new(p.x * sx, p.y * sy),
    };

    let Some(surface) = RasterSurface::new(size.0, size.1) else {
        debug!("Map area {}x{} too small for fog", size.0, size.1);
        state.fog_texture = None;
        return;
    };
    let mut surface = surface.with_logical_size(view.rect.width(), view.rect.height());

    let outcome = if state.combined_view {
        let sets = shadow_sets_for(&scene.viewers, &scene.obstacles, &scene.map);
        state.token_hidden = scene
            .tokens
            .iter()
            .map(|t| is_point_hidden_in_all(&t.position, &sets))
            .collect();
        state.fog.draw_combined_shadows(&mut surface, &scene.viewers, &request, Some(sets.as_slice()))
    } else if let Some(viewer) = scene.viewers.get(state.active_viewer) {
        let set = shadow_polygons_for(viewer, &scene.obstacles, &scene.map);
        state.token_hidden = scene
            .tokens
            .iter()
            .map(|t| is_point_in_shadow_set(&t.position, &set))
            .collect();
        state.fog.draw_shadows(&mut surface, viewer, &request, Some(&set))
    } else {
        state.token_hidden = vec![false; scene.tokens.len()];
        DrawOutcome::Skipped
    };

    match outcome {
        DrawOutcome::Drawn => {
            let image = egui::ColorImage::from_rgba_premultiplied([size.0 as usize, size.1 as usize], surface.premultiplied_rgba());
            match state.fog_texture.as_mut() {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => state.fog_texture = Some(ctx.load_texture("fog_layer", image, egui::TextureOptions::LINEAR)),
            }
        }
        DrawOutcome::Skipped => state.fog_texture = None,
        DrawOutcome::SurfaceUnavailable => {
            warn!("Fog layer unavailable at {}x{}", size.0, size.1);
            state.fog_texture = None;
        }
    }
}
