//! # Application State Management
//!
//! This module implements the central `AppState` struct which holds the loaded
//! scene and all UI state, and coordinates the rendering of all UI components.
//! It implements the `eframe::App` trait to integrate with the egui framework.
//!
//! ## Responsibilities
//!
//! - Loads scene files and their `fog.toml` configuration
//! - Tracks selection, viewer dragging and display options
//! - Caches the fog texture and token visibility, recomputing them only when
//!   the scene, the options or the map size change
//! - Persists user settings (last directory, panel width) across sessions

use eframe::egui;
use serde::{Deserialize, Serialize};

use tabletop_fog::common::config::FogConfig;
use tabletop_fog::common::scene::{Scene, load_scene};
use tabletop_fog::render::{FogCompositor, RasterSurface};

/// Central application state.
pub struct AppState {
    /// Optional alert message to display in a modal dialog.
    pub alert: Option<String>,

    // Scene
    /// The loaded scene, if any.
    pub scene: Option<Scene>,
    /// Path of the loaded scene file.
    pub scene_path: Option<String>,
    /// Rendering options, read from `fog.toml` next to the scene.
    pub config: FogConfig,

    // Interaction
    /// Index of the selected obstacle in `scene.obstacles`.
    pub selected_obstacle: Option<usize>,
    /// Index of the viewer currently being dragged.
    pub dragging_viewer: Option<usize>,
    /// Viewer whose sight is shown when not in combined mode.
    pub active_viewer: usize,
    /// Show the fog shared by all viewers instead of a single one.
    pub combined_view: bool,

    // Derived state
    /// Fog renderer; keeps its layers between frames.
    pub fog: FogCompositor<RasterSurface>,
    /// Last fog layer uploaded to the GPU; `None` when nothing is hidden.
    pub fog_texture: Option<egui::TextureHandle>,
    /// Pixel size the fog texture was rendered at.
    pub fog_texture_size: (u32, u32),
    /// Set whenever anything the fog depends on changes.
    pub fog_dirty: bool,
    /// Per token: hidden from the viewers currently shown.
    pub token_hidden: Vec<bool>,

    /// Loaded background image texture for rendering.
    pub background_image_texture: Option<egui::TextureHandle>,

    // Persistence
    /// Last directory used for the scene file picker.
    pub last_open_dir: Option<String>,
    /// Width of the right inspector panel in pixels.
    pub right_panel_width: f32,

    /// Scene passed on the command line, loaded on the first frame.
    pending_scene: Option<String>,
}

/// Settings persisted across application sessions.
#[derive(Default, Serialize, Deserialize)]
struct PersistedSettings {
    last_open_dir: Option<String>,
    right_panel_width: Option<f32>,
    combined_view: Option<bool>,
}

impl AppState {
    /// Create a new AppState, loading persisted settings if available.
    ///
    /// # Parameters
    ///
    /// * `storage` - Optional persistent storage for loading saved settings
    /// * `initial_scene` - Scene file to open on the first frame
    pub fn new(storage: Option<&dyn eframe::Storage>, initial_scene: Option<String>) -> Self {
        let persisted: PersistedSettings = storage.and_then(|s| eframe::get_value(s, "app_settings")).unwrap_or_default();
        let config = FogConfig::default();

        Self {
            alert: None,
            scene: None,
            scene_path: None,
            fog: FogCompositor::new()
                .with_fog_color(config.fog_color)
                .with_anti_alias(config.anti_alias),
            config,
            selected_obstacle: None,
            dragging_viewer: None,
            active_viewer: 0,
            combined_view: persisted.combined_view.unwrap_or(true),
            fog_texture: None,
            fog_texture_size: (0, 0),
            fog_dirty: true,
            token_hidden: Vec::new(),
            background_image_texture: None,
            last_open_dir: persisted.last_open_dir,
            right_panel_width: persisted.right_panel_width.unwrap_or(320.0),
            pending_scene: initial_scene,
        }
    }

    /// Flag the fog and token visibility for recomputation.
    pub fn mark_dirty(&mut self) {
        self.fog_dirty = true;
    }

    /// Number of tokens not hidden from the viewers currently shown.
    pub fn visible_token_count(&self) -> usize {
        self.token_hidden.iter().filter(|hidden| !**hidden).count()
    }

    /// Load a scene file together with its `fog.toml`, replacing the current scene.
    ///
    /// On failure the current scene is kept and an alert is shown.
    pub fn load_scene_file(&mut self, ctx: &egui::Context, path: &str) {
        let scene = match load_scene(path) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("Failed to load scene {}: {}", path, e);
                self.alert = Some(format!("Failed to load scene {}:\n{}", path, e));
                return;
            }
        };

        self.config = FogConfig::for_scene(path);
        self.fog.set_fog_color(self.config.fog_color);
        self.fog.set_anti_alias(self.config.anti_alias);
        self.fog.release_layers();

        self.background_image_texture = scene
            .background_image
            .as_deref()
            .and_then(|bg| Self::load_background_image(ctx, bg));
        self.selected_obstacle = None;
        self.dragging_viewer = None;
        self.active_viewer = 0;
        self.token_hidden = vec![false; scene.tokens.len()];
        self.fog_texture = None;
        self.scene = Some(scene);
        self.scene_path = Some(path.to_string());
        self.mark_dirty();
    }

    /// Load a background image from a file path and create an egui texture.
    ///
    /// # Returns
    ///
    /// `Some(TextureHandle)` if loading succeeds, `None` if it fails.
    fn load_background_image(ctx: &egui::Context, path: &str) -> Option<egui::TextureHandle> {
        match std::fs::read(path) {
            Ok(bytes) => match image::load_from_memory(&bytes) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    let size = [rgba.width() as usize, rgba.height() as usize];
                    let pixels = rgba.as_flat_samples();
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
                    let texture = ctx.load_texture("background_image", color_image, egui::TextureOptions::LINEAR);
                    log::info!("Successfully loaded background image from: {}", path);
                    Some(texture)
                }
                Err(e) => {
                    log::error!("Failed to decode background image from {}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::error!("Failed to read background image file {}: {}", path, e);
                None
            }
        }
    }

    /// Open a native file picker for selecting a scene JSON file.
    ///
    /// Starts in the last used directory if available. Cancelling keeps the
    /// current scene.
    pub fn open_file_selector(&mut self, ctx: &egui::Context) {
        let mut dialog = rfd::FileDialog::new().add_filter("Scene files", &["json"]);
        if let Some(dir) = &self.last_open_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(file) = dialog.pick_file() else {
            return;
        };
        // Remember directory for next time
        if let Some(parent) = file.parent() {
            self.last_open_dir = Some(parent.to_string_lossy().to_string());
        }
        let path = file.to_string_lossy().to_string();
        self.load_scene_file(ctx, &path);
    }
}

impl eframe::App for AppState {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            last_open_dir: self.last_open_dir.clone(),
            right_panel_width: Some(self.right_panel_width),
            combined_view: Some(self.combined_view),
        };
        eframe::set_value(storage, "app_settings", &settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(path) = self.pending_scene.take() {
            self.load_scene_file(ctx, &path);
        }

        if let Some(message) = self.alert.clone() {
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.label(message);
                        ui.add_space(20.0);

                        if ui.button("OK").clicked() {
                            self.alert = None;
                        }
                        ui.add_space(10.0);
                    });
                });
        }

        // Panels layout: top (fixed), right (resizable), map fills the remaining using CentralPanel
        super::top_panel::render(ctx, self);
        super::right_panel::render(ctx, self);
        super::map::render(ctx, self);
    }
}
