//! # Top Panel - Scene and Fog Controls
//!
//! This module renders the fixed-height top panel displaying:
//! - Column 1: Scene file, open button and visibility counts
//! - Column 2: Fog controls (opacity, anti-aliasing, viewer selection)
//! - Column 3: Overlay toggles for the GM view

use crate::ui::AppState;
use eframe::egui;

/// Render the top panel with scene info and controls.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state for reading counts and updating controls
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    egui::TopBottomPanel::top("top_controls").exact_height(110.0).show(ctx, |ui| {
        ui.columns(3, |cols| {
            cols[0].vertical(|ui| {
                render_scene_info(ui, ctx, state);
            });
            cols[1].vertical(|ui| {
                render_fog_controls(ui, state);
            });
            cols[2].vertical(|ui| {
                render_overlay_toggles(ui, state);
            });
        });
    });
}

/// Scene file name, open button and how many tokens are visible.
fn render_scene_info(ui: &mut egui::Ui, ctx: &egui::Context, state: &mut AppState) {
    ui.heading("Scene");
    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Open scene…").clicked() {
            state.open_file_selector(ctx);
        }
        let name = state
            .scene_path
            .as_deref()
            .and_then(|p| std::path::Path::new(p).file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "-".to_string());
        ui.label(egui::RichText::new(name).monospace().strong());
    });

    if let Some(scene) = &state.scene {
        ui.horizontal(|ui| {
            ui.label("Obstacles:");
            ui.label(egui::RichText::new(scene.obstacles.len().to_string()).strong());
            ui.label("  Viewers:");
            ui.label(egui::RichText::new(scene.viewers.len().to_string()).strong());
        });
        ui.horizontal(|ui| {
            ui.label("Tokens visible:");
            ui.label(egui::RichText::new(format!("{} / {}", state.visible_token_count(), scene.tokens.len())).strong());
        });
    }
}

fn render_fog_controls(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("Fog");
    ui.separator();
    ui.horizontal(|ui| {
        ui.label("Opacity:");
        if ui.add(egui::Slider::new(&mut state.config.fog_opacity, 0.0..=1.0)).changed() {
            state.mark_dirty();
        }
    });
    ui.horizontal(|ui| {
        if ui.checkbox(&mut state.config.anti_alias, "Anti-alias").changed() {
            state.fog.set_anti_alias(state.config.anti_alias);
            state.mark_dirty();
        }
        if ui.checkbox(&mut state.combined_view, "All viewers").changed() {
            state.mark_dirty();
        }
    });

    let viewer_count = state.scene.as_ref().map_or(0, |s| s.viewers.len());
    ui.add_enabled_ui(!state.combined_view && viewer_count > 0, |ui| {
        ui.horizontal(|ui| {
            ui.label("Viewer:");
            let before = state.active_viewer;
            egui::ComboBox::from_id_salt("active_viewer_selector")
                .selected_text(format!("#{}", state.active_viewer + 1))
                .show_ui(ui, |ui| {
                    for idx in 0..viewer_count {
                        ui.selectable_value(&mut state.active_viewer, idx, format!("#{}", idx + 1));
                    }
                });
            if state.active_viewer != before {
                state.mark_dirty();
            }
        });
    });
}

fn render_overlay_toggles(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("Overlay");
    ui.separator();
    ui.checkbox(&mut state.config.show_obstacles, "Show obstacles");
    ui.add_enabled_ui(state.config.show_obstacles, |ui| {
        ui.checkbox(&mut state.config.show_handles, "Show handles");
    });
}
