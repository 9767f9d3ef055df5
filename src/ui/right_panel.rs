//! # Right Panel - Obstacle Inspector
//!
//! Lists every obstacle of the scene in a table and shows details for the
//! selected one. Doors can be opened or closed and one-way walls turned from
//! here as well as from the map.
//!
//! The table uses `egui_extras::TableBuilder` for efficient virtualized rendering.

use eframe::egui;
use egui::Color32;
use egui_extras::{Column, TableBuilder};
use log::info;

use crate::ui::AppState;
use tabletop_fog::{Direction, Obstacle, ObstacleKind};

/// Render the right inspector panel.
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    let panel = egui::SidePanel::right("inspector_right")
        .resizable(true)
        .default_width(state.right_panel_width)
        .show(ctx, |ui| {
            ui.heading("Inspector");
            ui.separator();

            if state.scene.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.label("No scene loaded");
                });
                return;
            }

            render_selected(ui, state);
            ui.separator();
            render_obstacle_table(ui, state);
        });
    state.right_panel_width = panel.response.rect.width();
}

/// Short description of an obstacle's state for the table.
fn obstacle_state(obstacle: &Obstacle) -> String {
    match obstacle.kind {
        ObstacleKind::Door { is_open } => (if is_open { "open" } else { "closed" }).to_string(),
        ObstacleKind::OneWayWall { direction } => format!("{:?}", direction).to_lowercase(),
        _ => String::new(),
    }
}

/// Details and edit controls for the selected obstacle.
fn render_selected(ui: &mut egui::Ui, state: &mut AppState) {
    let Some(idx) = state.selected_obstacle else {
        ui.label("Click an obstacle on the map or in the table to select it.");
        return;
    };
    let Some(obstacle) = state.scene.as_mut().and_then(|s| s.obstacles.get_mut(idx)) else {
        return;
    };

    ui.horizontal(|ui| {
        ui.label("Selected:");
        ui.label(egui::RichText::new(&obstacle.id).strong().color(Color32::YELLOW));
        ui.label(format!("({})", obstacle.kind.label()));
    });
    ui.horizontal(|ui| {
        ui.label("Points:");
        ui.label(egui::RichText::new(obstacle.points.len().to_string()).strong());
    });

    let mut changed = false;
    match &mut obstacle.kind {
        ObstacleKind::Door { is_open } => {
            let label = if *is_open { "Close door" } else { "Open door" };
            if ui.button(label).clicked() {
                *is_open = !*is_open;
                changed = true;
            }
        }
        ObstacleKind::OneWayWall { direction } => {
            ui.horizontal(|ui| {
                ui.label("Sight allowed towards:");
                for (value, text) in [
                    (Direction::North, "N"),
                    (Direction::East, "E"),
                    (Direction::South, "S"),
                    (Direction::West, "W"),
                ] {
                    changed |= ui.selectable_value(direction, value, text).changed();
                }
            });
        }
        _ => {}
    }
    if changed {
        info!("Obstacle {} changed to {}", obstacle.id, obstacle_state(obstacle));
        state.mark_dirty();
    }
}

fn render_obstacle_table(ui: &mut egui::Ui, state: &mut AppState) {
    let Some(scene) = state.scene.as_ref() else {
        return;
    };

    let row_height = ui.text_style_height(&egui::TextStyle::Body) * 1.3;
    let mut clicked = None;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .sense(egui::Sense::click())
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(110.0).at_least(60.0)) // Id
        .column(Column::initial(90.0).at_least(60.0)) // Kind
        .column(Column::initial(50.0).at_least(40.0)) // Points
        .column(Column::remainder()) // State
        .header(row_height, |mut header| {
            header.col(|ui| {
                ui.strong("Id");
            });
            header.col(|ui| {
                ui.strong("Kind");
            });
            header.col(|ui| {
                ui.strong("Points");
            });
            header.col(|ui| {
                ui.strong("State");
            });
        })
        .body(|body| {
            body.rows(row_height, scene.obstacles.len(), |mut row| {
                let idx = row.index();
                let obstacle = &scene.obstacles[idx];
                row.set_selected(state.selected_obstacle == Some(idx));
                row.col(|ui| {
                    ui.label(&obstacle.id);
                });
                row.col(|ui| {
                    ui.label(obstacle.kind.label());
                });
                row.col(|ui| {
                    ui.label(obstacle.points.len().to_string());
                });
                row.col(|ui| {
                    ui.label(obstacle_state(obstacle));
                });
                if row.response().clicked() {
                    clicked = Some(idx);
                }
            });
        });

    if let Some(idx) = clicked {
        state.selected_obstacle = if state.selected_obstacle == Some(idx) { None } else { Some(idx) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_fog::Point;

    #[test]
    fn describes_obstacle_state() {
        let (a, b) = (Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert_eq!(obstacle_state(&Obstacle::door("d", a, b, true)), "open");
        assert_eq!(obstacle_state(&Obstacle::door("d", a, b, false)), "closed");
        assert_eq!(obstacle_state(&Obstacle::one_way_wall("w", a, b, Direction::West)), "west");
        assert_eq!(obstacle_state(&Obstacle::wall("w", vec![a, b])), "");
    }
}
