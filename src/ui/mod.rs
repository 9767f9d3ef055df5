// UI module for the fog-of-war map viewer
//
// This module organizes the UI into separate components:
// - `top_panel`: Scene picker, fog controls and visibility counts
// - `right_panel`: Obstacle inspector
// - `map`: Central map display with fog, obstacles, tokens and viewers
// - `app_state`: Application state management and main update loop

pub mod app_state;
pub mod map;
pub mod right_panel;
pub mod top_panel;

pub use app_state::AppState;
