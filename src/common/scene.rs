//! Scene loading, parsing, and validation logic.
//!
//! A scene bundles what the surrounding map application would otherwise
//! supply at runtime: map bounds, the obstacle list, viewer positions and
//! the tokens whose visibility is being decided.

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::visibility::{MapBounds, Obstacle, ObstacleKind, Point};

/// Error type for scene loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// A named marker whose visibility is decided by the viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub position: Point,
}

/// Root structure representing the entire scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Size of the map in world units.
    pub map: MapBounds,
    /// Obstacles blocking line of sight.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Positions sight is evaluated from.
    #[serde(default)]
    pub viewers: Vec<Point>,
    /// Markers revealed only when some viewer can see them.
    #[serde(default)]
    pub tokens: Vec<Token>,
    /// Optional path to background image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

impl Scene {
    /// Token positions in scene order.
    pub fn token_positions(&self) -> Vec<Point> {
        self.tokens.iter().map(|t| t.position).collect()
    }
}

/// Points an obstacle kind needs before it can block anything.
pub fn minimum_points(kind: &ObstacleKind) -> usize {
    match kind {
        ObstacleKind::Polygon => 3,
        ObstacleKind::Wall | ObstacleKind::Rectangle | ObstacleKind::OneWayWall { .. } | ObstacleKind::Door { .. } => 2,
    }
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &str) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    let mut scene: Scene = serde_json::from_str(&data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(format!("{:#}", e)))?;

    // If background_image is specified, resolve it against the scene file's directory
    if let Some(ref bg_image) = scene.background_image {
        if Path::new(bg_image).is_relative() {
            if let Some(parent_dir) = Path::new(path).parent() {
                let full_path = parent_dir.join(bg_image);
                scene.background_image = Some(full_path.to_string_lossy().to_string());
            }
        }
    }

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;

    info!(
        "Loaded scene {}: {} obstacles, {} viewers, {} tokens",
        path,
        scene.obstacles.len(),
        scene.viewers.len(),
        scene.tokens.len()
    );
    Ok(scene)
}

/// Validate scene configuration.
///
/// Structural problems (bad numbers, duplicate ids) are rejected. Obstacles
/// that are merely degenerate are accepted with a warning: they contribute
/// no occlusion, and authored data must never stop the map from rendering.
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_MAP_DIMENSION: f64 = 100_000.0;
    const MAX_OBSTACLES: usize = 10_000;
    const MAX_VIEWERS: usize = 64;

    let MapBounds { width, height } = scene.map;
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(format!("Map bounds {}x{} must be positive and finite", width, height));
    }
    if width > MAX_MAP_DIMENSION || height > MAX_MAP_DIMENSION {
        return Err(format!(
            "Map bounds {}x{} exceed maximum dimension of {}",
            width, height, MAX_MAP_DIMENSION
        ));
    }

    if scene.obstacles.len() > MAX_OBSTACLES {
        return Err(format!(
            "Obstacle count {} exceeds maximum of {}",
            scene.obstacles.len(),
            MAX_OBSTACLES
        ));
    }
    if scene.viewers.len() > MAX_VIEWERS {
        return Err(format!("Viewer count {} exceeds maximum of {}", scene.viewers.len(), MAX_VIEWERS));
    }

    // Check for duplicate obstacle IDs
    let mut obstacle_ids = HashSet::new();
    for obstacle in &scene.obstacles {
        if !obstacle_ids.insert(obstacle.id.as_str()) {
            return Err(format!("Duplicate obstacle id found: {}", obstacle.id));
        }
    }

    for (idx, obstacle) in scene.obstacles.iter().enumerate() {
        if let Some(p) = obstacle.points.iter().find(|p| !p.is_finite()) {
            return Err(format!(
                "Obstacle {} ({}) has a non-finite point ({}, {})",
                idx,
                obstacle.kind.label(),
                p.x,
                p.y
            ));
        }
        if let Some(opacity) = obstacle.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(format!("Obstacle {} has opacity {} outside 0-1", obstacle.id, opacity));
            }
        }

        let needed = minimum_points(&obstacle.kind);
        if obstacle.points.len() < needed {
            warn!(
                "Obstacle {} ({}) has {} points, needs {}; it will not block sight",
                obstacle.id,
                obstacle.kind.label(),
                obstacle.points.len(),
                needed
            );
            continue;
        }
        if obstacle.kind == ObstacleKind::Rectangle {
            let (tl, br) = (obstacle.points[0], obstacle.points[1]);
            if tl.x >= br.x || tl.y >= br.y {
                warn!(
                    "Obstacle {} (rectangle) top-left ({}, {}) is not above-left of bottom-right ({}, {})",
                    obstacle.id, tl.x, tl.y, br.x, br.y
                );
            }
        }
    }

    for (idx, viewer) in scene.viewers.iter().enumerate() {
        if !viewer.is_finite() {
            return Err(format!("Viewer {} position ({}, {}) is not finite", idx, viewer.x, viewer.y));
        }
    }
    for token in &scene.tokens {
        if !token.position.is_finite() {
            return Err(format!("Token {} position is not finite", token.name));
        }
    }

    Ok(())
}
