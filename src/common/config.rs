//! Configuration loading for fog rendering and the map viewer.

use serde::Deserialize;
use std::path::Path;

/// Rendering options read from `fog.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FogConfig {
    /// Blend strength of the fog layer (0 = invisible, 1 = opaque).
    pub fog_opacity: f32,
    /// Anti-alias shadow edges.
    pub anti_alias: bool,
    /// Draw the obstacle overlay (GM view).
    pub show_obstacles: bool,
    /// Draw vertex handles on the selected obstacle.
    pub show_handles: bool,
    /// RGB colour of the fog.
    pub fog_color: [u8; 3],
}

impl Default for FogConfig {
    fn default() -> Self {
        FogConfig {
            fog_opacity: 0.85,
            anti_alias: true,
            show_obstacles: true,
            show_handles: false,
            fog_color: [0, 0, 0],
        }
    }
}

impl FogConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the fog.toml file
    ///
    /// # Returns
    /// * `Ok(FogConfig)` if the file was successfully loaded and parsed
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    /// Parse configuration text; missing keys keep their defaults.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut config: FogConfig = toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.fog_opacity = if config.fog_opacity.is_nan() { 0.0 } else { config.fog_opacity.clamp(0.0, 1.0) };
        Ok(config)
    }

    /// Derive the config path from a scene file path.
    ///
    /// Replaces the scene filename with "fog.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &str) -> std::path::PathBuf {
        let scene = Path::new(scene_path);
        scene.parent().unwrap_or(Path::new(".")).join("fog.toml")
    }

    /// Load the config next to a scene, falling back to defaults.
    pub fn for_scene(scene_path: &str) -> Self {
        let path = Self::config_path_from_scene(scene_path);
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded fog config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(FogConfig::parse("").unwrap(), FogConfig::default());
    }

    #[test]
    fn kebab_case_keys_and_clamping() {
        let config = FogConfig::parse("fog-opacity = 1.7\nanti-alias = false\nfog-color = [20, 30, 40]\n").unwrap();
        assert_eq!(config.fog_opacity, 1.0);
        assert!(!config.anti_alias);
        assert_eq!(config.fog_color, [20, 30, 40]);
        assert!(config.show_obstacles);
    }

    #[test]
    fn invalid_toml_reports_error() {
        let err = FogConfig::parse("fog-opacity = \"dark\"").unwrap_err();
        assert!(err.starts_with("Failed to parse config file"));
    }

    #[test]
    fn config_found_next_to_scene() {
        let dir = tempfile::tempdir().unwrap();
        let scene_path = dir.path().join("scene.json");
        std::fs::write(dir.path().join("fog.toml"), "show-handles = true\n").unwrap();

        let scene = scene_path.to_string_lossy().to_string();
        assert_eq!(FogConfig::config_path_from_scene(&scene), dir.path().join("fog.toml"));
        assert!(FogConfig::for_scene(&scene).show_handles);
    }

    #[test]
    fn missing_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("scene.json").to_string_lossy().to_string();
        assert_eq!(FogConfig::for_scene(&scene), FogConfig::default());
    }
}
