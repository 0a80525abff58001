//! Viewer configuration
//!
//! Every field has a default matching the stock viewer, so a JSON file only
//! needs to name what it changes.

use crate::{ViewerError, ViewerResult};
use meshlod_io::ExportOptions;
use meshlod_simplification::SimplificationParameters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Perspective camera settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance along +z
    pub initial_z: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 100.0,
            near: 0.01,
            far: 50000.0,
            initial_z: 10.0,
        }
    }
}

/// Scene lights, colours as 0xRRGGBB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: u32,
    pub directional_color: u32,
    pub directional_position: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: 0x404040,
            directional_color: 0xffffff,
            directional_position: [3.0, 3.0, 2.0],
        }
    }
}

/// Where background images are looked up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub resource_root: PathBuf,
    /// Directory under `resource_root`
    pub directory: PathBuf,
    /// Background applied at registration; `None` starts without one
    pub initial: Option<String>,
}

impl BackgroundConfig {
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.resource_root.join(&self.directory).join(name)
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("."),
            directory: PathBuf::from("resources/images/background"),
            initial: Some("background0.jpg".to_string()),
        }
    }
}

/// Orbit of the cinematic camera around the scene centre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CinematicConfig {
    pub offset: [f32; 3],
    pub speed: f32,
}

impl Default for CinematicConfig {
    fn default() -> Self {
        Self {
            offset: [10.0, 10.0, 10.0],
            speed: 0.1,
        }
    }
}

/// Viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    /// Clear colour as 0xRRGGBB
    pub clear_color: u32,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub background: BackgroundConfig,
    pub cinematic: CinematicConfig,
    pub export: ExportOptions,
    /// Parameters the panel starts with
    pub parameters: SimplificationParameters,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            clear_color: 0xdddddd,
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            background: BackgroundConfig::default(),
            cinematic: CinematicConfig::default(),
            export: ExportOptions::default(),
            parameters: SimplificationParameters::default(),
        }
    }
}

impl ViewerConfig {
    /// Headless preset: no initial background to load
    pub fn headless() -> Self {
        Self {
            background: BackgroundConfig {
                initial: None,
                ..BackgroundConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> ViewerResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| ViewerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> ViewerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn validate(&self) -> ViewerResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ViewerError::Config(format!(
                "container size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        let c = &self.camera;
        if !(c.fov > 0.0 && c.fov < 180.0) {
            return Err(ViewerError::Config(format!("camera fov {} out of range", c.fov)));
        }
        if !(c.near > 0.0 && c.far > c.near) {
            return Err(ViewerError::Config(format!(
                "camera clip planes near={} far={} are invalid",
                c.near, c.far
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_viewer() {
        let config = ViewerConfig::default();
        assert_eq!(config.clear_color, 0xdddddd);
        assert_eq!(config.camera.fov, 100.0);
        assert_eq!(config.camera.initial_z, 10.0);
        assert_eq!(config.lighting.ambient_color, 0x404040);
        assert_eq!(config.cinematic.speed, 0.1);
        assert!(!config.export.stl_binary);
        assert_eq!(config.background.initial.as_deref(), Some("background0.jpg"));
        assert_eq!(
            config.background.path_for("sky.jpg"),
            Path::new("./resources/images/background/sky.jpg")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = ViewerConfig::from_json_str(
            r#"{ "width": 640, "camera": { "fov": 60 }, "export": { "stl_binary": true } }"#,
        )
        .unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 800);
        assert_eq!(config.camera.fov, 60.0);
        assert_eq!(config.camera.far, 50000.0);
        assert!(config.export.stl_binary);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            ViewerConfig::from_json_str("{ width: }"),
            Err(ViewerError::Config(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json_str(r#"{ "height": 0 }"#),
            Err(ViewerError::Config(_))
        ));
    }
}
