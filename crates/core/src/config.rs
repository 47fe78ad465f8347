//! Viewer configuration loaded from TOML.
//!
//! Every field has a default, so an empty or missing file yields the
//! stock 800x800 viewer looking at `models/backpack.obj`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    pub render: RenderConfig,
    pub camera: CameraConfig,
    pub log_filter: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: AssetConfig::default(),
            render: RenderConfig::default(),
            camera: CameraConfig::default(),
            log_filter: crate::DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            title: "Vulkan Viewer".to_owned(),
        }
    }
}

/// Paths to the model, textures and SPIR-V shaders.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    pub model: PathBuf,
    pub diffuse: PathBuf,
    pub specular: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/backpack.obj"),
            diffuse: PathBuf::from("textures/diffuse.jpg"),
            specular: PathBuf::from("textures/specular.jpg"),
            vertex_shader: PathBuf::from("shaders/vert.spv"),
            fragment_shader: PathBuf::from("shaders/frag.spv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Enable the Khronos validation layer and debug messenger.
    pub validation: bool,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Upper bound for a single fence wait, in nanoseconds.
    pub frame_timeout_ns: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            frame_timeout_ns: u64::MAX,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of cursor travel.
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [2.0, 2.0, 2.0],
            speed: 10.0,
            sensitivity: 0.1,
        }
    }
}

impl ViewerConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::info!("Loading config from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.assets.model, PathBuf::from("models/backpack.obj"));
        assert_eq!(config.render.frame_timeout_ns, u64::MAX);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let text = r#"
            [window]
            width = 1024

            [camera]
            speed = 2.5
        "#;
        let config = ViewerConfig::from_toml_str(text).unwrap();

        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.camera.speed, 2.5);
        assert_eq!(config.camera.position, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let result = ViewerConfig::from_toml_str("[window]\nwidth = \"wide\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ViewerConfig::load(Path::new("definitely/not/here.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }
}
