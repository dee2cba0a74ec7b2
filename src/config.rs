use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assets::AssetSettings;
use crate::camera::CameraSettings;
use crate::catalog::{default_catalog, ModelAsset};
use crate::frame::LightingSettings;
use crate::input::ControlSettings;
use crate::skybox::SkyboxSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f64; 3],
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Orbit Viewer".into(),
            width: 1280,
            height: 720,
            clear_color: [0.08, 0.09, 0.12],
        }
    }
}

/// Complete viewer configuration. Every section falls back to defaults, so an
/// empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraSettings,
    pub controls: ControlSettings,
    pub lighting: LightingSettings,
    pub assets: AssetSettings,
    pub skybox: SkyboxSettings,
    pub window: WindowSettings,
    pub models: Vec<ModelAsset>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            controls: ControlSettings::default(),
            lighting: LightingSettings::default(),
            assets: AssetSettings::default(),
            skybox: SkyboxSettings::default(),
            window: WindowSettings::default(),
            models: default_catalog(),
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid viewer configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }
}
