use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::rotation_xyz_degrees;

/// One selectable model: file name stem, where it lives and how it is oriented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAsset {
    pub name: String,
    #[serde(default)]
    pub subdir: Option<String>,
    #[serde(default)]
    pub texture_base_name: Option<String>,
    /// Euler angles in degrees, applied X, then Y, then Z.
    #[serde(default)]
    pub pre_rotation_deg: Vec3,
}

impl ModelAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subdir: None,
            texture_base_name: None,
            pre_rotation_deg: Vec3::ZERO,
        }
    }

    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }

    pub fn with_texture(mut self, base_name: impl Into<String>) -> Self {
        self.texture_base_name = Some(base_name.into());
        self
    }

    pub fn with_rotation(mut self, degrees: Vec3) -> Self {
        self.pre_rotation_deg = degrees;
        self
    }

    pub fn pre_rotation(&self) -> Mat4 {
        rotation_xyz_degrees(self.pre_rotation_deg)
    }
}

/// Models bundled with the sample asset tree.
pub fn default_catalog() -> Vec<ModelAsset> {
    vec![
        ModelAsset::new("luigidoll")
            .with_subdir("Resources/Models")
            .with_texture("7c33ed83")
            .with_rotation(Vec3::new(0.0, 180.0, 0.0)),
        ModelAsset::new("13463_Australian_Cattle_Dog_v3")
            .with_subdir("Resources/Models")
            .with_texture("Australian_Cattle_Dog_dif")
            .with_rotation(Vec3::new(90.0, 180.0, 0.0)),
        ModelAsset::new("12222_Cat_v1_l3")
            .with_subdir("Resources/Models")
            .with_texture("Cat_diffuse")
            .with_rotation(Vec3::new(90.0, 180.0, 0.0)),
    ]
}
