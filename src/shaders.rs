//! Closed set of shader variants selectable at runtime.
//!
//! Variants are chosen by index from the input layer; any index outside the
//! table selects the default variant.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexShader {
    #[default]
    Main,
    NoiseDeform,
    ThinShrink,
    TwistY,
}

impl VertexShader {
    pub const ALL: [VertexShader; 4] = [
        VertexShader::Main,
        VertexShader::NoiseDeform,
        VertexShader::ThinShrink,
        VertexShader::TwistY,
    ];

    pub fn from_index(index: i64) -> Self {
        match index {
            1 => VertexShader::NoiseDeform,
            2 => VertexShader::ThinShrink,
            3 => VertexShader::TwistY,
            _ => VertexShader::Main,
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            VertexShader::Main => "v_main",
            VertexShader::NoiseDeform => "v_noise_deform",
            VertexShader::ThinShrink => "v_thin_shrink",
            VertexShader::TwistY => "v_twist_y",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FragmentShader {
    #[default]
    Main,
    Metal,
    ToonRim,
    MatcapSolid,
}

impl FragmentShader {
    pub const ALL: [FragmentShader; 4] = [
        FragmentShader::Main,
        FragmentShader::Metal,
        FragmentShader::ToonRim,
        FragmentShader::MatcapSolid,
    ];

    pub fn from_index(index: i64) -> Self {
        match index {
            1 => FragmentShader::Metal,
            2 => FragmentShader::ToonRim,
            3 => FragmentShader::MatcapSolid,
            _ => FragmentShader::Main,
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            FragmentShader::Main => "f_main",
            FragmentShader::Metal => "f_metal",
            FragmentShader::ToonRim => "f_toon_rim",
            FragmentShader::MatcapSolid => "f_matcap_solid",
        }
    }
}

pub const SKYBOX_VERTEX_ENTRY: &str = "skybox_v_main";
pub const SKYBOX_FRAGMENT_ENTRY: &str = "skybox_f_main";

impl fmt::Display for VertexShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

impl fmt::Display for FragmentShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}
