pub mod native;
pub mod shaders;

pub use native::{Renderer, WgpuPipelineFactory, DEPTH_FORMAT};
pub use shaders::{ShaderLibrary, ShaderStage};
