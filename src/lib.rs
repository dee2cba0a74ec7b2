//! Core of an interactive textured-mesh viewer.
//!
//! The crate covers the orbit camera, asset resolution and caching, the
//! skybox builder, shader pipeline selection and per-frame composition. All
//! of it runs without a GPU: the asset and pipeline seams are traits, and the
//! wgpu draw layer in [`render`] only consumes the [`FramePlan`] produced each
//! frame.

pub mod assets;
pub mod cache;
pub mod camera;
pub mod catalog;
pub mod config;
pub mod error;
pub mod frame;
pub mod input;
pub mod math;
pub mod obj;
pub mod pipeline;
pub mod render;
pub mod shaders;
pub mod skybox;
pub mod texture;

pub use assets::{AssetResolver, AssetSettings, LoadedMesh, ResolveAssets};
pub use cache::{ActiveResource, RenderResourceCache, SelectOutcome};
pub use camera::{CameraSettings, OrbitCamera};
pub use catalog::{default_catalog, ModelAsset};
pub use config::{ViewerConfig, WindowSettings};
pub use error::ViewerError;
pub use frame::{FrameComposer, FramePlan, LightingSettings, ViewerState};
pub use input::{ControlSettings, InputEvent, InputQueue, KeyCode, NamedKey, ViewerKey};
pub use obj::{load_obj_from_str, MeshData, VertexLayout};
pub use pipeline::{PipelineFactory, PipelineKey, PipelineSelector, RebuildOutcome};
pub use render::{Renderer, WgpuPipelineFactory};
pub use shaders::{FragmentShader, VertexShader};
pub use skybox::{SkyboxBuilder, SkyboxFaceSet, SkyboxSettings};
pub use texture::TextureImage;
