use std::f32::consts::FRAC_PI_3;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::assets::ResolveAssets;
use crate::cache::{RenderResourceCache, SelectOutcome};
use crate::camera::{CameraSettings, OrbitCamera};
use crate::input::{ControlSettings, HeldKeys, InputEvent, InputQueue};
use crate::math;
use crate::obj::MeshData;
use crate::pipeline::{DepthPolicy, PipelineFactory, PipelineSelector};
use crate::skybox::{SkyboxBuilder, SkyboxFaceSet, SkyboxSettings, SKYBOX_VERTEX_COUNT};
use crate::texture::TextureImage;

/// Shortest frame step used for integration, in seconds.
pub const MIN_FRAME_TIME: f32 = 1.0 / 600.0;

const DEBUG_EYE: Vec3 = Vec3::new(0.0, 0.0, 3.0);
const DEBUG_NEAR: f32 = 0.01;
const DEBUG_FAR: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    /// Direction the light travels; normalized before upload.
    pub direction: Vec3,
    pub ambient: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-1.0, -1.0, -0.5),
            ambient: 0.9,
        }
    }
}

impl LightingSettings {
    pub fn light_direction(&self) -> Vec3 {
        self.direction.try_normalize().unwrap_or(Vec3::NEG_Y)
    }
}

/// Per-draw uniform bundle, laid out to match the WGSL `Uniforms` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub light_dir: [f32; 3],
    pub ambient: f32,
    pub time: f32,
    pub _pad: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkyboxUniforms {
    pub view_proj_no_translation: [[f32; 4]; 4],
}

pub struct SkyboxDraw<'a> {
    pub faces: &'a SkyboxFaceSet,
    /// Bumped on every successful (re)load so the draw layer can re-upload.
    pub generation: u64,
    pub uniforms: SkyboxUniforms,
    pub vertex_count: u32,
    pub depth: DepthPolicy,
}

pub struct MeshDraw<'a, P> {
    pub mesh: &'a Arc<MeshData>,
    pub texture: &'a Arc<TextureImage>,
    pub pipeline: &'a P,
    pub depth: DepthPolicy,
}

/// Everything the draw layer needs for one frame, skybox first.
pub struct FramePlan<'a, P> {
    pub dt: f32,
    pub view: Mat4,
    pub proj: Mat4,
    pub uniforms: Uniforms,
    pub skybox: Option<SkyboxDraw<'a>>,
    pub mesh: Option<MeshDraw<'a, P>>,
}

/// Mutable viewer state touched by input events and frame composition.
pub struct ViewerState<R, F: PipelineFactory> {
    pub camera: OrbitCamera,
    pub cache: RenderResourceCache<R>,
    pub pipelines: PipelineSelector<F>,
    pub skybox: Option<SkyboxFaceSet>,
    pub skybox_generation: u64,
    pub held: HeldKeys,
    pub debug_camera: bool,
}

/// Per-frame orchestration: applies queued input, integrates held keys and
/// produces the two-pass draw plan.
pub struct FrameComposer<R, F: PipelineFactory> {
    state: ViewerState<R, F>,
    camera_settings: CameraSettings,
    controls: ControlSettings,
    lighting: LightingSettings,
    skybox_source: Option<(SkyboxBuilder, SkyboxSettings)>,
    queue: InputQueue,
    started: Instant,
    last_frame: Option<Instant>,
}

impl<R: ResolveAssets, F: PipelineFactory> FrameComposer<R, F> {
    /// Builds the composer and activates the first catalog model.
    pub fn new(
        camera_settings: CameraSettings,
        controls: ControlSettings,
        lighting: LightingSettings,
        cache: RenderResourceCache<R>,
        pipelines: PipelineSelector<F>,
    ) -> Self {
        let mut composer = Self {
            state: ViewerState {
                camera: OrbitCamera::new(&camera_settings),
                cache,
                pipelines,
                skybox: None,
                skybox_generation: 0,
                held: HeldKeys::default(),
                debug_camera: false,
            },
            camera_settings,
            controls,
            lighting,
            skybox_source: None,
            queue: InputQueue::new(),
            started: Instant::now(),
            last_frame: None,
        };
        composer.select_model(0);
        composer
    }

    /// Attaches a skybox source and loads it. A missing or invalid skybox is
    /// logged and the scene renders without one.
    pub fn with_skybox(mut self, builder: SkyboxBuilder, settings: SkyboxSettings) -> Self {
        if settings.enabled {
            self.skybox_source = Some((builder, settings));
            self.reload_skybox();
        }
        self
    }

    pub fn reload_skybox(&mut self) -> bool {
        let Some((builder, settings)) = &self.skybox_source else {
            return false;
        };
        match builder.build_from_settings(settings) {
            Ok(faces) => {
                self.state.skybox = Some(faces);
                self.state.skybox_generation += 1;
                true
            }
            Err(err) => {
                warn!("rendering without skybox: {err}");
                self.state.skybox = None;
                false
            }
        }
    }

    /// Producer handle for the windowing layer.
    pub fn queue(&self) -> InputQueue {
        self.queue.clone()
    }

    pub fn state(&self) -> &ViewerState<R, F> {
        &self.state
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.state.camera
    }

    pub fn controls(&self) -> &ControlSettings {
        &self.controls
    }

    pub fn select_model(&mut self, index: isize) -> SelectOutcome {
        let outcome = self.state.cache.select(index);
        self.after_model_change(&outcome);
        outcome
    }

    fn after_model_change(&mut self, outcome: &SelectOutcome) {
        if *outcome == SelectOutcome::Unchanged {
            return;
        }
        let layout = self
            .state
            .cache
            .active()
            .and_then(|active| active.layout.clone());
        self.state.pipelines.on_vertex_layout(layout.as_ref());
    }

    /// Applies one input event immediately. Events pushed through the queue
    /// go through here at the start of the next frame.
    pub fn apply(&mut self, event: InputEvent) {
        debug!("input {event:?}");
        let state = &mut self.state;
        match event {
            InputEvent::Orbit {
                delta_yaw,
                delta_pitch,
            } => state.camera.orbit(delta_yaw, delta_pitch),
            InputEvent::Pan(delta) => state.camera.pan(delta),
            InputEvent::Zoom(scale) => state.camera.zoom(scale),
            InputEvent::Key { key, down } => state.held.set(key, down),
            InputEvent::SelectModel(index) => {
                self.select_model(index);
            }
            InputEvent::NextModel => {
                let outcome = state.cache.next_model();
                self.after_model_change(&outcome);
            }
            InputEvent::PreviousModel => {
                let outcome = state.cache.previous_model();
                self.after_model_change(&outcome);
            }
            InputEvent::SelectVertexShader(index) => {
                state.pipelines.select_vertex_shader(index);
            }
            InputEvent::SelectFragmentShader(index) => {
                state.pipelines.select_fragment_shader(index);
            }
            InputEvent::ResetShaders => {
                state.pipelines.reset_to_default();
            }
            InputEvent::ToggleDebugCamera => {
                state.debug_camera = !state.debug_camera;
                info!("debug camera {}", if state.debug_camera { "on" } else { "off" });
            }
            InputEvent::ReloadSkybox => {
                self.reload_skybox();
            }
            InputEvent::ResetCamera => self.reset_camera(),
            InputEvent::ReleaseKeys => state.held.clear(),
            InputEvent::Resize { width, height } => {
                state.camera.set_drawable_size(width as f32, height as f32);
            }
            InputEvent::OutputFormats { color, depth } => {
                state.pipelines.set_output_formats(color, depth);
            }
        }
    }

    /// Restores the configured camera pose.
    pub fn reset_camera(&mut self) {
        self.state.camera.reset(&self.camera_settings);
    }

    pub fn compose_frame(&mut self, now: Instant) -> FramePlan<'_, F::Pipeline> {
        for event in self.queue.drain() {
            self.apply(event);
        }

        let dt = self
            .last_frame
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32())
            .max(MIN_FRAME_TIME);
        self.last_frame = Some(now);

        let state = &mut self.state;
        if !state.debug_camera {
            let orbit = state.held.orbit_delta(&self.controls, dt);
            if orbit != glam::Vec2::ZERO {
                state.camera.orbit(orbit.x, orbit.y);
            }
            if let Some(scale) = state.held.zoom_scale(&self.controls, dt) {
                state.camera.zoom(scale);
            }
        }

        let (view, proj) = if state.debug_camera {
            (
                math::look_at(DEBUG_EYE, Vec3::ZERO, Vec3::Y),
                math::perspective(FRAC_PI_3, state.camera.aspect(), DEBUG_NEAR, DEBUG_FAR),
            )
        } else {
            (state.camera.view_matrix(), state.camera.proj_matrix())
        };

        let time = now
            .checked_duration_since(self.started)
            .unwrap_or(Duration::ZERO)
            .as_secs_f32();
        let uniforms = Uniforms {
            model: state.cache.model_matrix().to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            light_dir: self.lighting.light_direction().to_array(),
            ambient: self.lighting.ambient,
            time,
            _pad: [0.0; 3],
        };

        let state = &self.state;
        let skybox = state.skybox.as_ref().map(|faces| SkyboxDraw {
            faces,
            generation: state.skybox_generation,
            uniforms: SkyboxUniforms {
                view_proj_no_translation: math::view_projection_without_translation(view, proj)
                    .to_cols_array_2d(),
            },
            vertex_count: SKYBOX_VERTEX_COUNT,
            depth: DepthPolicy::SKYBOX,
        });

        let mesh = state.cache.active().and_then(|active| {
            let mesh = active.mesh.as_ref()?;
            let pipeline = state.pipelines.current()?;
            Some(MeshDraw {
                mesh,
                texture: &active.texture,
                pipeline,
                depth: DepthPolicy::MESH,
            })
        });

        FramePlan {
            dt,
            view,
            proj,
            uniforms,
            skybox,
            mesh,
        }
    }
}
