use std::fmt;

use log::{error, info};

use crate::error::ViewerError;
use crate::obj::VertexLayout;
use crate::shaders::{FragmentShader, VertexShader};

/// Depth-stencil behaviour of one draw pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthPolicy {
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthPolicy {
    /// Sky sits on the far plane and never occludes anything.
    pub const SKYBOX: DepthPolicy = DepthPolicy {
        write: false,
        compare: wgpu::CompareFunction::LessEqual,
    };

    pub const MESH: DepthPolicy = DepthPolicy {
        write: true,
        compare: wgpu::CompareFunction::Less,
    };
}

/// Identity of a compiled mesh pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub vertex: VertexShader,
    pub fragment: FragmentShader,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:?}, {:?})",
            self.vertex, self.fragment, self.color_format, self.depth_format
        )
    }
}

/// Everything a factory needs to build one mesh pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDescriptor<'a> {
    pub key: PipelineKey,
    pub layout: &'a VertexLayout,
    pub depth: DepthPolicy,
    /// Imported meshes have inconsistent winding, so nothing is culled.
    pub cull_mode: Option<wgpu::Face>,
}

/// Compiles pipelines for the selector. Implemented over wgpu by the renderer
/// and by mocks in tests.
pub trait PipelineFactory {
    type Pipeline;

    fn build(&mut self, desc: &PipelineDescriptor<'_>) -> Result<Self::Pipeline, ViewerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Unchanged,
    Rebuilt,
    /// The previous pipeline (if any) is still active.
    Failed,
}

/// Keeps exactly one current mesh pipeline in sync with the selected shader
/// pair, the output formats and the active vertex layout.
pub struct PipelineSelector<F: PipelineFactory> {
    factory: F,
    vertex: VertexShader,
    fragment: FragmentShader,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    layout: VertexLayout,
    current: Option<(PipelineKey, F::Pipeline)>,
    /// Layout the current pipeline was built for.
    built_layout: VertexLayout,
    failures: usize,
    last_error: Option<ViewerError>,
}

impl<F: PipelineFactory> PipelineSelector<F> {
    /// Creates the selector and builds the default `v_main`/`f_main` pipeline.
    pub fn new(
        factory: F,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let mut selector = Self {
            factory,
            vertex: VertexShader::default(),
            fragment: FragmentShader::default(),
            color_format,
            depth_format,
            layout: VertexLayout::default(),
            current: None,
            built_layout: VertexLayout::default(),
            failures: 0,
            last_error: None,
        };
        selector.rebuild();
        selector
    }

    pub fn select_vertex_shader(&mut self, index: i64) -> RebuildOutcome {
        self.vertex = VertexShader::from_index(index);
        self.rebuild()
    }

    pub fn select_fragment_shader(&mut self, index: i64) -> RebuildOutcome {
        self.fragment = FragmentShader::from_index(index);
        self.rebuild()
    }

    pub fn reset_to_default(&mut self) -> RebuildOutcome {
        self.vertex = VertexShader::default();
        self.fragment = FragmentShader::default();
        self.rebuild()
    }

    /// Rebuilds only when the surface formats actually changed.
    pub fn set_output_formats(
        &mut self,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> RebuildOutcome {
        if color_format == self.color_format
            && depth_format == self.depth_format
            && self.current.is_some()
        {
            return RebuildOutcome::Unchanged;
        }
        self.color_format = color_format;
        self.depth_format = depth_format;
        self.rebuild()
    }

    /// Called after a model switch. A mesh without a layout gets the default
    /// interleaved layout; the pipeline is rebuilt only if the layout differs.
    pub fn on_vertex_layout(&mut self, layout: Option<&VertexLayout>) -> RebuildOutcome {
        let layout = layout.cloned().unwrap_or_default();
        if layout == self.layout && self.current.is_some() {
            return RebuildOutcome::Unchanged;
        }
        self.layout = layout;
        self.rebuild()
    }

    /// Compiles the requested state. On failure the previous pipeline stays
    /// current and the requested shaders, formats and layout roll back to the
    /// ones it was built for.
    pub fn rebuild(&mut self) -> RebuildOutcome {
        let key = self.requested_key();
        let desc = PipelineDescriptor {
            key,
            layout: &self.layout,
            depth: DepthPolicy::MESH,
            cull_mode: None,
        };
        match self.factory.build(&desc) {
            Ok(pipeline) => {
                info!("pipeline: {key}");
                self.current = Some((key, pipeline));
                self.built_layout = self.layout.clone();
                RebuildOutcome::Rebuilt
            }
            Err(err) => {
                self.failures += 1;
                if let Some((active, _)) = &self.current {
                    error!("pipeline {key} failed, keeping {active}: {err}");
                    self.vertex = active.vertex;
                    self.fragment = active.fragment;
                    self.color_format = active.color_format;
                    self.depth_format = active.depth_format;
                    self.layout = self.built_layout.clone();
                } else {
                    error!("pipeline {key} failed with no previous pipeline: {err}");
                }
                self.last_error = Some(err);
                RebuildOutcome::Failed
            }
        }
    }

    fn requested_key(&self) -> PipelineKey {
        PipelineKey {
            vertex: self.vertex,
            fragment: self.fragment,
            color_format: self.color_format,
            depth_format: self.depth_format,
        }
    }

    pub fn current(&self) -> Option<&F::Pipeline> {
        self.current.as_ref().map(|(_, pipeline)| pipeline)
    }

    pub fn active_key(&self) -> Option<PipelineKey> {
        self.current.as_ref().map(|(key, _)| *key)
    }

    pub fn shaders(&self) -> (VertexShader, FragmentShader) {
        (self.vertex, self.fragment)
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn failure_count(&self) -> usize {
        self.failures
    }

    pub fn last_error(&self) -> Option<&ViewerError> {
        self.last_error.as_ref()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::obj::{VertexAttribute, VertexSemantic};

    /// Factory that numbers every pipeline it builds and refuses entry points
    /// listed in `missing`, vertex strides in `rejected_strides` and color
    /// formats in `rejected_formats`.
    #[derive(Default)]
    pub(crate) struct MockFactory {
        pub builds: usize,
        pub missing: Vec<&'static str>,
        pub rejected_strides: Vec<u64>,
        pub rejected_formats: Vec<wgpu::TextureFormat>,
    }

    impl PipelineFactory for MockFactory {
        type Pipeline = (usize, PipelineKey);

        fn build(&mut self, desc: &PipelineDescriptor<'_>) -> Result<Self::Pipeline, ViewerError> {
            for entry in [desc.key.vertex.entry_point(), desc.key.fragment.entry_point()] {
                if self.missing.contains(&entry) {
                    return Err(ViewerError::not_found(format!("entry point {entry}"), Vec::new()));
                }
            }
            if self.rejected_strides.contains(&desc.layout.stride) {
                return Err(ViewerError::CompileFailure {
                    key: desc.key.to_string(),
                    reason: format!("stride {} rejected", desc.layout.stride),
                });
            }
            if self.rejected_formats.contains(&desc.key.color_format) {
                return Err(ViewerError::CompileFailure {
                    key: desc.key.to_string(),
                    reason: "color format rejected".into(),
                });
            }
            self.builds += 1;
            Ok((self.builds, desc.key))
        }
    }

    const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;
    const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn selector(missing: Vec<&'static str>) -> PipelineSelector<MockFactory> {
        PipelineSelector::new(
            MockFactory {
                missing,
                ..MockFactory::default()
            },
            COLOR,
            DEPTH,
        )
    }

    #[test]
    fn starts_with_default_pair() {
        let selector = selector(Vec::new());
        let key = selector.active_key().unwrap();
        assert_eq!(key.vertex, VertexShader::Main);
        assert_eq!(key.fragment, FragmentShader::Main);
        assert_eq!(selector.factory().builds, 1);
    }

    #[test]
    fn shader_selection_rebuilds() {
        let mut selector = selector(Vec::new());
        assert_eq!(selector.select_fragment_shader(2), RebuildOutcome::Rebuilt);
        assert_eq!(selector.select_vertex_shader(1), RebuildOutcome::Rebuilt);
        let key = selector.active_key().unwrap();
        assert_eq!(key.fragment, FragmentShader::ToonRim);
        assert_eq!(key.vertex, VertexShader::NoiseDeform);
        assert_eq!(selector.factory().builds, 3);
    }

    #[test]
    fn failed_rebuild_keeps_previous_pipeline() {
        let mut selector = selector(vec!["f_metal"]);
        let before = *selector.current().unwrap();
        assert_eq!(selector.select_fragment_shader(1), RebuildOutcome::Failed);
        assert_eq!(*selector.current().unwrap(), before);
        assert_eq!(selector.failure_count(), 1);
        assert!(selector.last_error().unwrap().is_not_found());
        assert_eq!(selector.shaders().1, FragmentShader::Main);
    }

    #[test]
    fn out_of_range_selection_with_missing_default_keeps_pipeline() {
        let mut selector = selector(vec!["f_main"]);
        assert!(selector.current().is_none());
        assert_eq!(selector.failure_count(), 1);
        assert_eq!(selector.select_fragment_shader(3), RebuildOutcome::Rebuilt);
        let before = *selector.current().unwrap();

        assert_eq!(selector.select_fragment_shader(99), RebuildOutcome::Failed);
        assert_eq!(*selector.current().unwrap(), before);
        assert_eq!(selector.failure_count(), 2);
        assert_eq!(selector.active_key().unwrap().fragment, FragmentShader::MatcapSolid);
    }

    #[test]
    fn format_change_rebuilds_once() {
        let mut selector = selector(Vec::new());
        assert_eq!(selector.set_output_formats(COLOR, DEPTH), RebuildOutcome::Unchanged);
        assert_eq!(
            selector.set_output_formats(wgpu::TextureFormat::Rgba8Unorm, DEPTH),
            RebuildOutcome::Rebuilt
        );
        assert_eq!(selector.active_key().unwrap().color_format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(selector.factory().builds, 2);
    }

    #[test]
    fn reset_returns_to_default_pair() {
        let mut selector = selector(Vec::new());
        selector.select_vertex_shader(3);
        selector.select_fragment_shader(1);
        selector.reset_to_default();
        assert_eq!(selector.shaders(), (VertexShader::Main, FragmentShader::Main));
    }

    #[test]
    fn same_layout_does_not_rebuild() {
        let mut selector = selector(Vec::new());
        assert_eq!(
            selector.on_vertex_layout(Some(&VertexLayout::default())),
            RebuildOutcome::Unchanged
        );
        assert_eq!(selector.on_vertex_layout(None), RebuildOutcome::Unchanged);
        assert_eq!(selector.factory().builds, 1);
    }

    #[test]
    fn different_layout_rebuilds() {
        let mut selector = selector(Vec::new());
        assert_eq!(selector.on_vertex_layout(Some(&positions_only())), RebuildOutcome::Rebuilt);
        assert_eq!(selector.layout().stride, 12);
        assert_eq!(selector.on_vertex_layout(None), RebuildOutcome::Rebuilt);
        assert_eq!(selector.layout(), &VertexLayout::default());
    }

    fn positions_only() -> VertexLayout {
        VertexLayout {
            stride: 12,
            attributes: vec![VertexAttribute {
                semantic: VertexSemantic::Position,
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            }],
        }
    }

    #[test]
    fn failed_layout_change_rolls_back_and_retries() {
        let mut selector = PipelineSelector::new(
            MockFactory {
                rejected_strides: vec![12],
                ..MockFactory::default()
            },
            COLOR,
            DEPTH,
        );
        let layout = positions_only();
        assert_eq!(selector.on_vertex_layout(Some(&layout)), RebuildOutcome::Failed);
        assert_eq!(selector.layout(), &VertexLayout::default());
        assert_eq!(selector.on_vertex_layout(Some(&layout)), RebuildOutcome::Failed);
        assert_eq!(selector.failure_count(), 2);

        selector.factory.rejected_strides.clear();
        assert_eq!(selector.on_vertex_layout(Some(&layout)), RebuildOutcome::Rebuilt);
        assert_eq!(selector.layout().stride, 12);
    }

    #[test]
    fn failed_format_change_rolls_back_and_retries() {
        let rejected = wgpu::TextureFormat::Rgba8Unorm;
        let mut selector = PipelineSelector::new(
            MockFactory {
                rejected_formats: vec![rejected],
                ..MockFactory::default()
            },
            COLOR,
            DEPTH,
        );
        assert_eq!(selector.set_output_formats(rejected, DEPTH), RebuildOutcome::Failed);
        assert_eq!(selector.active_key().unwrap().color_format, COLOR);
        assert_eq!(selector.set_output_formats(rejected, DEPTH), RebuildOutcome::Failed);
        assert_eq!(selector.set_output_formats(COLOR, DEPTH), RebuildOutcome::Unchanged);

        selector.factory.rejected_formats.clear();
        assert_eq!(selector.set_output_formats(rejected, DEPTH), RebuildOutcome::Rebuilt);
        assert_eq!(selector.active_key().unwrap().color_format, rejected);
    }

    #[test]
    fn depth_policies_differ_per_pass() {
        assert!(!DepthPolicy::SKYBOX.write);
        assert_eq!(DepthPolicy::SKYBOX.compare, wgpu::CompareFunction::LessEqual);
        assert!(DepthPolicy::MESH.write);
        assert_eq!(DepthPolicy::MESH.compare, wgpu::CompareFunction::Less);
    }
}
