use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use log::{error, info, warn};

use crate::assets::ResolveAssets;
use crate::catalog::ModelAsset;
use crate::error::ViewerError;
use crate::obj::{MeshData, VertexLayout};
use crate::texture::TextureImage;

/// Resolved resources for one catalog entry.
#[derive(Debug, Clone)]
pub struct CachedRenderResource {
    pub mesh: Arc<MeshData>,
    pub layout: VertexLayout,
    pub texture: Arc<TextureImage>,
}

/// What the draw layer should use for the selected model.
///
/// `mesh` and `layout` are empty after a failed load; the texture is then the
/// shared checkerboard and the pre-rotation is identity.
#[derive(Debug, Clone)]
pub struct ActiveResource {
    pub index: usize,
    pub mesh: Option<Arc<MeshData>>,
    pub layout: Option<VertexLayout>,
    pub texture: Arc<TextureImage>,
    pub pre_rotation: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// Empty catalog, or the index was already active.
    Unchanged,
    CacheHit,
    Loaded,
    Failed(ViewerError),
}

/// Memoizes resolved mesh/layout/texture triples per catalog index.
pub struct RenderResourceCache<R> {
    resolver: R,
    catalog: Vec<ModelAsset>,
    entries: HashMap<usize, CachedRenderResource>,
    active: Option<ActiveResource>,
    checkerboard: Arc<TextureImage>,
}

impl<R: ResolveAssets> RenderResourceCache<R> {
    pub fn new(resolver: R, catalog: Vec<ModelAsset>) -> Self {
        Self {
            resolver,
            catalog,
            entries: HashMap::new(),
            active: None,
            checkerboard: Arc::new(TextureImage::default_checkerboard()),
        }
    }

    /// Activates the model at `index`, clamped into the catalog range.
    pub fn select(&mut self, index: isize) -> SelectOutcome {
        if self.catalog.is_empty() {
            return SelectOutcome::Unchanged;
        }
        let last = self.catalog.len() - 1;
        let index = index.clamp(0, last as isize) as usize;
        if self.active_index() == Some(index) {
            return SelectOutcome::Unchanged;
        }

        let asset = &self.catalog[index];
        let pre_rotation = asset.pre_rotation();
        if let Some(cached) = self.entries.get(&index) {
            info!("model {} (cached)", asset.name);
            self.active = Some(ActiveResource {
                index,
                mesh: Some(cached.mesh.clone()),
                layout: Some(cached.layout.clone()),
                texture: cached.texture.clone(),
                pre_rotation,
            });
            return SelectOutcome::CacheHit;
        }

        let asset = asset.clone();
        match self.resolver.load_mesh(&asset.name, asset.subdir.as_deref()) {
            Ok(loaded) => {
                let base_name = asset.texture_base_name.as_deref().unwrap_or(&asset.name);
                let texture = match self.resolver.load_texture(base_name, asset.subdir.as_deref()) {
                    Some(texture) if !texture.is_empty() => Arc::new(texture),
                    _ => {
                        warn!("no texture for {}, using checkerboard", asset.name);
                        self.checkerboard.clone()
                    }
                };
                let entry = CachedRenderResource {
                    mesh: Arc::new(loaded.mesh),
                    layout: loaded.layout,
                    texture,
                };
                self.active = Some(ActiveResource {
                    index,
                    mesh: Some(entry.mesh.clone()),
                    layout: Some(entry.layout.clone()),
                    texture: entry.texture.clone(),
                    pre_rotation,
                });
                self.entries.insert(index, entry);
                info!("model {} loaded", asset.name);
                SelectOutcome::Loaded
            }
            Err(err) => {
                error!("failed to load model {}: {err}", asset.name);
                self.active = Some(ActiveResource {
                    index,
                    mesh: None,
                    layout: None,
                    texture: self.checkerboard.clone(),
                    pre_rotation: Mat4::IDENTITY,
                });
                SelectOutcome::Failed(err)
            }
        }
    }

    pub fn next_model(&mut self) -> SelectOutcome {
        let next = self.active_index().map_or(0, |index| index as isize + 1);
        self.select(next)
    }

    pub fn previous_model(&mut self) -> SelectOutcome {
        let previous = self.active_index().map_or(0, |index| index as isize - 1);
        self.select(previous)
    }

    pub fn active(&self) -> Option<&ActiveResource> {
        self.active.as_ref()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.index)
    }

    pub fn active_asset(&self) -> Option<&ModelAsset> {
        self.active_index().and_then(|index| self.catalog.get(index))
    }

    /// Pre-rotation of the active model, identity when nothing is active.
    pub fn model_matrix(&self) -> Mat4 {
        self.active
            .as_ref()
            .map_or(Mat4::IDENTITY, |active| active.pre_rotation)
    }

    pub fn catalog(&self) -> &[ModelAsset] {
        &self.catalog
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn checkerboard(&self) -> &Arc<TextureImage> {
        &self.checkerboard
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assets::LoadedMesh;
    use glam::Vec3;
    use std::path::PathBuf;

    /// Resolver that hands out a one-triangle mesh and counts calls.
    #[derive(Default)]
    pub(crate) struct MockResolver {
        pub mesh_calls: usize,
        pub texture_calls: usize,
        pub missing_meshes: Vec<String>,
        pub textures: bool,
    }

    pub(crate) fn triangle() -> MeshData {
        MeshData {
            vertices: vec![
                0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0,
            ],
            indices: vec![0, 1, 2],
        }
    }

    impl ResolveAssets for MockResolver {
        fn load_mesh(
            &mut self,
            name: &str,
            _subdir: Option<&str>,
        ) -> Result<LoadedMesh, ViewerError> {
            self.mesh_calls += 1;
            if self.missing_meshes.iter().any(|missing| missing == name) {
                return Err(ViewerError::not_found(format!("mesh {name}"), Vec::new()));
            }
            Ok(LoadedMesh {
                mesh: triangle(),
                layout: VertexLayout::default(),
                path: PathBuf::from(format!("{name}.obj")),
            })
        }

        fn load_texture(
            &mut self,
            _base_name: &str,
            _preferred_subdir: Option<&str>,
        ) -> Option<TextureImage> {
            self.texture_calls += 1;
            self.textures
                .then(|| TextureImage::from_rgba(1, 1, vec![255, 0, 0, 255]))
                .flatten()
        }
    }

    pub(crate) fn catalog() -> Vec<ModelAsset> {
        vec![
            ModelAsset::new("a").with_rotation(Vec3::new(0.0, 180.0, 0.0)),
            ModelAsset::new("b"),
            ModelAsset::new("c"),
        ]
    }

    #[test]
    fn selecting_same_index_twice_resolves_once() {
        let mut cache = RenderResourceCache::new(MockResolver::default(), catalog());
        assert_eq!(cache.select(1), SelectOutcome::Loaded);
        assert_eq!(cache.select(1), SelectOutcome::Unchanged);
        assert_eq!(cache.resolver().mesh_calls, 1);
    }

    #[test]
    fn returning_to_a_model_hits_the_cache() {
        let mut cache = RenderResourceCache::new(MockResolver::default(), catalog());
        cache.select(0);
        cache.select(1);
        assert_eq!(cache.select(0), SelectOutcome::CacheHit);
        assert_eq!(cache.resolver().mesh_calls, 2);
        assert_eq!(cache.resolver().texture_calls, 2);
    }

    #[test]
    fn out_of_range_indices_are_clamped() {
        let mut cache = RenderResourceCache::new(MockResolver::default(), catalog());
        cache.select(42);
        assert_eq!(cache.active_index(), Some(2));
        cache.select(-7);
        assert_eq!(cache.active_index(), Some(0));
    }

    #[test]
    fn missing_texture_falls_back_to_checkerboard() {
        let mut cache = RenderResourceCache::new(MockResolver::default(), catalog());
        cache.select(0);
        let active = cache.active().unwrap();
        assert!(active.mesh.is_some());
        assert!(!active.texture.is_empty());
        assert!(Arc::ptr_eq(&active.texture, cache.checkerboard()));
    }

    #[test]
    fn found_texture_is_used() {
        let resolver = MockResolver {
            textures: true,
            ..MockResolver::default()
        };
        let mut cache = RenderResourceCache::new(resolver, catalog());
        cache.select(0);
        assert_eq!(cache.active().unwrap().texture.width, 1);
    }

    #[test]
    fn failed_load_keeps_viewer_interactive() {
        let resolver = MockResolver {
            missing_meshes: vec!["b".to_string()],
            ..MockResolver::default()
        };
        let mut cache = RenderResourceCache::new(resolver, catalog());
        cache.select(0);
        assert!(matches!(cache.select(1), SelectOutcome::Failed(_)));
        let active = cache.active().unwrap();
        assert!(active.mesh.is_none());
        assert!(active.layout.is_none());
        assert_eq!(active.pre_rotation, Mat4::IDENTITY);
        assert!(!active.texture.is_empty());
        assert!(!cache.is_cached(1));
    }

    #[test]
    fn failed_load_is_retried_after_switching_away() {
        let resolver = MockResolver {
            missing_meshes: vec!["a".to_string()],
            ..MockResolver::default()
        };
        let mut cache = RenderResourceCache::new(resolver, catalog());
        cache.select(0);
        cache.select(1);
        cache.select(0);
        assert_eq!(cache.resolver().mesh_calls, 3);
    }

    #[test]
    fn pre_rotation_comes_from_catalog() {
        let mut cache = RenderResourceCache::new(MockResolver::default(), catalog());
        cache.select(0);
        let forward = cache.model_matrix().transform_vector3(Vec3::Z);
        assert!((forward - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn next_and_previous_clamp_at_the_ends() {
        let mut cache = RenderResourceCache::new(MockResolver::default(), catalog());
        cache.next_model();
        assert_eq!(cache.active_index(), Some(0));
        cache.next_model();
        cache.next_model();
        assert_eq!(cache.next_model(), SelectOutcome::Unchanged);
        assert_eq!(cache.active_index(), Some(2));
        cache.previous_model();
        assert_eq!(cache.active_index(), Some(1));
    }

    #[test]
    fn empty_catalog_is_a_no_op() {
        let mut cache = RenderResourceCache::new(MockResolver::default(), Vec::new());
        assert_eq!(cache.select(0), SelectOutcome::Unchanged);
        assert!(cache.active().is_none());
        assert_eq!(cache.model_matrix(), Mat4::IDENTITY);
    }
}
