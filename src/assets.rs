use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::ViewerError;
use crate::obj::{load_obj_from_str, MeshData, ObjLoadOptions, VertexLayout};
use crate::texture::TextureImage;

pub const MESH_EXTENSION: &str = "obj";

/// Where and how the resolver looks for model files and textures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub root: PathBuf,
    /// Tried after the model's own directory and before the asset root.
    pub texture_fallback_dirs: Vec<String>,
    pub texture_extensions: Vec<String>,
    pub flip_v: bool,
    pub flip_textures: bool,
    pub crease_angle: f32,
    pub target_extent: f32,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            texture_fallback_dirs: vec!["Resources/Models".into(), "Models".into()],
            texture_extensions: ["bmp", "png", "jpg", "jpeg", "tga"]
                .into_iter()
                .map(String::from)
                .collect(),
            flip_v: false,
            flip_textures: false,
            crease_angle: crate::obj::DEFAULT_CREASE_ANGLE,
            target_extent: crate::obj::DEFAULT_TARGET_EXTENT,
        }
    }
}

/// Mesh ready for upload plus the vertex layout its data follows.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMesh {
    pub mesh: MeshData,
    pub layout: VertexLayout,
    pub path: PathBuf,
}

/// Every path a lookup tried and the one it settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupReport {
    pub request: String,
    pub searched: Vec<PathBuf>,
    pub chosen: Option<PathBuf>,
}

/// Source of meshes and textures for the render resource cache.
pub trait ResolveAssets {
    fn load_mesh(&mut self, name: &str, subdir: Option<&str>) -> Result<LoadedMesh, ViewerError>;

    /// Returns `None` when no candidate could be found or decoded.
    fn load_texture(&mut self, base_name: &str, preferred_subdir: Option<&str>)
        -> Option<TextureImage>;
}

/// Filesystem-backed resolver rooted at an asset directory.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    settings: AssetSettings,
    last_lookup: Option<LookupReport>,
}

impl AssetResolver {
    pub fn new(settings: AssetSettings) -> Self {
        Self {
            settings,
            last_lookup: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.settings.root
    }

    pub fn settings(&self) -> &AssetSettings {
        &self.settings
    }

    /// Report of the most recent mesh or texture lookup.
    pub fn last_lookup(&self) -> Option<&LookupReport> {
        self.last_lookup.as_ref()
    }

    /// Ordered texture directories: preferred, fallbacks, then the root.
    pub fn texture_directories(&self, preferred: Option<&str>) -> Vec<Option<String>> {
        let candidates = std::iter::once(preferred.map(str::to_string))
            .chain(self.settings.texture_fallback_dirs.iter().cloned().map(Some))
            .chain(std::iter::once(None));
        dedup_candidates(candidates)
    }

    fn record(&mut self, report: LookupReport) {
        debug!(
            "searched {} path(s) for {}: {:?} -> {:?}",
            report.searched.len(),
            report.request,
            report.searched,
            report.chosen
        );
        self.last_lookup = Some(report);
    }

    fn find_mesh(&self, name: &str, subdir: Option<&str>) -> (Vec<PathBuf>, Option<PathBuf>) {
        let file_name = format!("{name}.{MESH_EXTENSION}");
        let mut searched = Vec::new();
        let directories = dedup_candidates([subdir.map(str::to_string), None]);
        for dir in &directories {
            let path = join_candidate(&self.settings.root, dir.as_deref(), &file_name);
            let found = path.is_file();
            searched.push(path.clone());
            if found {
                return (searched, Some(path));
            }
        }
        let found = scan_tree(&self.settings.root, |candidate| {
            candidate.eq_ignore_ascii_case(&file_name)
        });
        (searched, found)
    }
}

impl ResolveAssets for AssetResolver {
    fn load_mesh(&mut self, name: &str, subdir: Option<&str>) -> Result<LoadedMesh, ViewerError> {
        let (searched, chosen) = self.find_mesh(name, subdir);
        self.record(LookupReport {
            request: format!("mesh {name}"),
            searched: searched.clone(),
            chosen: chosen.clone(),
        });
        let Some(path) = chosen else {
            return Err(ViewerError::not_found(format!("mesh {name}"), searched));
        };

        let contents = fs::read_to_string(&path).map_err(|err| ViewerError::decode(&path, err))?;
        let options = ObjLoadOptions {
            crease_angle: self.settings.crease_angle,
            target_extent: Some(self.settings.target_extent),
            flip_v: self.settings.flip_v,
        };
        let mesh = load_obj_from_str(&contents, &options)
            .map_err(|err| ViewerError::decode(&path, format!("{err:#}")))?;
        info!(
            "loaded mesh {name} from {} ({} vertices, {} triangles)",
            path.display(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(LoadedMesh {
            mesh,
            layout: VertexLayout::position_normal_texcoord(),
            path,
        })
    }

    fn load_texture(
        &mut self,
        base_name: &str,
        preferred_subdir: Option<&str>,
    ) -> Option<TextureImage> {
        let mut searched = Vec::new();
        let mut chosen = None;
        'dirs: for dir in self.texture_directories(preferred_subdir) {
            for ext in &self.settings.texture_extensions {
                let path =
                    join_candidate(&self.settings.root, dir.as_deref(), &format!("{base_name}.{ext}"));
                searched.push(path.clone());
                if !path.is_file() {
                    continue;
                }
                match TextureImage::decode_file(&path, self.settings.flip_textures) {
                    Ok(texture) => {
                        info!(
                            "texture {base_name}: {} ({}x{})",
                            path.display(),
                            texture.width,
                            texture.height
                        );
                        chosen = Some((path, texture));
                        break 'dirs;
                    }
                    Err(err) => warn!("skipping texture candidate: {err}"),
                }
            }
        }
        self.record(LookupReport {
            request: format!("texture {base_name}"),
            searched,
            chosen: chosen.as_ref().map(|(path, _)| path.clone()),
        });
        if chosen.is_none() {
            warn!("no texture found for {base_name}");
        }
        chosen.map(|(_, texture)| texture)
    }
}

/// Removes duplicate directory candidates, keeping the first occurrence.
///
/// Empty strings, `.` and surrounding slashes are normalized so that `"Models/"`
/// and `"Models"` count as the same directory and `""` means the root.
pub fn dedup_candidates<I>(candidates: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|candidate| candidate.and_then(|dir| normalize_dir(&dir)))
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

fn normalize_dir(dir: &str) -> Option<String> {
    let trimmed = dir.trim().trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn join_candidate(root: &Path, dir: Option<&str>, file_name: &str) -> PathBuf {
    match dir {
        Some(dir) => root.join(dir).join(file_name),
        None => root.join(file_name),
    }
}

/// Walks the asset tree in file-name order and returns the first file whose
/// name satisfies `matches`.
pub(crate) fn scan_tree(root: &Path, mut matches: impl FnMut(&str) -> bool) -> Option<PathBuf> {
    sorted_files(root).into_iter().find(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(&mut matches)
    })
}

/// Every file below `root`, depth-first in file-name order.
pub(crate) fn sorted_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 2 0 0\nv 0 1 0\nvt 0 0\nf 1/1 2/1 3/1\n";

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn write_png(root: &Path, relative: &str, width: u32, height: u32) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::from_pixel(width, height, image::Rgba([9, 8, 7, 255]))
            .save(path)
            .unwrap();
    }

    fn resolver(root: &Path) -> AssetResolver {
        AssetResolver::new(AssetSettings {
            root: root.to_path_buf(),
            ..AssetSettings::default()
        })
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let deduped = dedup_candidates([
            Some("Resources/Models".to_string()),
            Some("Models/".to_string()),
            Some("Resources/Models/".to_string()),
            None,
            Some("Models".to_string()),
            Some(String::new()),
        ]);
        assert_eq!(
            deduped,
            vec![
                Some("Resources/Models".to_string()),
                Some("Models".to_string()),
                None
            ]
        );
    }

    #[test]
    fn texture_directories_put_preferred_first_and_root_last() {
        let resolver = resolver(Path::new("unused"));
        assert_eq!(
            resolver.texture_directories(Some("Models")),
            vec![
                Some("Models".to_string()),
                Some("Resources/Models".to_string()),
                None
            ]
        );
    }

    #[test]
    fn mesh_is_found_in_subdirectory_first() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Models/tri.obj", TRIANGLE.as_bytes());
        write(dir.path(), "tri.obj", b"garbage that would not parse");
        let mut resolver = resolver(dir.path());
        let loaded = resolver.load_mesh("tri", Some("Models")).unwrap();
        assert_eq!(loaded.path, dir.path().join("Models/tri.obj"));
        assert_eq!(loaded.layout, VertexLayout::default());
        let report = resolver.last_lookup().unwrap();
        assert_eq!(report.searched.len(), 1);
    }

    #[test]
    fn mesh_falls_back_to_tree_scan_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "deep/nested/Tri.OBJ", TRIANGLE.as_bytes());
        let mut resolver = resolver(dir.path());
        let loaded = resolver.load_mesh("tri", Some("Models")).unwrap();
        assert_eq!(loaded.path, dir.path().join("deep/nested/Tri.OBJ"));
        let (min, max) = loaded.mesh.bounds().unwrap();
        assert!(((max - min).max_element() - 1.5).abs() < 1e-5);
    }

    #[test]
    fn missing_mesh_is_not_found_with_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver(dir.path());
        let err = resolver.load_mesh("ghost", Some("Models")).unwrap_err();
        match err {
            ViewerError::NotFound { searched, .. } => assert_eq!(
                searched,
                vec![
                    dir.path().join("Models/ghost.obj"),
                    dir.path().join("ghost.obj")
                ]
            ),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unparsable_mesh_is_a_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.obj", b"v 0 0\n");
        let mut resolver = resolver(dir.path());
        let err = resolver.load_mesh("bad", None).unwrap_err();
        assert!(matches!(err, ViewerError::DecodeFailure { .. }));
    }

    #[test]
    fn texture_prefers_directory_order_then_extension_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "skin.png", 2, 2);
        write_png(dir.path(), "Models/skin.png", 4, 4);
        let mut resolver = resolver(dir.path());
        let texture = resolver.load_texture("skin", Some("Models")).unwrap();
        assert_eq!(texture.width, 4);
        let report = resolver.last_lookup().unwrap();
        // bmp then png in the preferred directory.
        assert_eq!(report.searched.len(), 2);
        assert_eq!(report.chosen, Some(dir.path().join("Models/skin.png")));
    }

    #[test]
    fn texture_skips_undecodable_candidate() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Models/skin.bmp", b"not a bitmap");
        write_png(dir.path(), "Models/skin.png", 3, 3);
        let mut resolver = resolver(dir.path());
        let texture = resolver.load_texture("skin", Some("Models")).unwrap();
        assert_eq!(texture.width, 3);
    }

    #[test]
    fn missing_texture_tries_every_candidate_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver(dir.path());
        assert!(resolver.load_texture("skin", Some("Models")).is_none());
        let report = resolver.last_lookup().unwrap();
        // Models, Resources/Models, root; five extensions each.
        assert_eq!(report.searched.len(), 15);
        let unique: HashSet<_> = report.searched.iter().collect();
        assert_eq!(unique.len(), report.searched.len());
        assert!(report.chosen.is_none());
    }
}
