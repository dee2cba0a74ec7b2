use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::assets::{dedup_candidates, join_candidate, sorted_files};
use crate::error::ViewerError;
use crate::texture::TextureImage;

/// Face name suffixes in cube layer order: +x, -x, +y, -y, +z, -z.
pub const FACE_SUFFIXES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

pub const SKYBOX_VERTEX_COUNT: u32 = 36;

/// Unit cube drawn from the inside, two triangles per face.
#[rustfmt::skip]
pub const SKYBOX_VERTICES: [[f32; 3]; 36] = [
    [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0], [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [-1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0],
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyboxSettings {
    pub enabled: bool,
    pub prefix: String,
    pub extensions: Vec<String>,
    /// Searched in order; an empty entry stands for the asset root.
    pub subdirs: Vec<String>,
    pub flip_vertical: bool,
}

impl Default for SkyboxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "sky_".into(),
            extensions: vec!["jpg".into(), "png".into(), "jpeg".into()],
            subdirs: vec!["Sky".into(), "Resources/Sky".into(), String::new()],
            flip_vertical: false,
        }
    }
}

/// Six validated, equally sized square faces ready for cube upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyboxFaceSet {
    faces: [TextureImage; 6],
    sources: Vec<PathBuf>,
}

impl SkyboxFaceSet {
    /// Validates faces given in `FACE_SUFFIXES` order.
    pub fn from_faces(faces: [TextureImage; 6]) -> Result<Self, ViewerError> {
        let (width, height) = (faces[0].width, faces[0].height);
        if !faces[0].is_square() {
            return Err(ViewerError::SizeMismatch {
                face: 0,
                actual: (width, height),
                expected: (width, width),
            });
        }
        if let Some((face, image)) = faces
            .iter()
            .enumerate()
            .find(|(_, image)| image.width != width || image.height != height)
        {
            return Err(ViewerError::SizeMismatch {
                face,
                actual: (image.width, image.height),
                expected: (width, height),
            });
        }
        Ok(Self {
            faces,
            sources: Vec::new(),
        })
    }

    pub fn faces(&self) -> &[TextureImage; 6] {
        &self.faces
    }

    pub fn width(&self) -> u32 {
        self.faces[0].width
    }

    pub fn height(&self) -> u32 {
        self.faces[0].height
    }

    /// Files the faces were decoded from, empty for in-memory faces.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

/// Locates, decodes and validates six cube faces below an asset root.
#[derive(Debug, Clone)]
pub struct SkyboxBuilder {
    root: PathBuf,
    flip_vertical: bool,
}

impl SkyboxBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            flip_vertical: false,
        }
    }

    pub fn with_flip_vertical(mut self, flip: bool) -> Self {
        self.flip_vertical = flip;
        self
    }

    pub fn build_from_settings(&self, settings: &SkyboxSettings) -> Result<SkyboxFaceSet, ViewerError> {
        self.build(&settings.prefix, &settings.extensions, &settings.subdirs)
    }

    pub fn build(
        &self,
        prefix: &str,
        extensions: &[String],
        subdirs: &[String],
    ) -> Result<SkyboxFaceSet, ViewerError> {
        let paths = self.locate(prefix, extensions, subdirs)?;
        let mut faces = Vec::with_capacity(6);
        for path in &paths {
            faces.push(TextureImage::decode_file(path, self.flip_vertical)?);
        }
        let faces: [TextureImage; 6] = faces
            .try_into()
            .map_err(|_| ViewerError::not_found("skybox faces", paths.to_vec()))?;
        let mut set = SkyboxFaceSet::from_faces(faces)?;
        set.sources = paths.to_vec();
        info!(
            "skybox {}x{} from {}",
            set.width(),
            set.height(),
            paths[0].parent().unwrap_or(self.root.as_path()).display()
        );
        Ok(set)
    }

    /// Finds the six face files without decoding them.
    pub fn locate(
        &self,
        prefix: &str,
        extensions: &[String],
        subdirs: &[String],
    ) -> Result<[PathBuf; 6], ViewerError> {
        let mut searched = Vec::new();
        for dir in dedup_candidates(subdirs.iter().cloned().map(Some)) {
            for ext in extensions {
                if let Some(paths) = self.find_in_dir(dir.as_deref(), prefix, ext, &mut searched) {
                    return Ok(paths);
                }
            }
        }

        let files = sorted_files(&self.root);
        for ext in extensions {
            if let Some(paths) = scan_for_faces(&files, prefix, ext) {
                debug!("skybox faces found by tree scan: {paths:?}");
                return Ok(paths);
            }
        }

        let expected: Vec<String> = extensions
            .iter()
            .flat_map(|ext| face_names(prefix, ext))
            .collect();
        warn!("no complete skybox under {}", self.root.display());
        Err(ViewerError::not_found(
            format!("skybox faces (expected {})", expected.join(", ")),
            searched,
        ))
    }

    fn find_in_dir(
        &self,
        dir: Option<&str>,
        prefix: &str,
        ext: &str,
        searched: &mut Vec<PathBuf>,
    ) -> Option<[PathBuf; 6]> {
        let mut paths = Vec::with_capacity(6);
        for name in face_names(prefix, ext) {
            let path = join_candidate(&self.root, dir, &name);
            searched.push(path.clone());
            if !path.is_file() {
                return None;
            }
            paths.push(path);
        }
        paths.try_into().ok()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn face_names(prefix: &str, ext: &str) -> Vec<String> {
    FACE_SUFFIXES
        .iter()
        .map(|suffix| format!("{prefix}{suffix}.{ext}"))
        .collect()
}

/// Fills the six slots from a sorted file list. Prefixed names win over bare
/// suffix names; otherwise the first file in walk order wins.
fn scan_for_faces(files: &[PathBuf], prefix: &str, ext: &str) -> Option<[PathBuf; 6]> {
    let prefixed: Vec<String> = face_names(prefix, ext)
        .into_iter()
        .map(|name| name.to_lowercase())
        .collect();
    let bare: Vec<String> = face_names("", ext)
        .into_iter()
        .map(|name| name.to_lowercase())
        .collect();

    let mut slots: [Option<(PathBuf, bool)>; 6] = Default::default();
    for path in files {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let name = name.to_lowercase();
        if let Some(slot) = prefixed.iter().position(|want| *want == name) {
            if !matches!(slots[slot], Some((_, true))) {
                slots[slot] = Some((path.clone(), true));
            }
        } else if let Some(slot) = bare.iter().position(|want| *want == name) {
            if slots[slot].is_none() {
                slots[slot] = Some((path.clone(), false));
            }
        }
    }

    let paths: Vec<PathBuf> = slots
        .into_iter()
        .map(|slot| slot.map(|(path, _)| path))
        .collect::<Option<_>>()?;
    paths.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_face(root: &Path, relative: &str, width: u32, height: u32) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
            .save(path)
            .unwrap();
    }

    fn write_set(root: &Path, dir: &str, prefix: &str, ext: &str, size: u32) {
        for suffix in FACE_SUFFIXES {
            write_face(root, &format!("{dir}/{prefix}{suffix}.{ext}"), size, size);
        }
    }

    fn settings() -> SkyboxSettings {
        SkyboxSettings {
            extensions: vec!["png".into()],
            ..SkyboxSettings::default()
        }
    }

    fn solid(width: u32, height: u32) -> TextureImage {
        TextureImage::from_rgba(width, height, vec![0; (width * height * 4) as usize]).unwrap()
    }

    #[test]
    fn identical_faces_build_a_cube() {
        let set = SkyboxFaceSet::from_faces(std::array::from_fn(|_| solid(64, 64))).unwrap();
        assert_eq!((set.width(), set.height()), (64, 64));
    }

    #[test]
    fn mismatched_face_is_named() {
        let faces = std::array::from_fn(|i| if i == 3 { solid(32, 32) } else { solid(64, 64) });
        let err = SkyboxFaceSet::from_faces(faces).unwrap_err();
        assert_eq!(
            err,
            ViewerError::SizeMismatch {
                face: 3,
                actual: (32, 32),
                expected: (64, 64)
            }
        );
    }

    #[test]
    fn non_square_first_face_is_rejected() {
        let err = SkyboxFaceSet::from_faces(std::array::from_fn(|_| solid(64, 32))).unwrap_err();
        assert!(matches!(err, ViewerError::SizeMismatch { face: 0, .. }));
    }

    #[test]
    fn builds_from_first_complete_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), "Resources/Sky", "sky_", "png", 8);
        write_set(dir.path(), "Sky", "sky_", "png", 4);
        let set = SkyboxBuilder::new(dir.path())
            .build_from_settings(&settings())
            .unwrap();
        assert_eq!(set.width(), 4);
        assert_eq!(set.sources()[0], dir.path().join("Sky/sky_px.png"));
        assert_eq!(set.sources()[5], dir.path().join("Sky/sky_nz.png"));
    }

    #[test]
    fn incomplete_subdirectory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_face(dir.path(), "Sky/sky_px.png", 4, 4);
        write_set(dir.path(), "Resources/Sky", "sky_", "png", 8);
        let set = SkyboxBuilder::new(dir.path())
            .build_from_settings(&settings())
            .unwrap();
        assert_eq!(set.width(), 8);
    }

    #[test]
    fn tree_scan_matches_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for suffix in FACE_SUFFIXES {
            let name = format!("SKY_{}.PNG", suffix.to_uppercase());
            write_face(dir.path(), &format!("textures/env/{name}"), 4, 4);
        }
        let paths = SkyboxBuilder::new(dir.path())
            .locate("sky_", &["png".to_string()], &["Sky".to_string()])
            .unwrap();
        assert_eq!(paths[2], dir.path().join("textures/env/SKY_PY.PNG"));
    }

    #[test]
    fn tree_scan_prefers_prefixed_names() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), "a", "", "png", 4);
        write_set(dir.path(), "b", "sky_", "png", 4);
        fs::remove_file(dir.path().join("b/sky_py.png")).unwrap();
        let paths = SkyboxBuilder::new(dir.path())
            .locate("sky_", &["png".to_string()], &[])
            .unwrap();
        assert_eq!(paths[0], dir.path().join("b/sky_px.png"));
        assert_eq!(paths[2], dir.path().join("a/py.png"));
    }

    #[test]
    fn tree_scan_with_five_faces_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        for suffix in &FACE_SUFFIXES[..5] {
            write_face(dir.path(), &format!("textures/env/sky_{suffix}.png"), 4, 4);
        }
        let err = SkyboxBuilder::new(dir.path())
            .locate("sky_", &["png".to_string()], &["Sky".to_string()])
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("sky_nz.png"));
    }

    #[test]
    fn missing_faces_list_expected_names() {
        let dir = tempfile::tempdir().unwrap();
        write_face(dir.path(), "Sky/sky_px.png", 4, 4);
        let err = SkyboxBuilder::new(dir.path())
            .build_from_settings(&settings())
            .unwrap_err();
        assert!(err.is_not_found());
        let message = err.to_string();
        assert!(message.contains("sky_px.png"));
        assert!(message.contains("sky_nz.png"));
    }

    #[test]
    fn mismatched_files_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), "Sky", "sky_", "png", 64);
        write_face(dir.path(), "Sky/sky_py.png", 32, 32);
        let err = SkyboxBuilder::new(dir.path())
            .build_from_settings(&settings())
            .unwrap_err();
        assert_eq!(
            err,
            ViewerError::SizeMismatch {
                face: 2,
                actual: (32, 32),
                expected: (64, 64)
            }
        );
    }

    #[test]
    fn cube_geometry_has_twelve_triangles() {
        assert_eq!(SKYBOX_VERTICES.len() as u32, SKYBOX_VERTEX_COUNT);
        assert!(SKYBOX_VERTICES
            .iter()
            .flatten()
            .all(|c| c.abs() == 1.0));
    }
}
