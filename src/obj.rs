use std::collections::HashMap;
use std::mem::size_of;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};

/// Crease angle, in radians, used when smoothing synthesized normals.
pub const DEFAULT_CREASE_ANGLE: f32 = 0.5;
/// Longest bounding-box side after [`normalize_extent`].
pub const DEFAULT_TARGET_EXTENT: f32 = 1.5;
/// Interleaved floats per vertex: position, normal, texcoord.
pub const FLOATS_PER_VERTEX: usize = 8;

const VEC3_STRIDE: u64 = size_of::<[f32; 3]>() as u64;
const VEC2_STRIDE: u64 = size_of::<[f32; 2]>() as u64;

/// Meaning of an interleaved vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    TexCoord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    pub format: wgpu::VertexFormat,
    pub offset: u64,
    pub shader_location: u32,
}

/// Description of one interleaved vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Position at offset 0, normal after one vec3, texcoord after two.
    pub fn position_normal_texcoord() -> Self {
        Self {
            stride: VEC3_STRIDE * 2 + VEC2_STRIDE,
            attributes: vec![
                VertexAttribute {
                    semantic: VertexSemantic::Position,
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                VertexAttribute {
                    semantic: VertexSemantic::Normal,
                    format: wgpu::VertexFormat::Float32x3,
                    offset: VEC3_STRIDE,
                    shader_location: 1,
                },
                VertexAttribute {
                    semantic: VertexSemantic::TexCoord,
                    format: wgpu::VertexFormat::Float32x2,
                    offset: VEC3_STRIDE * 2,
                    shader_location: 2,
                },
            ],
        }
    }

    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: attribute.format,
                offset: attribute.offset,
                shader_location: attribute.shader_location,
            })
            .collect()
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::position_normal_texcoord()
    }
}

/// CPU-side mesh with interleaved `position.xyz normal.xyz uv` vertices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let base = index * FLOATS_PER_VERTEX;
        Vec3::from_slice(&self.vertices[base..base + 3])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        let base = index * FLOATS_PER_VERTEX + 3;
        Vec3::from_slice(&self.vertices[base..base + 3])
    }

    pub fn texcoord(&self, index: usize) -> Vec2 {
        let base = index * FLOATS_PER_VERTEX + 6;
        Vec2::from_slice(&self.vertices[base..base + 2])
    }

    /// Axis-aligned bounds of the vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        (0..self.vertex_count()).map(|i| self.position(i)).fold(None, |acc, p| {
            Some(match acc {
                Some((min, max)) => (min.min(p), max.max(p)),
                None => (p, p),
            })
        })
    }
}

/// Post-processing applied by [`load_obj_from_str`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjLoadOptions {
    pub crease_angle: f32,
    /// Re-center and rescale so the longest side has this length.
    pub target_extent: Option<f32>,
    pub flip_v: bool,
}

impl Default for ObjLoadOptions {
    fn default() -> Self {
        Self {
            crease_angle: DEFAULT_CREASE_ANGLE,
            target_extent: Some(DEFAULT_TARGET_EXTENT),
            flip_v: false,
        }
    }
}

/// Parses an OBJ file from memory into an interleaved, indexed mesh.
///
/// Corners without a normal get one synthesized from the adjacent faces whose
/// normals lie within the crease angle of their own face.
pub fn load_obj_from_str(data: &str, options: &ObjLoadOptions) -> Result<MeshData> {
    let mut positions = Vec::new();
    let mut texcoords = Vec::new();
    let mut normals = Vec::new();
    let mut faces: Vec<[FaceIndex; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "vt" => texcoords.push(
                parse_vec2(parts)
                    .with_context(|| format!("invalid texcoord on line {}", line_no + 1))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            "f" => {
                let polygon = parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                triangulate_face(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }
    if faces.is_empty() {
        return Err(anyhow!("OBJ file does not define any faces"));
    }

    let corners = resolve_corners(&faces, &positions, &texcoords, &normals)?;
    let mut mesh = build_mesh(&corners, &positions, options.crease_angle);
    if let Some(extent) = options.target_extent {
        normalize_extent(&mut mesh, extent);
    }
    if options.flip_v {
        flip_texcoords_v(&mut mesh);
    }
    Ok(mesh)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

fn parse_vec2<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec2> {
    let u = parts
        .next()
        .ok_or_else(|| anyhow!("missing texcoord component"))?
        .parse::<f32>()?;
    let v = match parts.next() {
        Some(v) => v.parse::<f32>()?,
        None => 0.0,
    };
    Ok(Vec2::new(u, v))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>> {
    let mut indices = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        let vt = parse_optional_index(segments.next());
        let vn = parse_optional_index(segments.next());
        indices.push(FaceIndex { v, vt, vn });
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn parse_optional_index(segment: Option<&str>) -> i32 {
    segment
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0)
}

fn triangulate_face(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    for i in 1..(polygon.len() - 1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    v: i32,
    vt: i32,
    vn: i32,
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    position: usize,
    texcoord: Option<Vec2>,
    normal: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    position: usize,
    texcoord: [u32; 2],
    normal: [u32; 3],
}

fn resolve_corners(
    faces: &[[FaceIndex; 3]],
    positions: &[Vec3],
    texcoords: &[Vec2],
    normals: &[Vec3],
) -> Result<Vec<[Corner; 3]>> {
    faces
        .iter()
        .map(|face| {
            let mut corners = [Corner {
                position: 0,
                texcoord: None,
                normal: None,
            }; 3];
            for (corner, idx) in corners.iter_mut().zip(face) {
                corner.position = fix_index(idx.v, positions.len())
                    .ok_or_else(|| anyhow!("invalid vertex index {}", idx.v))?;
                corner.texcoord = fix_index(idx.vt, texcoords.len()).map(|i| texcoords[i]);
                corner.normal = fix_index(idx.vn, normals.len())
                    .map(|i| normals[i].normalize_or_zero())
                    .filter(|n| *n != Vec3::ZERO);
            }
            Ok(corners)
        })
        .collect()
}

fn build_mesh(corners: &[[Corner; 3]], positions: &[Vec3], crease_angle: f32) -> MeshData {
    let face_normals: Vec<Vec3> = corners
        .iter()
        .map(|tri| {
            let p0 = positions[tri[0].position];
            let p1 = positions[tri[1].position];
            let p2 = positions[tri[2].position];
            (p1 - p0).cross(p2 - p0).normalize_or_zero()
        })
        .collect();

    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for (face, tri) in corners.iter().enumerate() {
        for corner in tri {
            adjacency.entry(corner.position).or_default().push(face);
        }
    }

    let min_cos = crease_angle.cos();
    let mut lookup: HashMap<Key, u32> = HashMap::new();
    let mut mesh = MeshData::default();

    for (face, tri) in corners.iter().enumerate() {
        for corner in tri {
            let normal = corner.normal.unwrap_or_else(|| {
                smooth_normal(
                    face,
                    &face_normals,
                    adjacency.get(&corner.position).map(Vec::as_slice).unwrap_or(&[]),
                    min_cos,
                )
            });
            let texcoord = corner.texcoord.unwrap_or(Vec2::ZERO);
            let key = Key {
                position: corner.position,
                texcoord: texcoord.to_array().map(f32::to_bits),
                normal: normal.to_array().map(f32::to_bits),
            };
            let next_index = mesh.vertex_count() as u32;
            let entry = lookup.entry(key).or_insert_with(|| {
                let p = positions[corner.position];
                mesh.vertices.extend_from_slice(&[
                    p.x, p.y, p.z, normal.x, normal.y, normal.z, texcoord.x, texcoord.y,
                ]);
                next_index
            });
            mesh.indices.push(*entry);
        }
    }
    mesh
}

fn smooth_normal(face: usize, face_normals: &[Vec3], adjacent: &[usize], min_cos: f32) -> Vec3 {
    let own = face_normals[face];
    if own == Vec3::ZERO {
        let sum: Vec3 = adjacent.iter().map(|&other| face_normals[other]).sum();
        return sum.normalize_or_zero();
    }
    let sum: Vec3 = adjacent
        .iter()
        .map(|&other| face_normals[other])
        .filter(|other| *other != Vec3::ZERO && own.dot(*other) >= min_cos)
        .sum();
    sum.try_normalize().unwrap_or(own)
}

fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = index.unsigned_abs() as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}

/// Re-centers the mesh on the origin and scales it uniformly so the longest
/// side of its bounding box equals `target_extent`.
pub fn normalize_extent(mesh: &mut MeshData, target_extent: f32) {
    let Some((min, max)) = mesh.bounds() else {
        return;
    };
    let center = (min + max) * 0.5;
    let longest = (max - min).max_element();
    let scale = if longest > 0.0 {
        target_extent / longest
    } else {
        1.0
    };
    for vertex in mesh.vertices.chunks_exact_mut(FLOATS_PER_VERTEX) {
        let p = (Vec3::from_slice(&vertex[..3]) - center) * scale;
        vertex[..3].copy_from_slice(&p.to_array());
    }
}

pub fn flip_texcoords_v(mesh: &mut MeshData) {
    for vertex in mesh.vertices.chunks_exact_mut(FLOATS_PER_VERTEX) {
        vertex[7] = 1.0 - vertex[7];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn raw() -> ObjLoadOptions {
        ObjLoadOptions {
            target_extent: None,
            ..ObjLoadOptions::default()
        }
    }

    #[test]
    fn parses_simple_triangle() {
        let mesh = load_obj_from_str(TRIANGLE, &raw()).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3 * FLOATS_PER_VERTEX);
    }

    #[test]
    fn computes_missing_normals() {
        let mesh = load_obj_from_str(TRIANGLE, &raw()).unwrap();
        for i in 0..mesh.vertex_count() {
            assert!((mesh.normal(i) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn keeps_texcoords_and_explicit_normals() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 2\nf 1/1/1 2/2/1 3/3/1\n";
        let mesh = load_obj_from_str(obj, &raw()).unwrap();
        assert_eq!(mesh.texcoord(1), Vec2::new(1.0, 0.0));
        assert_eq!(mesh.normal(2), Vec3::Z);
    }

    #[test]
    fn quads_are_triangulated() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = load_obj_from_str(obj, &raw()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn negative_indices_are_relative() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = load_obj_from_str(obj, &raw()).unwrap();
        assert_eq!(mesh.position(1), Vec3::X);
    }

    #[test]
    fn crease_splits_hard_edges_and_smooths_soft_ones() {
        // Two faces meeting at 90 degrees share the edge 1-2.
        let hard = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\nf 1 4 2\n";
        let mesh = load_obj_from_str(hard, &raw()).unwrap();
        assert_eq!(mesh.vertex_count(), 6);

        // A slight fold (well under 0.5 rad) keeps shared vertices welded.
        let soft = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0.1\nf 1 2 3\nf 2 4 3\n";
        let mesh = load_obj_from_str(soft, &raw()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        for i in 0..mesh.vertex_count() {
            assert!((mesh.normal(i).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn normalizes_extent_and_center() {
        let obj = "v 10 10 10\nv 14 10 10\nv 10 12 10\nf 1 2 3\n";
        let mesh = load_obj_from_str(obj, &ObjLoadOptions::default()).unwrap();
        let (min, max) = mesh.bounds().unwrap();
        assert!(((max - min).max_element() - DEFAULT_TARGET_EXTENT).abs() < 1e-5);
        assert!(((min + max) * 0.5).length() < 1e-5);
    }

    #[test]
    fn flips_v_on_request() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0.25\nf 1/1 2/1 3/1\n";
        let options = ObjLoadOptions {
            flip_v: true,
            ..raw()
        };
        let mesh = load_obj_from_str(obj, &options).unwrap();
        assert_eq!(mesh.texcoord(0).y, 0.75);
    }

    #[test]
    fn rejects_out_of_range_vertex() {
        let obj = "v 0 0 0\nf 1 2 3\n";
        assert!(load_obj_from_str(obj, &raw()).is_err());
        assert!(load_obj_from_str("# nothing\n", &raw()).is_err());
    }

    #[test]
    fn default_layout_is_tightly_interleaved() {
        let layout = VertexLayout::default();
        assert_eq!(layout.stride, 32);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(layout.stride as usize, FLOATS_PER_VERTEX * 4);
    }
}
