use std::collections::HashSet;

/// Pipeline stage an entry point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// WGSL source plus the entry points it declares.
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    source: String,
    entries: HashSet<(ShaderStage, String)>,
}

impl ShaderLibrary {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let entries = scan_entry_points(&source);
        Self { source, entries }
    }

    /// Mesh vertex and fragment variants bundled with the viewer.
    pub fn builtin() -> Self {
        Self::new(MESH_SHADERS)
    }

    pub fn skybox() -> Self {
        Self::new(SKYBOX_SHADERS)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_entry(&self, stage: ShaderStage, name: &str) -> bool {
        self.entries.contains(&(stage, name.to_string()))
    }
}

/// Finds `@vertex fn name` / `@fragment fn name` declarations.
fn scan_entry_points(source: &str) -> HashSet<(ShaderStage, String)> {
    let mut entries = HashSet::new();
    let mut pending = None;
    for token in source.split_whitespace() {
        match token {
            "@vertex" => pending = Some((ShaderStage::Vertex, false)),
            "@fragment" => pending = Some((ShaderStage::Fragment, false)),
            "fn" => {
                if let Some((stage, _)) = pending {
                    pending = Some((stage, true));
                }
            }
            _ => {
                if let Some((stage, true)) = pending.take() {
                    let name = token.split('(').next().unwrap_or(token);
                    entries.insert((stage, name.to_string()));
                }
            }
        }
    }
    entries
}

pub const MESH_SHADERS: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    light_dir: vec3<f32>,
    ambient: f32,
    time: f32,
}

@group(0) @binding(0)
var<uniform> u: Uniforms;
@group(0) @binding(1)
var base_texture: texture_2d<f32>;
@group(0) @binding(2)
var base_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) view_normal: vec3<f32>,
    @location(2) view_pos: vec3<f32>,
    @location(3) uv: vec2<f32>,
}

fn upper3(m: mat4x4<f32>) -> mat3x3<f32> {
    return mat3x3<f32>(m[0].xyz, m[1].xyz, m[2].xyz);
}

fn project(position: vec3<f32>, normal: vec3<f32>, uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    let world = u.model * vec4<f32>(position, 1.0);
    let view_pos = u.view * world;
    let world_normal = normalize(upper3(u.model) * normal);
    out.position = u.proj * view_pos;
    out.world_normal = world_normal;
    out.view_normal = normalize(upper3(u.view) * world_normal);
    out.view_pos = view_pos.xyz;
    out.uv = uv;
    return out;
}

fn hash3(p: vec3<f32>) -> f32 {
    return fract(sin(dot(p, vec3<f32>(12.9898, 78.233, 37.719))) * 43758.5453);
}

@vertex
fn v_main(input: VertexInput) -> VertexOutput {
    return project(input.position, input.normal, input.uv);
}

@vertex
fn v_noise_deform(input: VertexInput) -> VertexOutput {
    let wobble = sin(u.time * 2.0 + hash3(input.position) * 6.2831);
    let offset = input.normal * wobble * 0.03;
    return project(input.position + offset, input.normal, input.uv);
}

@vertex
fn v_thin_shrink(input: VertexInput) -> VertexOutput {
    let pulse = 0.85 + 0.1 * sin(u.time * 1.5);
    let position = vec3<f32>(input.position.x * pulse, input.position.y, input.position.z * pulse);
    return project(position - input.normal * 0.01, input.normal, input.uv);
}

@vertex
fn v_twist_y(input: VertexInput) -> VertexOutput {
    let angle = input.position.y * 1.2 * sin(u.time * 0.8);
    let c = cos(angle);
    let s = sin(angle);
    let twist = mat3x3<f32>(
        vec3<f32>(c, 0.0, -s),
        vec3<f32>(0.0, 1.0, 0.0),
        vec3<f32>(s, 0.0, c),
    );
    return project(twist * input.position, twist * input.normal, input.uv);
}

fn diffuse_term(normal: vec3<f32>) -> f32 {
    return max(dot(normalize(normal), -normalize(u.light_dir)), 0.0);
}

@fragment
fn f_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(base_texture, base_sampler, input.uv);
    let light = min(u.ambient + diffuse_term(input.world_normal), 1.0);
    return vec4<f32>(albedo.rgb * light, albedo.a);
}

@fragment
fn f_metal(input: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(base_texture, base_sampler, input.uv).rgb;
    let n = normalize(input.view_normal);
    let v = normalize(-input.view_pos);
    let l = normalize(upper3(u.view) * -normalize(u.light_dir));
    let h = normalize(l + v);
    let specular = pow(max(dot(n, h), 0.0), 64.0);
    let fresnel = pow(1.0 - max(dot(n, v), 0.0), 5.0);
    let base = mix(albedo, vec3<f32>(0.8, 0.8, 0.85), 0.5) * (0.35 + diffuse_term(input.world_normal));
    return vec4<f32>(base + vec3<f32>(specular + fresnel * 0.4), 1.0);
}

@fragment
fn f_toon_rim(input: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(base_texture, base_sampler, input.uv).rgb;
    let bands = floor(diffuse_term(input.world_normal) * 3.0) / 3.0;
    let n = normalize(input.view_normal);
    let v = normalize(-input.view_pos);
    let rim = smoothstep(0.6, 1.0, 1.0 - max(dot(n, v), 0.0));
    let color = albedo * (0.45 + bands * 0.55) + vec3<f32>(rim * 0.5);
    return vec4<f32>(color, 1.0);
}

@fragment
fn f_matcap_solid(input: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(input.view_normal);
    let uv = n.xy * 0.5 + vec2<f32>(0.5);
    let shade = 0.25 + 0.75 * uv.y;
    let highlight = pow(max(1.0 - length(uv - vec2<f32>(0.35, 0.7)), 0.0), 6.0);
    let color = vec3<f32>(0.72, 0.74, 0.8) * shade + vec3<f32>(highlight);
    return vec4<f32>(color, 1.0);
}
"#;

pub const SKYBOX_SHADERS: &str = r#"
struct SkyboxUniforms {
    view_proj_no_translation: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> sky: SkyboxUniforms;
@group(0) @binding(1)
var sky_texture: texture_cube<f32>;
@group(0) @binding(2)
var sky_sampler: sampler;

struct SkyboxOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) direction: vec3<f32>,
}

@vertex
fn skybox_v_main(@location(0) position: vec3<f32>) -> SkyboxOutput {
    var out: SkyboxOutput;
    let clip = sky.view_proj_no_translation * vec4<f32>(position, 1.0);
    out.position = clip.xyww;
    out.direction = position;
    return out;
}

@fragment
fn skybox_f_main(input: SkyboxOutput) -> @location(0) vec4<f32> {
    return textureSample(sky_texture, sky_sampler, input.direction);
}
"#;
