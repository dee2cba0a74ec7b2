//! Matrix builders shared by the camera, the model cache and the frame composer.
//!
//! All matrices are column-major, right-handed and target a clip space whose
//! depth range is `[0, 1]`, which is what wgpu expects.

use glam::{Mat4, Vec3, Vec4};

/// Smallest aspect ratio accepted by [`perspective`].
pub const MIN_ASPECT: f32 = 0.001;

const FOV_MARGIN: f32 = 0.001;
const MIN_NEAR: f32 = 0.000_001;

/// Right-handed perspective projection.
///
/// Inputs are sanitized rather than rejected: the field of view is kept inside
/// `(0, π)`, the aspect ratio is floored at [`MIN_ASPECT`] and the far plane is
/// pushed beyond the near plane when needed.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let fov_y = fov_y.clamp(FOV_MARGIN, std::f32::consts::PI - FOV_MARGIN);
    let aspect = aspect.max(MIN_ASPECT);
    let near = near.max(MIN_NEAR);
    let far = far.max(near + MIN_NEAR);
    Mat4::perspective_rh(fov_y, aspect, near, far)
}

/// Right-handed look-at view matrix.
///
/// Falls back to world up when `up` is parallel to the viewing direction.
pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    let forward = (eye - center).normalize_or_zero();
    let up = if up.cross(forward).length_squared() > 1e-8 {
        up
    } else if Vec3::Y.cross(forward).length_squared() > 1e-8 {
        Vec3::Y
    } else {
        Vec3::Z
    };
    Mat4::look_at_rh(eye, center, up)
}

pub fn translation(offset: Vec3) -> Mat4 {
    Mat4::from_translation(offset)
}

pub fn scale(factors: Vec3) -> Mat4 {
    Mat4::from_scale(factors)
}

/// Rotation of `radians` around `axis` (normalized internally).
pub fn rotation(radians: f32, axis: Vec3) -> Mat4 {
    let axis = axis.try_normalize().unwrap_or(Vec3::Y);
    Mat4::from_axis_angle(axis, radians)
}

/// Rotation from Euler angles in degrees, applied X first, then Y, then Z.
pub fn rotation_xyz_degrees(degrees: Vec3) -> Mat4 {
    Mat4::from_rotation_z(degrees.z.to_radians())
        * Mat4::from_rotation_y(degrees.y.to_radians())
        * Mat4::from_rotation_x(degrees.x.to_radians())
}

/// Removes the translation column of a view matrix, keeping only rotation.
pub fn strip_translation(view: Mat4) -> Mat4 {
    let mut rotation_only = view;
    rotation_only.w_axis = Vec4::new(0.0, 0.0, 0.0, view.w_axis.w);
    rotation_only
}

/// View-projection used for the skybox: camera rotation only.
pub fn view_projection_without_translation(view: Mat4, proj: Mat4) -> Mat4 {
    proj * strip_translation(view)
}
