use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::math;

/// Limits and sensitivities applied by [`OrbitCamera`] mutators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub near_z: f32,
    pub far_z: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Must stay below π/2 so the view direction never aligns with world up.
    pub max_pitch_abs: f32,
    pub orbit_sensitivity: Vec2,
    pub zoom_sensitivity: f32,
    pub pan_pixel_scale: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 0.7, 0.0),
            distance: 4.0,
            yaw: 0.0,
            pitch: 0.2,
            fov_y: PI / 4.0,
            near_z: 0.01,
            far_z: 100.0,
            min_distance: 0.2,
            max_distance: 50.0,
            max_pitch_abs: PI * 0.499,
            orbit_sensitivity: Vec2::ONE,
            zoom_sensitivity: 1.0,
            pan_pixel_scale: 1.0,
        }
    }
}

/// Camera parameterized by a target, a distance and yaw/pitch angles.
///
/// All mutators clamp instead of failing: after any call
/// `min_distance <= distance <= max_distance`, `|pitch| <= max_pitch_abs`
/// and `yaw` lies in `(-π, π]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    distance: f32,
    yaw: f32,
    pitch: f32,
    pub fov_y: f32,
    aspect: f32,
    pub near_z: f32,
    pub far_z: f32,
    min_distance: f32,
    max_distance: f32,
    max_pitch_abs: f32,
    pub orbit_sensitivity: Vec2,
    pub zoom_sensitivity: f32,
    pub pan_pixel_scale: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(&CameraSettings::default())
    }
}

impl OrbitCamera {
    pub fn new(settings: &CameraSettings) -> Self {
        let min_distance = settings.min_distance.max(f32::EPSILON);
        let max_distance = settings.max_distance.max(min_distance);
        let max_pitch_abs = settings.max_pitch_abs.abs().min(PI * 0.4999);
        Self {
            target: settings.target,
            distance: finite_or(settings.distance, min_distance).clamp(min_distance, max_distance),
            yaw: wrap_angle(settings.yaw),
            pitch: finite_or(settings.pitch, 0.0).clamp(-max_pitch_abs, max_pitch_abs),
            fov_y: settings.fov_y,
            aspect: 1.0,
            near_z: settings.near_z,
            far_z: settings.far_z,
            min_distance,
            max_distance,
            max_pitch_abs,
            orbit_sensitivity: settings.orbit_sensitivity,
            zoom_sensitivity: settings.zoom_sensitivity,
            pan_pixel_scale: settings.pan_pixel_scale,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn distance_limits(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    pub fn max_pitch_abs(&self) -> f32 {
        self.max_pitch_abs
    }

    /// Sets the distance, clamped into the configured limits. NaN is ignored.
    pub fn set_distance(&mut self, distance: f32) {
        if distance.is_nan() {
            return;
        }
        self.distance = distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = wrap_angle(yaw);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        if pitch.is_nan() {
            return;
        }
        self.pitch = pitch.clamp(-self.max_pitch_abs, self.max_pitch_abs);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(math::MIN_ASPECT);
    }

    /// Updates the aspect ratio from a drawable size in pixels.
    pub fn set_drawable_size(&mut self, width: f32, height: f32) {
        self.set_aspect(width / height.max(1.0));
    }

    /// Unit vector from the eye towards the target.
    pub fn view_direction(&self) -> Vec3 {
        let pitch = self.pitch.clamp(-self.max_pitch_abs, self.max_pitch_abs);
        let (sp, cp) = pitch.sin_cos();
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cp * sy, sp, cp * cy)
    }

    pub fn right_vector(&self) -> Vec3 {
        self.view_direction().cross(Vec3::Y).normalize()
    }

    pub fn up_vector(&self) -> Vec3 {
        self.right_vector().cross(self.view_direction()).normalize()
    }

    pub fn eye(&self) -> Vec3 {
        self.target - self.view_direction() * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        math::look_at(self.eye(), self.target, Vec3::Y)
    }

    pub fn proj_matrix(&self) -> Mat4 {
        math::perspective(self.fov_y, self.aspect, self.near_z, self.far_z)
    }

    /// Rotates around the target. Yaw wraps, pitch clamps. Non-finite deltas
    /// are ignored.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if !(delta_yaw.is_finite() && delta_pitch.is_finite()) {
            return;
        }
        self.yaw = wrap_angle(self.yaw + delta_yaw * self.orbit_sensitivity.x);
        self.set_pitch(self.pitch + delta_pitch * self.orbit_sensitivity.y);
    }

    /// Multiplies the distance by `scale ^ zoom_sensitivity`.
    ///
    /// Values below one move the eye closer. Non-positive or non-finite
    /// scales are ignored.
    pub fn zoom(&mut self, scale: f32) {
        if !(scale.is_finite() && scale > 0.0) {
            return;
        }
        self.set_distance(self.distance * scale.powf(self.zoom_sensitivity));
    }

    /// Moves the target in the camera plane by a pixel delta.
    ///
    /// The delta is measured against the visible span at the current distance
    /// so a drag covers the same fraction of the screen at any zoom level.
    /// Non-finite deltas are ignored.
    pub fn pan(&mut self, pixel_delta: Vec2) {
        if !pixel_delta.is_finite() {
            return;
        }
        let span_y = 2.0 * self.distance * (self.fov_y * 0.5).tan();
        let span_x = span_y * self.aspect;
        let factor = self.pan_pixel_scale / 1000.0;
        let dx = pixel_delta.x * span_x * factor;
        let dy = pixel_delta.y * span_y * factor;
        let offset = -self.right_vector() * dx + self.up_vector() * dy;
        if offset.is_finite() {
            self.target += offset;
        }
    }

    /// Restores the pose from `settings`, keeping the current aspect ratio.
    pub fn reset(&mut self, settings: &CameraSettings) {
        let aspect = self.aspect;
        *self = Self::new(settings);
        self.aspect = aspect;
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value
    }
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut wrapped = angle % TAU;
    if wrapped <= -PI {
        wrapped += TAU;
    }
    if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}
