use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
}

/// Friendly names for the keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Escape,
    LeftShift,
    RightShift,
    LeftAlt,
    RightAlt,
}

/// Keys whose held state drives continuous camera motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerKey {
    YawLeft,
    YawRight,
    /// Raises the view direction, which lowers the eye below the target.
    PitchUp,
    PitchDown,
    ZoomIn,
    ZoomOut,
    Boost,
}

/// Everything the input layer can ask of the core. Deltas are already in
/// camera units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Orbit { delta_yaw: f32, delta_pitch: f32 },
    Pan(Vec2),
    Zoom(f32),
    Key { key: ViewerKey, down: bool },
    SelectModel(isize),
    NextModel,
    PreviousModel,
    SelectVertexShader(i64),
    SelectFragmentShader(i64),
    ResetShaders,
    ToggleDebugCamera,
    ReloadSkybox,
    ResetCamera,
    /// Drops every held key, e.g. when the window loses focus.
    ReleaseKeys,
    Resize { width: u32, height: u32 },
    OutputFormats {
        color: wgpu::TextureFormat,
        depth: wgpu::TextureFormat,
    },
}

/// Event channel between the windowing layer and the frame composer.
///
/// Producers push at any time; the composer drains once at the start of each
/// frame so matrices never change mid-draw.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    events: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InputEvent) {
        self.events.lock().push_back(event);
    }

    /// Removes and returns every queued event in arrival order.
    pub fn drain(&self) -> Vec<InputEvent> {
        self.events.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    keys: HashSet<ViewerKey>,
}

impl HeldKeys {
    pub fn set(&mut self, key: ViewerKey, down: bool) {
        if down {
            self.keys.insert(key);
        } else {
            self.keys.remove(&key);
        }
    }

    pub fn is_down(&self, key: ViewerKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    fn boost(&self, controls: &ControlSettings) -> f32 {
        if self.is_down(ViewerKey::Boost) {
            controls.boost
        } else {
            1.0
        }
    }

    /// Yaw (x) and pitch (y) to apply for `dt` seconds of held orbit keys.
    pub fn orbit_delta(&self, controls: &ControlSettings, dt: f32) -> Vec2 {
        let step = controls.orbit_speed * dt * self.boost(controls);
        let mut delta = Vec2::ZERO;
        if self.is_down(ViewerKey::YawLeft) {
            delta.x -= step;
        }
        if self.is_down(ViewerKey::YawRight) {
            delta.x += step;
        }
        if self.is_down(ViewerKey::PitchUp) {
            delta.y += step;
        }
        if self.is_down(ViewerKey::PitchDown) {
            delta.y -= step;
        }
        delta
    }

    /// Multiplicative zoom for `dt` seconds of held zoom keys, `None` when
    /// neither or both are held. Zooming in shrinks the distance.
    pub fn zoom_scale(&self, controls: &ControlSettings, dt: f32) -> Option<f32> {
        let zoom_in = self.is_down(ViewerKey::ZoomIn);
        if zoom_in == self.is_down(ViewerKey::ZoomOut) {
            return None;
        }
        let direction = if zoom_in { -1.0 } else { 1.0 };
        Some((direction * controls.zoom_rate * dt * self.boost(controls)).exp())
    }
}

/// Rates for held keys and scale factors turning raw pointer motion into
/// camera deltas. Pointer deltas follow window coordinates, y pointing down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Radians per second for held orbit keys.
    pub orbit_speed: f32,
    /// Exponential zoom rate per second for held zoom keys.
    pub zoom_rate: f32,
    pub boost: f32,
    /// Radians per dragged pixel, before the per-axis factors.
    pub mouse_orbit: f32,
    pub orbit_yaw_factor: f32,
    pub orbit_pitch_factor: f32,
    pub mouse_pan: f32,
    pub pan_scale: f32,
    pub scroll_zoom: f32,
    /// Pixels assumed per scroll line for wheels without precise deltas.
    pub scroll_line_pixels: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            orbit_speed: 1.8,
            zoom_rate: 2.0,
            boost: 2.25,
            mouse_orbit: 0.015,
            orbit_yaw_factor: -0.5,
            orbit_pitch_factor: 0.5,
            mouse_pan: 0.0035,
            pan_scale: 80.0,
            scroll_zoom: 0.01,
            scroll_line_pixels: 20.0,
        }
    }
}

impl ControlSettings {
    pub fn drag_orbit(&self, delta: Vec2) -> InputEvent {
        InputEvent::Orbit {
            delta_yaw: delta.x * self.mouse_orbit * self.orbit_yaw_factor,
            delta_pitch: -delta.y * self.mouse_orbit * self.orbit_pitch_factor,
        }
    }

    pub fn drag_pan(&self, delta: Vec2) -> InputEvent {
        InputEvent::Pan(delta * self.mouse_pan * self.pan_scale)
    }

    /// Vertical drag zoom: dragging down moves the camera away.
    pub fn drag_zoom(&self, delta_y: f32) -> InputEvent {
        InputEvent::Zoom((delta_y * self.scroll_zoom).exp())
    }

    /// Scroll zoom: scrolling up (positive) moves the camera closer.
    pub fn scroll(&self, delta_y: f32) -> InputEvent {
        InputEvent::Zoom((-delta_y * self.scroll_zoom).exp())
    }

    pub fn scroll_lines(&self, lines: f32) -> InputEvent {
        self.scroll(lines * self.scroll_line_pixels)
    }

    /// Trackpad pinch; positive magnification zooms in.
    pub fn pinch(&self, magnification: f32) -> InputEvent {
        InputEvent::Zoom((1.0 - magnification).clamp(0.2, 5.0))
    }
}

/// One-shot commands bound to single key presses.
pub fn command_for_key(key: KeyCode) -> Option<InputEvent> {
    let event = match key {
        KeyCode::Digit(0) => InputEvent::ResetShaders,
        KeyCode::Digit(d @ 1..=3) => InputEvent::SelectFragmentShader(i64::from(d)),
        KeyCode::Digit(d @ 4..=6) => InputEvent::SelectVertexShader(i64::from(d - 3)),
        KeyCode::Character('V') => InputEvent::SelectVertexShader(1),
        KeyCode::Character('B') => InputEvent::SelectVertexShader(0),
        KeyCode::Character('J') => InputEvent::SelectModel(0),
        KeyCode::Character('K') => InputEvent::SelectModel(1),
        KeyCode::Character('L') => InputEvent::SelectModel(2),
        KeyCode::Character('N') => InputEvent::NextModel,
        KeyCode::Character('P') => InputEvent::PreviousModel,
        KeyCode::Character('C') => InputEvent::ToggleDebugCamera,
        KeyCode::Character('R') => InputEvent::ReloadSkybox,
        KeyCode::Named(NamedKey::Space) => InputEvent::ResetCamera,
        _ => return None,
    };
    Some(event)
}

/// Keys tracked while held.
pub fn held_key_for(key: KeyCode) -> Option<ViewerKey> {
    let held = match key {
        KeyCode::Character('A') | KeyCode::Named(NamedKey::Left) => ViewerKey::YawLeft,
        KeyCode::Character('D') | KeyCode::Named(NamedKey::Right) => ViewerKey::YawRight,
        KeyCode::Character('S') | KeyCode::Named(NamedKey::Down) => ViewerKey::PitchUp,
        KeyCode::Character('W') | KeyCode::Named(NamedKey::Up) => ViewerKey::PitchDown,
        KeyCode::Character('Q') => ViewerKey::ZoomIn,
        KeyCode::Character('E') => ViewerKey::ZoomOut,
        KeyCode::Named(NamedKey::LeftShift) | KeyCode::Named(NamedKey::RightShift) => {
            ViewerKey::Boost
        }
        _ => return None,
    };
    Some(held)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_resets_camera() {
        assert_eq!(
            command_for_key(KeyCode::Named(NamedKey::Space)),
            Some(InputEvent::ResetCamera)
        );
        assert_eq!(held_key_for(KeyCode::Named(NamedKey::Space)), None);
    }

    #[test]
    fn clear_releases_every_held_key() {
        let mut held = HeldKeys::default();
        held.set(ViewerKey::YawLeft, true);
        held.set(ViewerKey::Boost, true);
        held.clear();
        assert!(!held.is_down(ViewerKey::YawLeft));
        assert_eq!(held.orbit_delta(&ControlSettings::default(), 0.1), Vec2::ZERO);
    }

    #[test]
    fn digits_select_shader_variants() {
        assert_eq!(
            command_for_key(KeyCode::Digit(2)),
            Some(InputEvent::SelectFragmentShader(2))
        );
        assert_eq!(
            command_for_key(KeyCode::Digit(6)),
            Some(InputEvent::SelectVertexShader(3))
        );
        assert_eq!(command_for_key(KeyCode::Digit(0)), Some(InputEvent::ResetShaders));
        assert_eq!(command_for_key(KeyCode::Digit(9)), None);
    }

    #[test]
    fn letters_select_models() {
        let key = KeyCode::Character('K');
        assert_eq!(command_for_key(key), Some(InputEvent::SelectModel(1)));
        assert_eq!(held_key_for(key), None);
    }

    #[test]
    fn queue_drains_in_order_across_clones() {
        let queue = InputQueue::new();
        let producer = queue.clone();
        producer.push(InputEvent::NextModel);
        producer.push(InputEvent::Zoom(0.5));
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.drain(),
            vec![InputEvent::NextModel, InputEvent::Zoom(0.5)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn held_keys_integrate_with_boost() {
        let controls = ControlSettings::default();
        let mut held = HeldKeys::default();
        held.set(ViewerKey::YawRight, true);
        held.set(ViewerKey::PitchUp, true);
        let delta = held.orbit_delta(&controls, 0.5);
        assert!((delta - Vec2::new(0.9, 0.9)).length() < 1e-6);

        held.set(ViewerKey::Boost, true);
        let boosted = held.orbit_delta(&controls, 0.5);
        assert!((boosted.x - 0.9 * 2.25).abs() < 1e-5);

        held.set(ViewerKey::YawLeft, true);
        assert_eq!(held.orbit_delta(&controls, 0.5).x, 0.0);
    }

    #[test]
    fn zoom_keys_cancel_and_zoom_in_shrinks() {
        let controls = ControlSettings::default();
        let mut held = HeldKeys::default();
        assert_eq!(held.zoom_scale(&controls, 0.1), None);
        held.set(ViewerKey::ZoomIn, true);
        let scale = held.zoom_scale(&controls, 0.1).unwrap();
        assert!((scale - (-0.2f32).exp()).abs() < 1e-6);
        held.set(ViewerKey::ZoomOut, true);
        assert_eq!(held.zoom_scale(&controls, 0.1), None);
    }

    #[test]
    fn pointer_mapping_uses_control_scales() {
        let controls = ControlSettings::default();
        match controls.drag_orbit(Vec2::new(10.0, -10.0)) {
            InputEvent::Orbit {
                delta_yaw,
                delta_pitch,
            } => {
                assert!((delta_yaw + 0.075).abs() < 1e-6);
                assert!((delta_pitch - 0.075).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(controls.pinch(2.0), InputEvent::Zoom(0.2));
        assert_eq!(controls.scroll(0.0), InputEvent::Zoom(1.0));
        match controls.drag_pan(Vec2::new(1.0, 0.0)) {
            InputEvent::Pan(delta) => assert!((delta.x - 0.28).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
    }
}
