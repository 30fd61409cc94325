//! Damped orbit controls
//!
//! Input accumulates into a pending spherical rotation, a pan offset and a
//! zoom scale. Each [`OrbitControls::update`] applies a `damping_factor`
//! fraction of the pending rotation and pan to the camera and keeps the rest
//! for later frames, so motion eases out after the pointer stops. Zoom is
//! applied in full on the next update.

use glam::{Vec2, Vec3};
use std::f32::consts::PI;

use super::camera::Camera;
use crate::config::CameraSettings;

/// Keeps the polar angle away from the poles where the view basis degenerates
const POLAR_EPSILON: f32 = 1e-6;

/// Distance scale per wheel step
const ZOOM_STEP: f32 = 0.95;

/// Which drag gesture is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Fraction of the pending input applied per update
    pub damping_factor: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    /// Pending azimuth change (radians)
    delta_theta: f32,
    /// Pending polar change (radians)
    delta_phi: f32,
    pan_offset: Vec3,
    scale: f32,
    drag: Option<DragMode>,
    cursor: Option<Vec2>,
}

impl OrbitControls {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            damping_factor: settings.damping_factor,
            min_polar_angle: 0.0,
            max_polar_angle: settings.max_polar_angle,
            min_distance: 0.0,
            max_distance: settings.max_distance,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            delta_theta: 0.0,
            delta_phi: 0.0,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
            drag: None,
            cursor: None,
        }
    }

    /// Pending rotation as (azimuth, polar) radians
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.delta_theta, self.delta_phi)
    }

    pub fn pending_pan(&self) -> Vec3 {
        self.pan_offset
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn begin_drag(&mut self, mode: DragMode) {
        self.drag = Some(mode);
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Feed a cursor position in physical pixels. While a drag is active the
    /// movement since the last position is turned into rotation or pan.
    pub fn cursor_moved(&mut self, position: Vec2, viewport_height: f32, camera: &Camera) {
        let previous = self.cursor.replace(position);
        let (Some(mode), Some(previous)) = (self.drag, previous) else {
            return;
        };
        let delta = position - previous;
        match mode {
            DragMode::Rotate => self.rotate(delta, viewport_height),
            DragMode::Pan => self.pan(delta, viewport_height, camera),
        }
    }

    /// Rotate by a pointer movement; dragging across the full viewport
    /// height turns the camera by one revolution
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= 2.0 * PI * delta.x / height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * delta.y / height * self.rotate_speed;
    }

    /// Pan the target in the camera's screen plane so the point under the
    /// cursor follows it at the target's depth
    pub fn pan(&mut self, delta: Vec2, viewport_height: f32, camera: &Camera) {
        let height = viewport_height.max(1.0);
        let offset = camera.position - camera.target;
        let target_distance = offset.length() * (camera.fov * 0.5).tan();

        let world = camera.view_matrix().inverse();
        let right = world.x_axis.truncate();
        let up = world.y_axis.truncate();

        let scale = 2.0 * target_distance / height * self.pan_speed;
        self.pan_offset += -right * (delta.x * scale) + up * (delta.y * scale);
    }

    /// Wheel input; positive steps move toward the target
    pub fn zoom(&mut self, steps: f32) {
        if steps == 0.0 {
            return;
        }
        let factor = ZOOM_STEP.powf(self.zoom_speed);
        if steps > 0.0 {
            self.scale *= factor;
        } else {
            self.scale /= factor;
        }
    }

    /// Apply pending input to the camera and decay it
    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - camera.target;
        let radius = offset.length();

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        theta += self.delta_theta * self.damping_factor;
        phi += self.delta_phi * self.damping_factor;

        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.target += self.pan_offset * self.damping_factor;

        let sin_phi = phi.sin();
        camera.position = camera.target
            + Vec3::new(
                radius * sin_phi * theta.sin(),
                radius * phi.cos(),
                radius * sin_phi * theta.cos(),
            );

        let keep = 1.0 - self.damping_factor;
        self.delta_theta *= keep;
        self.delta_phi *= keep;
        self.pan_offset *= keep;
        self.scale = 1.0;
    }
}
