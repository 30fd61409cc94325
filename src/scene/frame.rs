//! Per-frame state and update

use super::{bubbles, Clock, Scene};
use crate::config::SceneConfig;
use crate::render::camera::Camera;
use crate::render::orbit_controls::OrbitControls;
use crate::render::viewport::Viewport;

/// Everything one frame reads and mutates
pub struct FrameState {
    pub clock: Clock,
    pub scene: Scene,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub viewport: Viewport,
}

impl FrameState {
    pub fn new(config: &SceneConfig, viewport: Viewport) -> Self {
        Self {
            clock: Clock::start(),
            scene: Scene::new(config.text.clone(), config.seed),
            camera: Camera::new(&config.camera, viewport.aspect()),
            controls: OrbitControls::new(&config.camera),
            viewport,
        }
    }

    /// Track a new window size; the camera aspect follows the logical size
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
    }
}

/// Advance the scene to `elapsed` seconds: drift every bubble, then apply
/// pending orbit input to the camera
pub fn update(state: &mut FrameState, elapsed: f64) {
    bubbles::animate(&mut state.scene.bubbles, elapsed);
    state.controls.update(&mut state.camera);
}
