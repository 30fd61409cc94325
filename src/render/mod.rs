//! GPU rendering modules
//!
//! Contains wgpu-based rendering infrastructure:
//! - Camera / orbit controls / viewport: view state driven by input and resize
//! - Scene renderer: background, text and bubble pipelines shared by both outputs
//! - Transmission: mip-mapped copy of the opaque scene seen through bubbles
//! - Pipeline: window surface, scene blit and the egui panel
//! - Headless: offscreen rendering for automated testing

pub mod camera;
pub mod gpu_mesh;
pub mod headless;
pub mod iridescence_lut;
pub mod orbit_controls;
pub mod pipeline;
pub mod scene_renderer;
pub mod textures;
pub mod transmission;
pub mod viewport;

pub use camera::Camera;
pub use headless::HeadlessRenderPipeline;
pub use orbit_controls::{DragMode, OrbitControls};
pub use pipeline::{RenderError, RenderPipeline};
pub use scene_renderer::SceneRenderer;
pub use viewport::Viewport;
