//! Bubble Scene Library
//!
//! A decorative 3D scene rendered with wgpu:
//! - Floating bubbles with iridescent, transmissive shading
//! - Extruded text from a typeface font
//! - An HDR environment backdrop with damped orbit controls
//! - A debug panel for live material tuning

pub mod assets;
pub mod config;
pub mod export;
pub mod geometry;
pub mod panel;
pub mod render;
pub mod scene;

pub use config::SceneConfig;
pub use scene::{FrameState, Scene};
