//! Headless rendering pipeline for automated testing
//!
//! Provides GPU rendering without requiring a window or display,
//! enabling integration tests and PNG captures of a scene.

use std::path::Path;

use crate::export::{export_frame, ExportError};
use crate::render::camera::Camera;
use crate::render::scene_renderer::SceneRenderer;
use crate::render::textures::{RenderTarget, SCENE_COLOR_FORMAT};
use crate::scene::Scene;

/// Headless render pipeline for testing without a window
///
/// Renders a [`Scene`] to an offscreen texture and can extract
/// pixel data for verification or export.
pub struct HeadlessRenderPipeline {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: RenderTarget,
    renderer: SceneRenderer,
}

impl HeadlessRenderPipeline {
    /// Create a new headless render pipeline
    ///
    /// # Arguments
    /// * `width` - Render target width in pixels
    /// * `height` - Render target height in pixels
    ///
    /// # Returns
    /// A new HeadlessRenderPipeline or None if GPU initialization fails
    pub async fn new(width: u32, height: u32) -> Option<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Request adapter without surface requirement (headless)
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: Some("Headless Device"),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .ok()?;

        let target = RenderTarget::new(&device, width, height);
        let renderer = SceneRenderer::new(&device, &queue, SCENE_COLOR_FORMAT);

        Some(Self {
            device,
            queue,
            target,
            renderer,
        })
    }

    /// Render a frame to the offscreen texture
    pub fn render(&mut self, scene: &Scene, camera: &Camera) {
        let size = self.size();
        self.renderer
            .prepare(&self.device, &self.queue, scene, camera, size);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Headless Render Encoder"),
        });
        self.renderer
            .draw(&mut encoder, &self.target.view, &self.target.depth_view);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Render a frame and return the pixel data as RGBA bytes
    ///
    /// Returns a Vec<u8> with length width * height * 4, or an empty
    /// vector if the readback fails
    pub fn render_to_buffer(&mut self, scene: &Scene, camera: &Camera) -> Vec<u8> {
        self.render(scene, camera);

        let (width, height) = self.size();
        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
        let buffer_size = (padded_bytes_per_row * height) as u64;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Headless Staging Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Headless Copy Encoder"),
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        if !matches!(rx.recv(), Ok(Ok(()))) {
            log::warn!("Headless readback failed");
            return Vec::new();
        }

        // Read data and remove row padding
        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            let end = start + (width * bytes_per_pixel) as usize;
            pixels.extend_from_slice(&data[start..end]);
        }

        drop(data);
        staging_buffer.unmap();

        pixels
    }

    /// Render a frame and save it as a PNG
    pub fn capture<P: AsRef<Path>>(
        &mut self,
        path: P,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(), ExportError> {
        let pixels = self.render_to_buffer(scene, camera);
        let (width, height) = self.size();
        export_frame(path.as_ref(), width, height, &pixels)?;
        log::info!("Saved: {}", path.as_ref().display());
        Ok(())
    }

    /// Get render dimensions
    pub fn size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    /// Whether the environment map has reached the GPU
    pub fn has_environment(&self) -> bool {
        self.renderer.has_environment()
    }

    /// Number of text labels uploaded
    pub fn label_count(&self) -> usize {
        self.renderer.label_count()
    }

    /// Number of bubble instances drawn by the last render
    pub fn bubble_count(&self) -> u32 {
        self.renderer.bubble_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_pipeline_creation() {
        // May fail on systems without GPU, which is acceptable for unit tests
        if let Some(pipeline) = pollster::block_on(HeadlessRenderPipeline::new(256, 128)) {
            assert_eq!(pipeline.size(), (256, 128));
            assert!(!pipeline.has_environment());
            assert_eq!(pipeline.label_count(), 0);
        }
    }

    #[test]
    fn test_zero_size_target_is_clamped() {
        if let Some(pipeline) = pollster::block_on(HeadlessRenderPipeline::new(0, 0)) {
            assert_eq!(pipeline.size(), (1, 1));
        }
    }
}
