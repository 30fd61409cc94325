//! Opaque-scene copy sampled by transmissive bubbles
//!
//! The background and the text are drawn into a mip-mapped color texture
//! before the bubbles. Each level is a 2x downsample of the level above it,
//! so rough bubbles blur what they refract by reading a coarser level.

use super::textures;

/// Levels down to 1x1 for a `width` x `height` texture
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

struct TransmissionTexture {
    /// Render view of each mip level
    level_views: Vec<wgpu::TextureView>,
    /// Entry `i` reads level `i` while level `i + 1` is written
    downsample_bind_groups: Vec<wgpu::BindGroup>,
    /// Full mip chain, read by the bubble shader
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

pub struct TransmissionPass {
    format: wgpu::TextureFormat,
    downsample_pipeline: wgpu::RenderPipeline,
    downsample_layout: wgpu::BindGroupLayout,
    downsample_sampler: wgpu::Sampler,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    texture: Option<TransmissionTexture>,
}

impl TransmissionPass {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let downsample_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transmission_downsample_bind_group_layout"),
            entries: &[textures::texture_entry(0), textures::sampler_entry(1)],
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transmission_bind_group_layout"),
            entries: &[textures::texture_entry(0), textures::sampler_entry(1)],
        });

        let downsample_sampler =
            textures::create_linear_sampler(device, "Transmission Downsample Sampler");
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Transmission Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Transmission Downsample Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Transmission Downsample Pipeline Layout"),
            bind_group_layouts: &[&downsample_layout],
            push_constant_ranges: &[],
        });
        let downsample_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Transmission Downsample Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            format,
            downsample_pipeline,
            downsample_layout,
            downsample_sampler,
            layout,
            sampler,
            texture: None,
        }
    }

    /// Layout of the bind group the bubble pipeline reads
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Match the scene target size, recreating the texture when it changed
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.size() == Some((width, height)) {
            return;
        }

        let mip_level_count = mip_level_count(width, height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Transmission Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let level_views: Vec<wgpu::TextureView> = (0..mip_level_count)
            .map(|level| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Transmission Level View"),
                    base_mip_level: level,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let downsample_bind_groups = level_views
            .iter()
            .take(level_views.len().saturating_sub(1))
            .map(|source| {
                Self::create_bind_group(
                    device,
                    "transmission_downsample_bind_group",
                    &self.downsample_layout,
                    source,
                    &self.downsample_sampler,
                )
            })
            .collect();

        let full_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = Self::create_bind_group(
            device,
            "transmission_bind_group",
            &self.layout,
            &full_view,
            &self.sampler,
        );

        log::debug!(
            "Transmission texture {}x{} with {} levels",
            width,
            height,
            mip_level_count
        );
        self.texture = Some(TransmissionTexture {
            level_views,
            downsample_bind_groups,
            bind_group,
            width,
            height,
        });
    }

    fn create_bind_group(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.texture.as_ref().map(|t| (t.width, t.height))
    }

    /// Render view of the top level
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.texture.as_ref().and_then(|t| t.level_views.first())
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.texture.as_ref().map(|t| &t.bind_group)
    }

    /// Fill every level below the top one from the level above it
    pub fn generate_mips(&self, encoder: &mut wgpu::CommandEncoder) {
        let Some(texture) = &self.texture else {
            return;
        };

        for (source, target) in texture
            .downsample_bind_groups
            .iter()
            .zip(texture.level_views.iter().skip(1))
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Transmission Downsample Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.downsample_pipeline);
            render_pass.set_bind_group(0, source, &[]);
            render_pass.draw(0..3, 0..1);
        }
    }
}
