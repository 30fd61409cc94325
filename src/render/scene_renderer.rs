//! Draws a [`Scene`] into a color + depth target
//!
//! Shared by the windowed and the headless pipelines. [`SceneRenderer::prepare`]
//! uploads whatever changed in the scene since the last frame (newly loaded
//! assets, material edits, bubble positions). [`SceneRenderer::draw`] first
//! renders the background and text into the transmission texture, then draws
//! them again into the target with the bubbles on top, refracting that copy.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::camera::Camera;
use super::gpu_mesh::{GpuMesh, MeshInstance};
use super::iridescence_lut::{
    generate_iridescence_lut, LutKey, LUT_ANGLE_SAMPLES, LUT_MAX_THICKNESS_NM,
    LUT_THICKNESS_SAMPLES,
};
use super::textures::{self, DEPTH_FORMAT};
use super::transmission::TransmissionPass;
use crate::geometry::Vertex;
use crate::scene::{Bubble, PhysicalMaterial, Scene, BUBBLE_COUNT};

const COMMON_SHADER: &str = include_str!("shaders/common.wgsl");

/// Bubble material uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    pub roughness: f32,
    pub metalness: f32,
    pub iridescence: f32,
    pub iridescence_ior: f32,
    /// Film thickness in nanometers
    pub film_thickness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub thickness: f32,
    /// Thickness covered by the LUT's X axis
    pub lut_max_thickness: f32,
    pub _padding: [f32; 3],
}

impl From<&PhysicalMaterial> for MaterialUniform {
    fn from(material: &PhysicalMaterial) -> Self {
        Self {
            roughness: material.roughness,
            metalness: material.metalness,
            iridescence: material.iridescence,
            iridescence_ior: material.iridescence_ior,
            film_thickness: material.film_thickness(),
            transmission: material.transmission,
            ior: material.ior,
            thickness: material.thickness,
            lut_max_thickness: LUT_MAX_THICKNESS_NM,
            _padding: [0.0; 3],
        }
    }
}

/// Instances for the bubbles that can cover a pixel; a zero scale
/// collapses the sphere and is left out
pub fn bubble_instances(bubbles: &[Bubble]) -> Vec<MeshInstance> {
    bubbles
        .iter()
        .take(BUBBLE_COUNT)
        .filter(|bubble| bubble.transform.scale.min_element() > 0.0)
        .map(|bubble| MeshInstance::from_transform(&bubble.transform))
        .collect()
}

/// A text label uploaded to the GPU
struct LabelMesh {
    mesh: GpuMesh,
    instance: u32,
}

pub struct SceneRenderer {
    camera_buffer: wgpu::Buffer,
    globals_layout: wgpu::BindGroupLayout,
    globals_bind_group: wgpu::BindGroup,
    env_sampler: wgpu::Sampler,
    env_max_lod: f32,
    environment_uploaded: bool,

    background_pipeline: wgpu::RenderPipeline,

    bubble_pipeline: wgpu::RenderPipeline,
    material_buffer: wgpu::Buffer,
    lut_texture: wgpu::Texture,
    lut_key: LutKey,
    material_bind_group: wgpu::BindGroup,
    uploaded_material: Option<PhysicalMaterial>,
    sphere: Option<GpuMesh>,
    bubble_instances: wgpu::Buffer,
    bubble_count: u32,
    transmission: TransmissionPass,

    text_pipeline: wgpu::RenderPipeline,
    matcap_layout: wgpu::BindGroupLayout,
    matcap_bind_group: wgpu::BindGroup,
    matcap_sampler: wgpu::Sampler,
    matcap_uploaded: bool,
    labels: Vec<LabelMesh>,
    label_instances: Option<wgpu::Buffer>,
    labels_uploaded: bool,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[super::camera::CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bind_group_layout"),
            entries: &[
                textures::uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ),
                textures::texture_entry(1),
                textures::sampler_entry(2),
            ],
        });

        let env_sampler = textures::create_environment_sampler(device);
        let placeholder_env = textures::create_placeholder_environment(device, queue);
        let globals_bind_group = Self::create_globals_bind_group(
            device,
            &globals_layout,
            &camera_buffer,
            &placeholder_env,
            &env_sampler,
        );

        // Bubble material: uniform + thin-film LUT
        let material = PhysicalMaterial::bubble();
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Buffer"),
            contents: bytemuck::cast_slice(&[MaterialUniform::from(&material)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let lut_key = LutKey {
            film_ior: material.iridescence_ior,
            base_ior: material.ior,
        };
        let lut_texture = textures::create_rgba8_texture(
            device,
            queue,
            "Iridescence LUT Texture",
            LUT_THICKNESS_SAMPLES,
            LUT_ANGLE_SAMPLES,
            wgpu::TextureFormat::Rgba8Unorm,
            &generate_iridescence_lut(lut_key),
        );
        let lut_sampler = textures::create_linear_sampler(device, "Iridescence LUT Sampler");

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                textures::uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                textures::texture_entry(1),
                textures::sampler_entry(2),
            ],
        });
        let lut_view = lut_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: material_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&lut_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&lut_sampler),
                },
            ],
        });

        // Text: matcap texture, white until the real one arrives
        let matcap_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("matcap_bind_group_layout"),
            entries: &[textures::texture_entry(0), textures::sampler_entry(1)],
        });
        let matcap_sampler = textures::create_linear_sampler(device, "Matcap Sampler");
        let placeholder_matcap = textures::create_rgba8_texture(
            device,
            queue,
            "Placeholder Matcap Texture",
            1,
            1,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            &[255, 255, 255, 255],
        );
        let matcap_bind_group =
            Self::create_matcap_bind_group(device, &matcap_layout, &placeholder_matcap, &matcap_sampler);

        let bubble_instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Bubble Instance Buffer"),
            size: (BUBBLE_COUNT * std::mem::size_of::<MeshInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let transmission = TransmissionPass::new(device, color_format);

        let background_pipeline = Self::create_pipeline(
            device,
            "Background",
            include_str!("shaders/background.wgsl"),
            &[&globals_layout],
            &[],
            color_format,
            false,
        );
        let bubble_pipeline = Self::create_pipeline(
            device,
            "Bubble",
            include_str!("shaders/bubble.wgsl"),
            &[&globals_layout, &material_layout, transmission.layout()],
            &[Vertex::buffer_layout(), MeshInstance::buffer_layout()],
            color_format,
            true,
        );
        let text_pipeline = Self::create_pipeline(
            device,
            "Text",
            include_str!("shaders/text.wgsl"),
            &[&globals_layout, &matcap_layout],
            &[Vertex::buffer_layout(), MeshInstance::buffer_layout()],
            color_format,
            true,
        );

        Self {
            camera_buffer,
            globals_layout,
            globals_bind_group,
            env_sampler,
            env_max_lod: 0.0,
            environment_uploaded: false,
            background_pipeline,
            bubble_pipeline,
            material_buffer,
            lut_texture,
            lut_key,
            material_bind_group,
            uploaded_material: Some(material),
            sphere: None,
            bubble_instances,
            bubble_count: 0,
            transmission,
            text_pipeline,
            matcap_layout,
            matcap_bind_group,
            matcap_sampler,
            matcap_uploaded: false,
            labels: Vec::new(),
            label_instances: None,
            labels_uploaded: false,
        }
    }

    fn create_globals_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera_buffer: &wgpu::Buffer,
        env_texture: &wgpu::Texture,
        env_sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let env_view = env_texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&env_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(env_sampler),
                },
            ],
        })
    }

    fn create_matcap_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &wgpu::Texture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("matcap_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        name: &str,
        source: &str,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        buffers: &[wgpu::VertexBufferLayout<'_>],
        color_format: wgpu::TextureFormat,
        depth_write: bool,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Shader", name)),
            source: wgpu::ShaderSource::Wgsl(format!("{}\n{}", COMMON_SHADER, source).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", name)),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline", name)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // The background never writes depth and always passes
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: depth_write,
                depth_compare: if depth_write {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    /// Upload everything the next draw into a `target_size` target needs
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        camera: &Camera,
        target_size: (u32, u32),
    ) {
        self.transmission.resize(device, target_size.0, target_size.1);
        self.sync_environment(device, queue, scene);
        self.sync_matcap(device, queue, scene);
        self.sync_labels(device, scene);
        self.sync_material(queue, scene);
        self.sync_bubbles(device, queue, scene);

        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera.uniform(self.env_max_lod)]),
        );
    }

    fn sync_environment(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        if self.environment_uploaded {
            return;
        }
        let Some(environment) = &scene.environment else {
            return;
        };

        let max_dimension = device.limits().max_texture_dimension_2d;
        let levels = environment.levels_within(max_dimension);
        let Some(top) = levels.first() else {
            log::warn!("Environment map has no mip levels, keeping the placeholder");
            self.environment_uploaded = true;
            return;
        };
        if top.width != environment.width() || top.height != environment.height() {
            log::warn!(
                "Environment map {}x{} exceeds the {} texel limit, uploading from {}x{}",
                environment.width(),
                environment.height(),
                max_dimension,
                top.width,
                top.height
            );
        }

        let texture = textures::create_environment_texture(device, queue, levels);
        self.globals_bind_group = Self::create_globals_bind_group(
            device,
            &self.globals_layout,
            &self.camera_buffer,
            &texture,
            &self.env_sampler,
        );
        self.env_max_lod = levels.len().saturating_sub(1) as f32;
        self.environment_uploaded = true;
        log::debug!("Environment uploaded with max lod {}", self.env_max_lod);
    }

    fn sync_matcap(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        if self.matcap_uploaded {
            return;
        }
        let Some(loaded) = &scene.matcap else {
            return;
        };

        let max_dimension = device.limits().max_texture_dimension_2d;
        let Some(matcap) = loaded.fit_within(max_dimension) else {
            log::warn!(
                "Matcap pixel data does not match {}x{}, keeping the placeholder",
                loaded.width,
                loaded.height
            );
            self.matcap_uploaded = true;
            return;
        };
        if matcap.width != loaded.width || matcap.height != loaded.height {
            log::warn!(
                "Matcap {}x{} exceeds the {} texel limit, scaled to {}x{}",
                loaded.width,
                loaded.height,
                max_dimension,
                matcap.width,
                matcap.height
            );
        }

        let texture = textures::create_rgba8_texture(
            device,
            queue,
            "Matcap Texture",
            matcap.width,
            matcap.height,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            &matcap.pixels,
        );
        self.matcap_bind_group =
            Self::create_matcap_bind_group(device, &self.matcap_layout, &texture, &self.matcap_sampler);
        self.matcap_uploaded = true;
    }

    fn sync_labels(&mut self, device: &wgpu::Device, scene: &Scene) {
        if self.labels_uploaded || scene.labels.is_empty() {
            return;
        }

        let instances: Vec<MeshInstance> = scene
            .labels
            .iter()
            .map(|label| MeshInstance::from_transform(&label.transform))
            .collect();
        self.label_instances = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Label Instance Buffer"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.labels = scene
            .labels
            .iter()
            .enumerate()
            .filter_map(|(index, label)| {
                GpuMesh::new(device, "Label", &label.mesh).map(|mesh| LabelMesh {
                    mesh,
                    instance: index as u32,
                })
            })
            .collect();
        self.labels_uploaded = true;
    }

    fn sync_material(&mut self, queue: &wgpu::Queue, scene: &Scene) {
        let Some(material) = scene.bubble_material() else {
            return;
        };
        if self.uploaded_material.as_ref() == Some(material) {
            return;
        }

        queue.write_buffer(
            &self.material_buffer,
            0,
            bytemuck::cast_slice(&[MaterialUniform::from(material)]),
        );

        let key = LutKey {
            film_ior: material.iridescence_ior,
            base_ior: material.ior,
        };
        if key != self.lut_key {
            textures::write_rgba8_texture(
                queue,
                &self.lut_texture,
                LUT_THICKNESS_SAMPLES,
                LUT_ANGLE_SAMPLES,
                &generate_iridescence_lut(key),
            );
            self.lut_key = key;
        }

        self.uploaded_material = Some(*material);
    }

    fn sync_bubbles(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        if scene.bubbles.is_empty() {
            self.bubble_count = 0;
            return;
        }
        if self.sphere.is_none() {
            self.sphere = GpuMesh::new(device, "Bubble Sphere", &scene.bubble_mesh.mesh);
        }

        let instances = bubble_instances(&scene.bubbles);
        if !instances.is_empty() {
            queue.write_buffer(&self.bubble_instances, 0, bytemuck::cast_slice(&instances));
        }
        self.bubble_count = instances.len() as u32;
    }

    /// Record the scene into `color_view` / `depth_view`, clearing both.
    /// Both must match the size passed to the last [`Self::prepare`].
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) {
        let bubbles = self.bubble_draw();

        if bubbles.is_some() {
            if let Some(opaque_view) = self.transmission.view() {
                let mut render_pass =
                    Self::begin_scene_pass(encoder, "Transmission Render Pass", opaque_view, depth_view);
                self.draw_opaque(&mut render_pass);
                drop(render_pass);
                self.transmission.generate_mips(encoder);
            }
        }

        let mut render_pass = Self::begin_scene_pass(encoder, "Scene Render Pass", color_view, depth_view);
        self.draw_opaque(&mut render_pass);

        if let Some((sphere, transmission)) = bubbles {
            render_pass.set_pipeline(&self.bubble_pipeline);
            render_pass.set_bind_group(1, &self.material_bind_group, &[]);
            render_pass.set_bind_group(2, transmission, &[]);
            render_pass.set_vertex_buffer(0, sphere.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.bubble_instances.slice(..));
            render_pass.set_index_buffer(sphere.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..sphere.num_indices, 0, 0..self.bubble_count);
        }
    }

    /// Sphere and transmission bind group, when there are bubbles to draw
    fn bubble_draw(&self) -> Option<(&GpuMesh, &wgpu::BindGroup)> {
        if self.bubble_count == 0 {
            return None;
        }
        Some((self.sphere.as_ref()?, self.transmission.bind_group()?))
    }

    fn begin_scene_pass<'e>(
        encoder: &'e mut wgpu::CommandEncoder,
        label: &str,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }

    /// Background and text
    fn draw_opaque(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_bind_group(0, &self.globals_bind_group, &[]);

        if self.environment_uploaded {
            render_pass.set_pipeline(&self.background_pipeline);
            render_pass.draw(0..3, 0..1);
        }

        if let Some(instances) = &self.label_instances {
            render_pass.set_pipeline(&self.text_pipeline);
            render_pass.set_bind_group(1, &self.matcap_bind_group, &[]);
            render_pass.set_vertex_buffer(1, instances.slice(..));
            for label in &self.labels {
                render_pass.set_vertex_buffer(0, label.mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(label.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..label.mesh.num_indices, 0, label.instance..label.instance + 1);
            }
        }
    }

    pub fn has_environment(&self) -> bool {
        self.environment_uploaded
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn bubble_count(&self) -> u32 {
        self.bubble_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_uniform_size() {
        // 12 floats, 16-byte aligned
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
    }

    #[test]
    fn test_zero_scale_bubbles_are_not_drawn() {
        use crate::scene::{MaterialTable, Transform};
        use glam::Vec3;

        let material = MaterialTable::new().insert(PhysicalMaterial::bubble());
        let bubble = |scale: f32| Bubble {
            transform: Transform {
                scale: Vec3::splat(scale),
                ..Transform::from_position(Vec3::new(scale, 0.0, 0.0))
            },
            material,
        };

        let instances = bubble_instances(&[bubble(0.0), bubble(0.5), bubble(0.0), bubble(0.25)]);
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].model_3, [0.5, 0.0, 0.0, 1.0]);
        assert_eq!(instances[1].model_3, [0.25, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_material_uniform_uses_upper_film_thickness() {
        let uniform = MaterialUniform::from(&PhysicalMaterial::bubble());
        assert_eq!(uniform.film_thickness, 800.0);
        assert_eq!(uniform.lut_max_thickness, LUT_MAX_THICKNESS_NM);
        assert_eq!(uniform.ior, 1.5);
    }
}
