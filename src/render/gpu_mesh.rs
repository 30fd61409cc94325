//! GPU-side meshes and per-instance transforms

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::geometry::MeshData;
use crate::scene::Transform;

/// Per-instance model matrix, fed as a vertex buffer stepped per instance
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshInstance {
    /// Model matrix column 0
    pub model_0: [f32; 4],
    /// Model matrix column 1
    pub model_1: [f32; 4],
    /// Model matrix column 2
    pub model_2: [f32; 4],
    /// Model matrix column 3
    pub model_3: [f32; 4],
}

impl MeshInstance {
    pub fn from_matrix(model: Mat4) -> Self {
        // WGSL mat4x4 constructor takes COLUMNS, so we pass columns not rows
        Self {
            model_0: model.col(0).to_array(),
            model_1: model.col(1).to_array(),
            model_2: model.col(2).to_array(),
            model_3: model.col(3).to_array(),
        }
    }

    pub fn from_transform(transform: &Transform) -> Self {
        Self::from_matrix(transform.matrix())
    }

    /// Returns the vertex buffer layout for instance data.
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 32,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 48,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Vertex and index buffers for one mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl GpuMesh {
    /// Upload a mesh; returns `None` for an empty mesh
    pub fn new(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Option<Self> {
        if mesh.is_empty() {
            return None;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: mesh.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        Some(Self {
            vertex_buffer,
            index_buffer,
            num_indices: mesh.indices.len() as u32,
        })
    }
}
