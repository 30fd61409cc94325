//! Vertex layout and CPU-side mesh data shared by every drawable in the scene

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex data for GPU rendering
///
/// Position, normal and UV coordinates. The same layout is used for the
/// bubble sphere and the extruded text.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 3D position of the vertex
    pub position: [f32; 3],
    /// Surface normal (normalized, pointing outward)
    pub normal: [f32; 3],
    /// UV coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex with position, normal, and UV coordinates
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.normalize_or_zero().to_array(),
            uv,
        }
    }

    /// Returns the vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // UV
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// Triangle indices (3 per triangle)
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex and return its index
    pub fn push_vertex(&mut self, vertex: Vertex) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append another mesh, re-basing its indices
    pub fn append(&mut self, other: MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|index| index + base));
    }

    /// Axis-aligned bounds as (min, max), or `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Translate the mesh so its bounding box is centered on the origin
    pub fn center(&mut self) {
        let Some((min, max)) = self.bounding_box() else {
            return;
        };
        let offset = -(min + max) * 0.5;
        for vertex in &mut self.vertices {
            vertex.position = (Vec3::from_array(vertex.position) + offset).to_array();
        }
    }

    /// Get the number of triangles in the mesh
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get vertex data as bytes for GPU buffer creation
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes for GPU buffer creation
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_at(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::new(Vec3::new(x, y, z), Vec3::Z, [0.0, 0.0])
    }

    #[test]
    fn test_vertex_size() {
        // 3*4 + 3*4 + 2*4 = 32 bytes
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn test_center_moves_bounds_to_origin() {
        let mut mesh = MeshData::new();
        mesh.push_vertex(vertex_at(1.0, 2.0, 3.0));
        mesh.push_vertex(vertex_at(5.0, 4.0, 3.5));
        mesh.center();

        let (min, max) = mesh.bounding_box().unwrap();
        assert!((min + max).length() < 1e-6);
        assert!((max - min - Vec3::new(4.0, 2.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_append_rebases_indices() {
        let mut a = MeshData::new();
        for _ in 0..3 {
            a.push_vertex(vertex_at(0.0, 0.0, 0.0));
        }
        a.push_triangle(0, 1, 2);

        let mut b = MeshData::new();
        for _ in 0..3 {
            b.push_vertex(vertex_at(1.0, 1.0, 1.0));
        }
        b.push_triangle(0, 1, 2);

        a.append(b);
        assert_eq!(a.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(a.triangle_count(), 2);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        let mut mesh = MeshData::new();
        assert!(mesh.bounding_box().is_none());
        mesh.center();
        assert!(mesh.is_empty());
    }
}
