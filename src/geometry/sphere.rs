//! UV sphere generation for the bubble mesh

use glam::Vec3;
use std::f32::consts::PI;

use super::mesh::{MeshData, Vertex};

/// Sphere mesh shared by every bubble instance
pub struct SphereMesh {
    pub mesh: MeshData,
    /// Radius of the sphere
    pub radius: f32,
    /// Segments around the Y axis
    pub width_segments: u32,
    /// Segments from pole to pole
    pub height_segments: u32,
}

impl SphereMesh {
    /// Create a new UV sphere mesh
    ///
    /// # Arguments
    /// * `radius` - Radius of the sphere
    /// * `width_segments` - Longitude divisions (minimum 3)
    /// * `height_segments` - Latitude divisions (minimum 2)
    pub fn new(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mesh = Self::generate_uv_sphere(radius, width_segments, height_segments);

        Self {
            mesh,
            radius,
            width_segments,
            height_segments,
        }
    }

    /// The bubble sphere: radius 0.5, 32 x 32 segments
    pub fn bubble() -> Self {
        Self::new(0.5, 32, 32)
    }

    /// Generate a UV sphere mesh (latitude/longitude grid)
    fn generate_uv_sphere(radius: f32, lon_segments: u32, lat_segments: u32) -> MeshData {
        let mut mesh = MeshData::new();

        for lat in 0..=lat_segments {
            let theta = (lat as f32 / lat_segments as f32) * PI; // 0 to PI (top to bottom)
            let sin_theta = theta.sin();
            let cos_theta = theta.cos();

            for lon in 0..=lon_segments {
                let phi = (lon as f32 / lon_segments as f32) * 2.0 * PI;

                // Position on unit sphere
                let x = -phi.cos() * sin_theta;
                let y = cos_theta;
                let z = phi.sin() * sin_theta;

                let normal = Vec3::new(x, y, z);
                let uv = [lon as f32 / lon_segments as f32, lat as f32 / lat_segments as f32];

                mesh.push_vertex(Vertex::new(normal * radius, normal, uv));
            }
        }

        for lat in 0..lat_segments {
            for lon in 0..lon_segments {
                let current = lat * (lon_segments + 1) + lon;
                let next = current + lon_segments + 1;

                // Two triangles per quad (skip degenerate triangles at poles)
                if lat != 0 {
                    mesh.push_triangle(current, next, current + 1);
                }

                if lat != lat_segments - 1 {
                    mesh.push_triangle(current + 1, next, next + 1);
                }
            }
        }

        mesh
    }

    /// Get the number of triangles in the mesh
    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    /// Get the number of vertices in the mesh
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubble_sphere_dimensions() {
        let sphere = SphereMesh::bubble();
        assert_eq!(sphere.vertex_count(), 33 * 33);
        // 32 * 32 quads, one triangle dropped per quad in the polar rows
        assert_eq!(sphere.triangle_count(), 2 * 32 * 32 - 2 * 32);
    }

    #[test]
    fn test_vertices_on_sphere() {
        let radius = 2.5;
        let sphere = SphereMesh::new(radius, 24, 16);

        for vertex in &sphere.mesh.vertices {
            let distance = Vec3::from_array(vertex.position).length();
            assert!(
                (distance - radius).abs() < 1e-5,
                "Vertex not on sphere: distance = {}, expected = {}",
                distance,
                radius
            );
        }
    }

    #[test]
    fn test_normals_point_outward() {
        let sphere = SphereMesh::new(1.0, 16, 8);

        for vertex in &sphere.mesh.vertices {
            let pos = Vec3::from_array(vertex.position);
            let normal = Vec3::from_array(vertex.normal);

            assert!((normal.length() - 1.0).abs() < 1e-5, "Normal not normalized");
            assert!(pos.normalize().dot(normal) > 0.99, "Normal not pointing outward");
        }
    }

    #[test]
    fn test_indices_in_range() {
        let sphere = SphereMesh::bubble();
        let count = sphere.vertex_count() as u32;
        assert!(sphere.mesh.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn test_segment_minimums() {
        let sphere = SphereMesh::new(1.0, 0, 0);
        assert_eq!(sphere.width_segments, 3);
        assert_eq!(sphere.height_segments, 2);
        assert!(sphere.triangle_count() > 0);
    }
}
