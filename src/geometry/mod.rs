//! CPU-side geometry: the shared vertex layout, the bubble sphere and
//! extruded text

pub mod mesh;
pub mod sphere;
pub mod text;

pub use mesh::{MeshData, Vertex};
pub use sphere::SphereMesh;
pub use text::{build_text_geometry, Bevel, GeometryError, TextGeometryOptions};
