//! Extruded 3D text
//!
//! Glyph outlines from a [`Typeface`] are flattened into closed contours,
//! swept along +Z with an optional rounded bevel, and capped front and back.
//! Caps are triangulated with lyon using the non-zero fill rule so glyph
//! holes (the counter of an "o") stay open. The finished mesh is centered on
//! its bounding box.

use glam::{Vec2, Vec3};
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use std::f32::consts::FRAC_PI_2;

use super::mesh::{MeshData, Vertex};
use crate::assets::typeface::{OutlineCommand, Typeface, TypefaceError};
use crate::config::TextSettings;

/// Points closer than this are merged while flattening
const WELD_DISTANCE_SQUARED: f32 = 1e-10;

/// Longest bevel miter relative to the bevel size, for very sharp corners
const MAX_MITER_SCALE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bevel {
    pub thickness: f32,
    pub size: f32,
    pub offset: f32,
    pub segments: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextGeometryOptions {
    /// Em size in world units
    pub size: f32,
    /// Extrusion depth
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel: Option<Bevel>,
}

impl From<&TextSettings> for TextGeometryOptions {
    fn from(settings: &TextSettings) -> Self {
        let bevel = settings.bevel.enabled.then_some(Bevel {
            thickness: settings.bevel.thickness,
            size: settings.bevel.size,
            offset: settings.bevel.offset,
            segments: settings.bevel.segments,
        });
        Self {
            size: settings.size,
            depth: settings.depth,
            curve_segments: settings.curve_segments,
            bevel,
        }
    }
}

#[derive(Debug)]
pub enum GeometryError {
    Typeface(TypefaceError),
    /// lyon failed to triangulate a cap
    Tessellation(String),
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::Typeface(error) => write!(f, "Failed to lay out text: {}", error),
            GeometryError::Tessellation(msg) => write!(f, "Failed to tessellate text cap: {}", msg),
        }
    }
}

impl std::error::Error for GeometryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeometryError::Typeface(error) => Some(error),
            GeometryError::Tessellation(_) => None,
        }
    }
}

impl From<TypefaceError> for GeometryError {
    fn from(error: TypefaceError) -> Self {
        GeometryError::Typeface(error)
    }
}

/// One cross-section of the extrusion: contours pushed outward by `offset`
/// along their bevel vectors, placed at depth `z`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Layer {
    offset: f32,
    z: f32,
}

/// A flattened closed contour with its per-point bevel directions
struct Contour {
    points: Vec<Vec2>,
    bevel: Vec<Vec2>,
}

impl Contour {
    fn point_at(&self, index: usize, layer: Layer) -> Vec3 {
        let p = self.points[index] + self.bevel[index] * layer.offset;
        Vec3::new(p.x, p.y, layer.z)
    }
}

/// Build the centered, extruded mesh for `text`
pub fn build_text_geometry(
    typeface: &Typeface,
    text: &str,
    options: &TextGeometryOptions,
) -> Result<MeshData, GeometryError> {
    let commands = typeface.layout(text, options.size)?;
    let outlines = flatten_outline(&commands, options.curve_segments);

    let mut mesh = MeshData::new();
    if outlines.is_empty() {
        return Ok(mesh);
    }

    // Fonts wind outer contours one way and holes the other, so the filled
    // side is the same for every contour; the larger outer area decides it.
    let fill_left = outlines.iter().map(|c| signed_area(c)).sum::<f32>() >= 0.0;

    let contours: Vec<Contour> = outlines
        .into_iter()
        .map(|points| {
            let bevel = bevel_vectors(&points, fill_left);
            Contour { points, bevel }
        })
        .collect();

    let layers = extrusion_layers(options);
    let mid_z = options.depth * 0.5;
    let half_extent = (mid_z + options.bevel.map_or(0.0, |b| b.thickness)).max(1e-6);

    for contour in &contours {
        add_side_walls(&mut mesh, contour, &layers, fill_left, mid_z, half_extent);
    }

    if let (Some(&back), Some(&front)) = (layers.first(), layers.last()) {
        add_cap(&mut mesh, &contours, back, -1.0)?;
        add_cap(&mut mesh, &contours, front, 1.0)?;
    }

    mesh.center();
    Ok(mesh)
}

/// Flatten outline commands into closed polygons.
///
/// Every curve becomes `curve_segments` straight segments. Repeated points
/// and a closing point equal to the first are dropped; contours with fewer
/// than three points are discarded.
pub fn flatten_outline(commands: &[OutlineCommand], curve_segments: u32) -> Vec<Vec<Vec2>> {
    let segments = curve_segments.max(1);
    let mut contours = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    let mut cursor = Vec2::ZERO;

    for command in commands {
        match *command {
            OutlineCommand::MoveTo(p) => {
                finish_contour(&mut contours, std::mem::take(&mut current));
                current.push(p);
                cursor = p;
            }
            OutlineCommand::LineTo(p) => {
                current.push(p);
                cursor = p;
            }
            OutlineCommand::QuadTo { control, to } => {
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    current.push(quadratic_point(cursor, control, to, t));
                }
                cursor = to;
            }
            OutlineCommand::CubicTo {
                control1,
                control2,
                to,
            } => {
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    current.push(cubic_point(cursor, control1, control2, to, t));
                }
                cursor = to;
            }
        }
    }
    finish_contour(&mut contours, current);

    contours
}

fn finish_contour(contours: &mut Vec<Vec<Vec2>>, mut points: Vec<Vec2>) {
    points.dedup_by(|a, b| a.distance_squared(*b) < WELD_DISTANCE_SQUARED);
    if points.len() > 1 {
        let first = points[0];
        if points[points.len() - 1].distance_squared(first) < WELD_DISTANCE_SQUARED {
            points.pop();
        }
    }
    if points.len() >= 3 {
        contours.push(points);
    }
}

fn quadratic_point(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    p0 * (k * k) + p1 * (2.0 * k * t) + p2 * (t * t)
}

fn cubic_point(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    p0 * (k * k * k) + p1 * (3.0 * k * k * t) + p2 * (3.0 * k * t * t) + p3 * (t * t * t)
}

/// Shoelace area; positive for counter-clockwise contours (Y up)
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    let twice: f32 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice * 0.5
}

/// Unit normal of the edge a -> b pointing away from the filled side
fn edge_normal(a: Vec2, b: Vec2, fill_left: bool) -> Vec2 {
    let d = (b - a).normalize_or_zero();
    if fill_left {
        Vec2::new(d.y, -d.x)
    } else {
        Vec2::new(-d.y, d.x)
    }
}

/// Per-point miter directions; offsetting every point by `v * s` moves each
/// edge outward by `s`
fn bevel_vectors(points: &[Vec2], fill_left: bool) -> Vec<Vec2> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];

            let n_in = edge_normal(prev, cur, fill_left);
            let n_out = edge_normal(cur, next, fill_left);
            let sum = n_in + n_out;
            if sum.length_squared() < 1e-12 {
                return n_out;
            }
            let dir = sum.normalize();
            let cos = dir.dot(n_out).max(1.0 / MAX_MITER_SCALE);
            dir / cos
        })
        .collect()
}

fn extrusion_layers(options: &TextGeometryOptions) -> Vec<Layer> {
    let Some(bevel) = options.bevel else {
        return vec![
            Layer { offset: 0.0, z: 0.0 },
            Layer {
                offset: 0.0,
                z: options.depth,
            },
        ];
    };

    let segments = bevel.segments.max(1);
    let step = |i: u32| {
        let angle = i as f32 / segments as f32 * FRAC_PI_2;
        (bevel.size * angle.sin() + bevel.offset, bevel.thickness * angle.cos())
    };

    let mut layers = Vec::with_capacity(2 * (segments as usize + 1));
    for i in 0..=segments {
        let (offset, z) = step(i);
        layers.push(Layer { offset, z: -z });
    }
    for i in (0..=segments).rev() {
        let (offset, z) = step(i);
        layers.push(Layer {
            offset,
            z: options.depth + z,
        });
    }
    layers
}

fn add_side_walls(
    mesh: &mut MeshData,
    contour: &Contour,
    layers: &[Layer],
    fill_left: bool,
    mid_z: f32,
    half_extent: f32,
) {
    let n = contour.points.len();

    for pair in layers.windows(2) {
        let (near, far) = (pair[0], pair[1]);
        if near == far {
            continue;
        }
        let z_bias = ((near.z + far.z) * 0.5 - mid_z) / half_extent;

        for j in 0..n {
            let k = (j + 1) % n;
            let p0 = contour.point_at(j, near);
            let p1 = contour.point_at(k, near);
            let p2 = contour.point_at(k, far);
            let p3 = contour.point_at(j, far);

            let outward = edge_normal(contour.points[j], contour.points[k], fill_left);
            let reference = Vec3::new(outward.x, outward.y, z_bias);

            let mut normal = (p1 - p0).cross(p3 - p0).normalize_or_zero();
            if normal == Vec3::ZERO {
                normal = (p2 - p0).cross(p3 - p1).normalize_or_zero();
            }
            let flipped = normal.dot(reference) < 0.0;
            if flipped {
                normal = -normal;
            }
            if normal == Vec3::ZERO {
                normal = reference.normalize_or_zero();
            }

            let base = mesh.vertices.len() as u32;
            for p in [p0, p1, p2, p3] {
                mesh.push_vertex(Vertex::new(p, normal, [p.x + p.y, p.z]));
            }
            if flipped {
                mesh.push_triangle(base, base + 2, base + 1);
                mesh.push_triangle(base, base + 3, base + 2);
            } else {
                mesh.push_triangle(base, base + 1, base + 2);
                mesh.push_triangle(base, base + 2, base + 3);
            }
        }
    }
}

fn add_cap(
    mesh: &mut MeshData,
    contours: &[Contour],
    layer: Layer,
    facing: f32,
) -> Result<(), GeometryError> {
    let mut builder = Path::builder();
    for contour in contours {
        let first = contour.point_at(0, layer);
        builder.begin(point(first.x, first.y));
        for i in 1..contour.points.len() {
            let p = contour.point_at(i, layer);
            builder.line_to(point(p.x, p.y));
        }
        builder.end(true);
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let options = FillOptions::default().with_fill_rule(FillRule::NonZero);
    FillTessellator::new()
        .tessellate_path(
            &path,
            &options,
            &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| {
                vertex.position().to_array()
            }),
        )
        .map_err(|error| GeometryError::Tessellation(format!("{:?}", error)))?;

    let base = mesh.vertices.len() as u32;
    let normal = Vec3::Z * facing;
    for [x, y] in buffers.vertices {
        mesh.push_vertex(Vertex::new(Vec3::new(x, y, layer.z), normal, [x, y]));
    }

    for tri in buffers.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] + base, tri[1] + base, tri[2] + base);
        if facing > 0.0 {
            mesh.push_triangle(a, b, c);
        } else {
            mesh.push_triangle(a, c, b);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_FONT: &str = r#"{
        "familyName": "Box",
        "resolution": 1000,
        "boundingBox": { "xMin": 0, "xMax": 1000, "yMin": 0, "yMax": 1000 },
        "glyphs": {
            "o": { "ha": 1200,
                   "o": "m 0 0 l 1000 0 l 1000 1000 l 0 1000 z m 250 250 l 250 750 l 750 750 l 750 250 z" },
            "c": { "ha": 1000, "o": "m 0 0 q 1000 0 500 -500 q 0 0 500 500 z" },
            " ": { "ha": 300 }
        }
    }"#;

    fn font() -> Typeface {
        Typeface::from_json(BOX_FONT).unwrap()
    }

    fn flat_options() -> TextGeometryOptions {
        TextGeometryOptions {
            size: 1.0,
            depth: 0.2,
            curve_segments: 12,
            bevel: None,
        }
    }

    #[test]
    fn test_flatten_splits_contours_and_drops_closing_point() {
        let commands = font().layout("o", 1.0).unwrap();
        let contours = flatten_outline(&commands, 12);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].len(), 4);
        assert_eq!(contours[1].len(), 4);
    }

    #[test]
    fn test_flatten_curves_use_segment_count() {
        let commands = font().layout("c", 1.0).unwrap();
        let contours = flatten_outline(&commands, 12);
        assert_eq!(contours.len(), 1);
        // Start point + 12 points per curve, closing point welded to start
        assert_eq!(contours[0].len(), 1 + 12 + 12 - 1);
    }

    #[test]
    fn test_outer_and_hole_have_opposite_winding() {
        let commands = font().layout("o", 1.0).unwrap();
        let contours = flatten_outline(&commands, 12);
        let outer = signed_area(&contours[0]);
        let hole = signed_area(&contours[1]);
        assert!(outer > 0.0);
        assert!(hole < 0.0);
        assert!((outer - 1.0).abs() < 1e-5);
        assert!((hole + 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_geometry_is_centered() {
        let mesh = build_text_geometry(&font(), "o", &flat_options()).unwrap();
        let (min, max) = mesh.bounding_box().unwrap();
        assert!((min + max).length() < 1e-5);
        assert!((max.z - min.z - 0.2).abs() < 1e-5);
        assert!((max.x - min.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_caps_leave_hole_open() {
        let mesh = build_text_geometry(&font(), "o", &flat_options()).unwrap();
        // The glyph center (0.5, 0.5) sits at the origin after centering and
        // must not be covered by any front-cap triangle.
        let front: Vec<&Vertex> = mesh
            .vertices
            .iter()
            .filter(|v| v.normal[2] > 0.99)
            .collect();
        assert!(!front.is_empty());

        let covers_origin = mesh.indices.chunks_exact(3).any(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            if a.normal[2] < 0.99 {
                return false;
            }
            point_in_triangle(Vec2::ZERO, a, b, c)
        });
        assert!(!covers_origin, "Front cap should not fill the glyph hole");
    }

    fn point_in_triangle(p: Vec2, a: Vertex, b: Vertex, c: Vertex) -> bool {
        let [a, b, c] = [a, b, c].map(|v| Vec2::new(v.position[0], v.position[1]));
        let d1 = (p - b).perp_dot(a - b);
        let d2 = (p - c).perp_dot(b - c);
        let d3 = (p - a).perp_dot(c - a);
        let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
        let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
        !(has_neg && has_pos)
    }

    #[test]
    fn test_side_wall_normals_point_outward() {
        let mesh = build_text_geometry(&font(), "o", &flat_options()).unwrap();
        // Outer wall on the left edge (x = -0.5 after centering) faces -X
        let left_wall = mesh
            .vertices
            .iter()
            .filter(|v| v.normal[1].abs() < 1e-3 && v.normal[2].abs() < 1e-3)
            .filter(|v| (v.position[0] + 0.5).abs() < 1e-5)
            .collect::<Vec<_>>();
        assert!(!left_wall.is_empty());
        assert!(left_wall.iter().all(|v| v.normal[0] < -0.99));

        // Hole wall on x = -0.25 faces +X, into the hole
        let hole_wall = mesh
            .vertices
            .iter()
            .filter(|v| v.normal[1].abs() < 1e-3 && v.normal[2].abs() < 1e-3)
            .filter(|v| (v.position[0] + 0.25).abs() < 1e-5)
            .collect::<Vec<_>>();
        assert!(!hole_wall.is_empty());
        assert!(hole_wall.iter().all(|v| v.normal[0] > 0.99));
    }

    #[test]
    fn test_bevel_grows_outline_and_depth() {
        let options = TextGeometryOptions {
            bevel: Some(Bevel {
                thickness: 0.03,
                size: 0.02,
                offset: 0.0,
                segments: 5,
            }),
            ..flat_options()
        };
        let mesh = build_text_geometry(&font(), "o", &options).unwrap();
        let (min, max) = mesh.bounding_box().unwrap();
        assert!((max.x - min.x - 1.04).abs() < 1e-4);
        assert!((max.z - min.z - 0.26).abs() < 1e-4);
    }

    #[test]
    fn test_bevel_layer_profile() {
        let options = TextGeometryOptions {
            bevel: Some(Bevel {
                thickness: 0.03,
                size: 0.02,
                offset: 0.0,
                segments: 5,
            }),
            ..flat_options()
        };
        let layers = extrusion_layers(&options);
        assert_eq!(layers.len(), 12);
        assert!((layers[0].z + 0.03).abs() < 1e-6);
        assert!(layers[0].offset.abs() < 1e-6);
        assert!((layers[5].offset - 0.02).abs() < 1e-6);
        assert!(layers[5].z.abs() < 1e-6);
        assert!((layers[6].z - 0.2).abs() < 1e-6);
        assert!((layers[11].z - 0.23).abs() < 1e-6);
    }

    #[test]
    fn test_blank_text_is_empty() {
        let mesh = build_text_geometry(&font(), "  ", &flat_options()).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_options_from_settings() {
        let options = TextGeometryOptions::from(&TextSettings::default());
        assert!((options.size - 0.5).abs() < f32::EPSILON);
        assert!((options.depth - 0.2).abs() < f32::EPSILON);
        assert_eq!(options.curve_segments, 12);
        let bevel = options.bevel.unwrap();
        assert_eq!(bevel.segments, 5);
        assert!((bevel.thickness - 0.03).abs() < f32::EPSILON);
    }
}
