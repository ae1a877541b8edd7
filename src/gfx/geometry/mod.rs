//! # Procedural Geometry Generation
//!
//! CPU-side geometry: primitive shapes, bounding boxes, polygon
//! triangulation and extruded glyph meshes. Everything here is plain data
//! and independent of the GPU; meshes are uploaded later by the scene.
//!
//! ## Usage
//!
//! ```rust
//! use techno_room::gfx::geometry::{generate_octahedron, Aabb};
//!
//! let crystal = generate_octahedron(0.3);
//! let bounds: Aabb = crystal.bounds();
//! assert!(bounds.max_dimension() > 0.59);
//! ```

pub mod bounds;
pub mod primitives;
pub mod text;
pub mod triangulate;

pub use bounds::Aabb;
pub use primitives::*;

use crate::gfx::scene::vertex::Vertex3D;

/// Represents generated geometry data ready for GPU upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    /// Create a new empty geometry data structure
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of vertices in this geometry
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles in this geometry
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounds of all vertex positions
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Pushes a triangle with its own three vertices and a shared face normal
    pub fn push_flat_triangle(&mut self, a: [f32; 3], b: [f32; 3], c: [f32; 3], uvs: [[f32; 2]; 3]) {
        let normal = face_normal(a, b, c);
        let base = self.vertices.len() as u32;
        for (position, uv) in [a, b, c].into_iter().zip(uvs) {
            self.vertices.push(position);
            self.normals.push(normal);
            self.tex_coords.push(uv);
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Convert to the vertex format used by the renderer
    pub fn to_scene_format(&self) -> (Vec<Vertex3D>, Vec<u32>) {
        let vertices: Vec<Vertex3D> = (0..self.vertices.len())
            .map(|i| Vertex3D {
                position: self.vertices[i],
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                tex_coords: self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect();

        (vertices, self.indices.clone())
    }
}

/// Unit normal of a counter-clockwise triangle; zero for degenerate input
pub fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let edge1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let edge2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        edge1[1] * edge2[2] - edge1[2] * edge2[1],
        edge1[2] * edge2[0] - edge1[0] * edge2[2],
        edge1[0] * edge2[1] - edge1[1] * edge2[0],
    ];
    let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if length > f32::EPSILON {
        [n[0] / length, n[1] / length, n[2] / length]
    } else {
        [0.0, 0.0, 0.0]
    }
}

/// Averages face normals into per-vertex normals for meshes shipped without them
pub fn calculate_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let n = face_normal(positions[i0], positions[i1], positions[i2]);
        for &vertex_idx in &[i0, i1, i2] {
            for axis in 0..3 {
                normals[vertex_idx][axis] += n[axis];
            }
        }
    }

    for normal in normals.iter_mut() {
        let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        if length > 0.0 {
            normal.iter_mut().for_each(|c| *c /= length);
        } else {
            *normal = [0.0, 1.0, 0.0];
        }
    }

    normals
}
