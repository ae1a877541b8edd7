//! # Primitive Shape Generation
//!
//! Functions that generate the primitive shapes used by the scene. All
//! shapes come with outward-facing normals and texture coordinates.

use super::GeometryData;

/// Face order used by [`generate_box_faces`]: +X, -X, +Y, -Y, +Z, -Z
pub const BOX_FACE_NORMALS: [[f32; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

/// Horizontal and vertical texture axes of each face as seen from outside
const BOX_FACE_AXES: [([f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

/// Generate the six faces of an axis-aligned box centered at the origin
///
/// Each face is a separate quad so it can carry its own material. Faces are
/// returned in [`BOX_FACE_NORMALS`] order, wound counter-clockwise when seen
/// from outside, with UVs spanning 0..1.
pub fn generate_box_faces(width: f32, height: f32, depth: f32) -> [GeometryData; 6] {
    let half = [width * 0.5, height * 0.5, depth * 0.5];

    std::array::from_fn(|face| {
        let normal = BOX_FACE_NORMALS[face];
        let (u_axis, v_axis) = BOX_FACE_AXES[face];
        let mut data = GeometryData::new();

        let corner = |u: f32, v: f32| -> [f32; 3] {
            std::array::from_fn(|axis| {
                (normal[axis] + (u * 2.0 - 1.0) * u_axis[axis] + (v * 2.0 - 1.0) * v_axis[axis])
                    * half[axis]
            })
        };

        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            data.vertices.push(corner(u, v));
            data.normals.push(normal);
            data.tex_coords.push([u, 1.0 - v]);
        }
        data.indices = vec![0, 1, 2, 2, 3, 0];
        data
    })
}

/// Generate a flat-shaded regular octahedron with the given circumradius
pub fn generate_octahedron(radius: f32) -> GeometryData {
    let mut data = GeometryData::new();

    for sx in [1.0f32, -1.0] {
        for sy in [1.0f32, -1.0] {
            for sz in [1.0f32, -1.0] {
                let a = [sx * radius, 0.0, 0.0];
                let b = [0.0, sy * radius, 0.0];
                let c = [0.0, 0.0, sz * radius];
                let uvs = [[0.0, 0.0], [0.5, 1.0], [1.0, 0.0]];
                if sx * sy * sz > 0.0 {
                    data.push_flat_triangle(a, b, c, uvs);
                } else {
                    data.push_flat_triangle(a, c, b, uvs);
                }
            }
        }
    }

    data
}
