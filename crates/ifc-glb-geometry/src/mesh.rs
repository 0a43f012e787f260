// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle mesh buffers

use nalgebra::{Matrix4, Point3, Vector3};

/// Indexed triangle mesh with flat buffers
///
/// Positions and normals are `[x, y, z, ...]`; indices are triangle lists.
/// Normals may be left empty until [`Mesh::compute_normals`] is called.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<f32>,
    /// Vertex normals, empty or one per vertex
    pub normals: Vec<f32>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mesh with room for `vertices` vertices and `triangles` triangles
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices * 3),
            normals: Vec::new(),
            indices: Vec::with_capacity(triangles * 3),
        }
    }

    /// Number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True if the mesh has nothing to draw
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Append a vertex, returning its index
    #[inline]
    pub fn push_vertex(&mut self, p: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions
            .extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        index
    }

    /// Append a triangle
    #[inline]
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append another mesh, offsetting its indices
    pub fn merge(&mut self, other: &Mesh) {
        let base = self.vertex_count() as u32;
        let keep_normals = self.normals.len() == self.positions.len()
            && other.normals.len() == other.positions.len();
        if keep_normals {
            self.normals.extend_from_slice(&other.normals);
        } else {
            self.normals.clear();
        }
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| base + i));
    }

    /// Multiply every position by `scale`
    pub fn scale(&mut self, scale: f64) {
        if scale != 1.0 {
            let scale = scale as f32;
            for value in &mut self.positions {
                *value *= scale;
            }
        }
    }

    /// Transform positions (and normals, if present) by a 4x4 matrix
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let p = matrix.transform_point(&Point3::new(
                chunk[0] as f64,
                chunk[1] as f64,
                chunk[2] as f64,
            ));
            chunk[0] = p.x as f32;
            chunk[1] = p.y as f32;
            chunk[2] = p.z as f32;
        }

        if self.normals.is_empty() {
            return;
        }
        let normal_matrix = matrix
            .fixed_view::<3, 3>(0, 0)
            .into_owned()
            .try_inverse()
            .map(|m| m.transpose());
        let Some(normal_matrix) = normal_matrix else {
            self.normals.clear();
            return;
        };
        for chunk in self.normals.chunks_exact_mut(3) {
            let n = normal_matrix
                * Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
            let n = n.try_normalize(1e-12).unwrap_or(Vector3::z());
            chunk[0] = n.x as f32;
            chunk[1] = n.y as f32;
            chunk[2] = n.z as f32;
        }
    }

    /// Fill `normals` with area-weighted vertex normals
    pub fn compute_normals(&mut self) {
        self.normals = compute_vertex_normals(&self.positions, &self.indices);
    }
}

/// Per-vertex normals averaged from the faces that use each vertex
///
/// Face contributions are weighted by triangle area. Vertices no valid face
/// touches get `[0, 0, 1]`. Triangles with out-of-range indices are ignored.
pub fn compute_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut sums = vec![Vector3::<f32>::zeros(); vertex_count];

    let vertex =
        |i: usize| Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= vertex_count || b >= vertex_count || c >= vertex_count {
            continue;
        }
        // length is twice the triangle area
        let face = (vertex(b) - vertex(a)).cross(&(vertex(c) - vertex(a)));
        sums[a] += face;
        sums[b] += face;
        sums[c] += face;
    }

    let mut normals = Vec::with_capacity(vertex_count * 3);
    for sum in sums {
        let n = sum.try_normalize(1e-12).unwrap_or(Vector3::z());
        normals.extend_from_slice(&[n.x, n.y, n.z]);
    }
    normals
}
