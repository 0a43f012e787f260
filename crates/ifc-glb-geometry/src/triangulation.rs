// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D polygon triangulation, plus the helpers
//! needed to triangulate planar 3D faces.

use crate::{Error, Point2, Point3, Result, Vector3};

/// Twice the signed area of a ring; positive for counter-clockwise
#[inline]
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (&points[i], &points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Check if a polygon is convex (all turns have the same sign)
fn is_convex(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    let mut sign = 0.0f64;

    for i in 0..n {
        let (p0, p1, p2) = (&points[i], &points[(i + 1) % n], &points[(i + 2) % n]);
        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
        if cross.abs() > 1e-10 {
            if sign == 0.0 {
                sign = cross.signum();
            } else if sign != cross.signum() {
                return false;
            }
        }
    }

    true
}

fn fan(n: usize) -> Vec<usize> {
    (1..n - 1).flat_map(|i| [0, i, i + 1]).collect()
}

fn flatten<'a>(rings: impl IntoIterator<Item = &'a [Point2<f64>]>) -> (Vec<f64>, Vec<usize>) {
    let mut vertices = Vec::new();
    let mut ring_starts = Vec::new();
    for ring in rings {
        ring_starts.push(vertices.len() / 2);
        for p in ring {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }
    (vertices, ring_starts)
}

/// Triangulate a simple polygon (no holes)
///
/// Returns triangle indices into the input points.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();
    if n < 3 {
        return Err(Error::triangulation("Need at least 3 points to triangulate"));
    }

    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }
    if n <= 8 && is_convex(points) {
        return Ok(fan(n));
    }

    let (vertices, _) = flatten([points]);
    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::triangulation(format!("{e:?}")))
}

/// Triangulate a polygon with holes
///
/// Returns triangle indices into the concatenation of `outer` and every
/// hole with at least 3 points, in order.
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::triangulation(
            "Need at least 3 points in outer boundary",
        ));
    }

    let valid_holes: Vec<&[Point2<f64>]> = holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(Vec::as_slice)
        .collect();
    if valid_holes.is_empty() {
        return triangulate_polygon(outer);
    }

    let (vertices, ring_starts) = flatten(std::iter::once(outer).chain(valid_holes));
    earcutr::earcut(&vertices, &ring_starts[1..], 2)
        .map_err(|e| Error::triangulation(format!("{e:?}")))
}

/// Unit normal of a planar polygon using Newell's method
///
/// Degenerate polygons get `+Z`.
pub fn polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();
    let mut normal = Vector3::<f64>::zeros();

    for i in 0..n {
        let (current, next) = (&points[i], &points[(i + 1) % n]);
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal
        .try_normalize(1e-10)
        .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0))
}

/// Orthonormal 2D coordinate system on a 3D plane
#[derive(Clone, Copy, Debug)]
pub struct PlaneBasis {
    origin: Point3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl PlaneBasis {
    /// Basis on the plane through `origin` with the given unit normal
    ///
    /// `u x v` points along `normal`, so rings keep their winding when
    /// projected.
    pub fn new(origin: Point3<f64>, normal: &Vector3<f64>) -> Self {
        // least aligned world axis gives the most stable cross product
        let reference = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
            Vector3::x()
        } else if normal.y.abs() <= normal.z.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };

        let u = reference.cross(normal).normalize();
        let v = normal.cross(&u).normalize();
        Self { origin, u, v }
    }

    /// Project a point into plane coordinates
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.origin;
        Point2::new(d.dot(&self.u), d.dot(&self.v))
    }

    /// Project a ring of points
    pub fn project_all(&self, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        points.iter().map(|p| self.project(p)).collect()
    }
}
