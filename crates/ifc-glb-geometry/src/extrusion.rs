// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linear extrusion of 2D profiles into closed solids

use crate::{profile::Profile2D, Error, Mesh, Result};
use nalgebra::{Point2, Point3, Vector3};

/// Extrude a profile along `direction` (default +Z) by `depth`
///
/// The result has a bottom cap in the profile plane, a top cap at the
/// offset and one quad per ring edge, all wound counter-clockwise when seen
/// from outside. Side quads get their own vertices so faces stay flat-shaded.
pub fn extrude_profile(
    profile: &Profile2D,
    depth: f64,
    direction: Option<Vector3<f64>>,
) -> Result<Mesh> {
    if !(depth.is_finite() && depth > 0.0) {
        return Err(Error::geometry(format!("Invalid extrusion depth {depth}")));
    }
    let direction = direction
        .unwrap_or_else(Vector3::z)
        .try_normalize(1e-12)
        .ok_or_else(|| Error::geometry("Zero extrusion direction"))?;
    if direction.z.abs() < 1e-9 {
        return Err(Error::geometry(
            "Extrusion direction lies in the profile plane",
        ));
    }
    let offset = direction * depth;

    let mut profile = profile.clone();
    profile.normalize_winding();
    let tri = profile.triangulate()?;

    let cap_vertices = tri.points.len();
    let side_vertices: usize = profile
        .rings()
        .filter(|r| r.len() >= 3)
        .map(|r| r.len() * 4)
        .sum();
    let mut mesh = Mesh::with_capacity(
        cap_vertices * 2 + side_vertices,
        tri.indices.len() / 3 * 2 + side_vertices / 2,
    );

    let at = |p: &Point2<f64>, top: bool| {
        let base = Point3::new(p.x, p.y, 0.0);
        if top {
            base + offset
        } else {
            base
        }
    };

    // caps
    for top in [false, true] {
        let base = mesh.vertex_count() as u32;
        for p in &tri.points {
            mesh.push_vertex(at(p, top));
        }
        for t in tri.indices.chunks_exact(3) {
            let (mut a, mut b, c) = (t[0], t[1], t[2]);
            // earcut does not promise a winding
            let (pa, pb, pc) = (tri.points[a], tri.points[b], tri.points[c]);
            if (pb - pa).perp(&(pc - pa)) < 0.0 {
                std::mem::swap(&mut a, &mut b);
            }
            let [a, b, c] = [a, b, c].map(|i| base + i as u32);
            if top {
                mesh.push_triangle(a, b, c);
            } else {
                mesh.push_triangle(a, c, b);
            }
        }
    }

    // sides
    for ring in profile.rings().filter(|r| r.len() >= 3) {
        for (i, p) in ring.iter().enumerate() {
            let q = &ring[(i + 1) % ring.len()];
            if (q - p).norm() < 1e-12 {
                continue;
            }
            let a0 = mesh.push_vertex(at(p, false));
            let b0 = mesh.push_vertex(at(q, false));
            let b1 = mesh.push_vertex(at(q, true));
            let a1 = mesh.push_vertex(at(p, true));
            mesh.push_triangle(a0, b0, b1);
            mesh.push_triangle(a0, b1, a1);
        }
    }

    // extruding downwards mirrors the solid inside out
    if offset.z < 0.0 {
        for t in mesh.indices.chunks_exact_mut(3) {
            t.swap(1, 2);
        }
    }

    Ok(mesh)
}
