// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Processors - Implementations for the supported IFC solid types
//!
//! Each processor turns one representation item into a mesh in the item's
//! own coordinate system and file units. Placement and unit scaling are the
//! router's job.

use crate::placement::{axis2_placement, cartesian_point, direction, point2_from_list, point3_from_list};
use crate::profile::Profile2D;
use crate::router::GeometryProcessor;
use crate::triangulation::{polygon_normal, triangulate_polygon_with_holes, PlaneBasis};
use crate::{extrude_profile, Error, Mesh, Result};
use ifc_glb_model::{DecodedEntity, EntityId, EntityResolver, IfcType};
use nalgebra::{Point2, Point3, Vector3};

fn resolve(resolver: &dyn EntityResolver, id: EntityId) -> Result<std::sync::Arc<DecodedEntity>> {
    resolver.get(id).ok_or(Error::EntityNotFound(id))
}

fn required_ref(entity: &DecodedEntity, index: usize, what: &str) -> Result<EntityId> {
    entity
        .get_ref(index)
        .ok_or_else(|| Error::invalid_attribute(index, format!("Missing {what}")))
}

fn required_float(entity: &DecodedEntity, index: usize, what: &str) -> Result<f64> {
    entity
        .get_float(index)
        .ok_or_else(|| Error::invalid_attribute(index, format!("Missing {what}")))
}

/// Drop the repeated closing point of an explicitly closed ring
fn open_ring(mut points: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    if points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (first - last).norm() < 1e-10 {
            points.pop();
        }
    }
    points
}

/// Read a 2D curve (IfcPolyline or IfcIndexedPolyCurve) as a ring of points
///
/// Indexed poly curve segments are followed as straight lines through the
/// point list.
pub fn curve_points(resolver: &dyn EntityResolver, curve_id: EntityId) -> Result<Vec<Point2<f64>>> {
    let curve = resolve(resolver, curve_id)?;

    let points = match curve.ifc_type {
        IfcType::IfcPolyline => {
            let refs = curve
                .get_refs(0)
                .ok_or_else(|| Error::invalid_attribute(0, "Missing Points"))?;
            refs.into_iter()
                .map(|id| cartesian_point(resolver, id).map(|p| Point2::new(p.x, p.y)))
                .collect::<Result<Vec<_>>>()?
        }
        IfcType::IfcIndexedPolyCurve => {
            let list_id = required_ref(&curve, 0, "Points")?;
            let list = resolve(resolver, list_id)?;
            list.get_list(0)
                .ok_or_else(|| Error::invalid_attribute(0, "Missing CoordList"))?
                .iter()
                .filter_map(|c| c.as_list().map(point2_from_list))
                .collect()
        }
        ref other => return Err(Error::unsupported_type(other)),
    };

    Ok(open_ring(points))
}

/// Build a 2D profile from an IfcProfileDef
///
/// Parameterized profiles honour their `Position` (index 2).
pub fn profile_from_entity(
    profile: &DecodedEntity,
    resolver: &dyn EntityResolver,
) -> Result<Profile2D> {
    let mut result = match profile.ifc_type {
        // XDim at index 3, YDim at index 4
        IfcType::IfcRectangleProfileDef => Profile2D::rectangle(
            required_float(profile, 3, "XDim")?,
            required_float(profile, 4, "YDim")?,
        ),
        // Radius at index 3
        IfcType::IfcCircleProfileDef => Profile2D::circle(required_float(profile, 3, "Radius")?, None),
        // OuterCurve at index 2, InnerCurves at index 3
        IfcType::IfcArbitraryClosedProfileDef | IfcType::IfcArbitraryProfileDefWithVoids => {
            let outer = curve_points(resolver, required_ref(profile, 2, "OuterCurve")?)?;
            if outer.len() < 3 {
                return Err(Error::profile("Outer curve must have at least 3 points"));
            }
            let mut result = Profile2D::new(outer);
            for inner in profile.get_refs(3).unwrap_or_default() {
                match curve_points(resolver, inner) {
                    Ok(hole) if hole.len() >= 3 => result.add_hole(hole),
                    Ok(_) => {}
                    Err(e) => log::debug!("skipping inner curve {inner}: {e}"),
                }
            }
            return Ok(result);
        }
        ref other => return Err(Error::unsupported_type(other)),
    };

    if let Some(position) = profile.get_ref(2) {
        let transform = axis2_placement(resolver, position)?;
        for ring in std::iter::once(&mut result.outer).chain(result.holes.iter_mut()) {
            for p in ring.iter_mut() {
                let q = transform.transform_point(&Point3::new(p.x, p.y, 0.0));
                *p = Point2::new(q.x, q.y);
            }
        }
    }

    Ok(result)
}

/// ExtrudedAreaSolid processor
///
/// Handles IfcExtrudedAreaSolid, the most common IFC solid: a 2D profile
/// swept along a direction.
#[derive(Default)]
pub struct ExtrudedAreaSolidProcessor;

impl ExtrudedAreaSolidProcessor {
    /// Create new processor
    pub fn new() -> Self {
        Self
    }
}

impl GeometryProcessor for ExtrudedAreaSolidProcessor {
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        // 0: SweptArea, 1: Position, 2: ExtrudedDirection, 3: Depth
        let profile_entity = resolve(resolver, required_ref(entity, 0, "SweptArea")?)?;
        let profile = profile_from_entity(&profile_entity, resolver)?;

        let extrusion = direction(resolver, required_ref(entity, 2, "ExtrudedDirection")?)
            .unwrap_or_else(Vector3::z);
        let depth = required_float(entity, 3, "Depth")?;

        let mut mesh = extrude_profile(&profile, depth, Some(extrusion))?;

        if let Some(position) = entity.get_ref(1) {
            mesh.transform(&axis2_placement(resolver, position)?);
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcExtrudedAreaSolid]
    }
}

/// TriangulatedFaceSet processor
///
/// Handles IfcTriangulatedFaceSet, an explicit triangle mesh (IFC4+).
#[derive(Default)]
pub struct TriangulatedFaceSetProcessor;

impl TriangulatedFaceSetProcessor {
    /// Create new processor
    pub fn new() -> Self {
        Self
    }
}

impl GeometryProcessor for TriangulatedFaceSetProcessor {
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        // 0: Coordinates, 1: Normals, 2: Closed, 3: CoordIndex
        let coordinates = resolve(resolver, required_ref(entity, 0, "Coordinates")?)?;
        let coord_list = coordinates
            .get_list(0)
            .ok_or_else(|| Error::invalid_attribute(0, "Missing CoordList"))?;

        let mut mesh = Mesh::with_capacity(coord_list.len(), 0);
        for coord in coord_list {
            let point = coord
                .as_list()
                .ok_or_else(|| Error::geometry("Coordinate is not a list"))?;
            mesh.push_vertex(point3_from_list(point));
        }

        let faces = entity
            .get_list(3)
            .ok_or_else(|| Error::invalid_attribute(3, "Missing CoordIndex"))?;

        let vertex_count = mesh.vertex_count() as i64;
        for face in faces {
            let Some(triangle) = face.as_list().filter(|t| t.len() >= 3) else {
                continue;
            };
            let mut corners = [0u32; 3];
            for (corner, value) in corners.iter_mut().zip(triangle) {
                // CoordIndex is 1-based
                let index = value
                    .as_integer()
                    .filter(|i| (1..=vertex_count).contains(i))
                    .ok_or_else(|| {
                        Error::geometry(format!("CoordIndex {value:?} out of range 1..={vertex_count}"))
                    })?;
                *corner = (index - 1) as u32;
            }
            mesh.push_triangle(corners[0], corners[1], corners[2]);
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcTriangulatedFaceSet]
    }
}

/// FacetedBrep processor
///
/// Handles IfcFacetedBrep: a closed shell of planar polygon faces, with
/// inner bounds as holes.
#[derive(Default)]
pub struct FacetedBrepProcessor;

impl FacetedBrepProcessor {
    /// Create new processor
    pub fn new() -> Self {
        Self
    }

    /// Points of an IfcPolyLoop
    fn loop_points(
        &self,
        resolver: &dyn EntityResolver,
        loop_id: EntityId,
    ) -> Result<Vec<Point3<f64>>> {
        let poly_loop = resolve(resolver, loop_id)?;
        if poly_loop.ifc_type != IfcType::IfcPolyLoop {
            return Err(Error::unsupported_type(&poly_loop.ifc_type));
        }
        poly_loop
            .get_refs(0)
            .ok_or_else(|| Error::invalid_attribute(0, "Missing Polygon"))?
            .into_iter()
            .map(|id| cartesian_point(resolver, id))
            .collect()
    }

    /// Append one face, triangulated in its own plane
    fn add_face(&self, mesh: &mut Mesh, outer: &[Point3<f64>], holes: &[Vec<Point3<f64>>]) {
        let normal = polygon_normal(outer);

        let indices = if outer.len() == 3 && holes.is_empty() {
            vec![0, 1, 2]
        } else {
            let basis = PlaneBasis::new(outer[0], &normal);
            let holes_2d: Vec<Vec<Point2<f64>>> =
                holes.iter().map(|h| basis.project_all(h)).collect();
            match triangulate_polygon_with_holes(&basis.project_all(outer), &holes_2d) {
                Ok(indices) => indices,
                Err(e) => {
                    log::debug!("fan-triangulating face after {e}");
                    (1..outer.len() - 1).flat_map(|i| [0, i, i + 1]).collect()
                }
            }
        };

        let base = mesh.vertex_count() as u32;
        let valid_holes = holes.iter().filter(|h| h.len() >= 3);
        for p in outer.iter().chain(valid_holes.flatten()) {
            mesh.push_vertex(*p);
        }
        for t in indices.chunks_exact(3) {
            mesh.push_triangle(base + t[0] as u32, base + t[1] as u32, base + t[2] as u32);
        }
    }
}

impl GeometryProcessor for FacetedBrepProcessor {
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        // 0: Outer (IfcClosedShell) -> 0: CfsFaces
        let shell = resolve(resolver, required_ref(entity, 0, "Outer")?)?;
        let faces = shell
            .get_refs(0)
            .ok_or_else(|| Error::invalid_attribute(0, "Missing CfsFaces"))?;

        let mut mesh = Mesh::new();
        for face_id in faces {
            let Some(face) = resolver.get(face_id) else {
                continue;
            };

            let mut outer: Option<Vec<Point3<f64>>> = None;
            let mut holes = Vec::new();

            // IfcFace.Bounds at index 0; IfcFaceBound(Bound, Orientation)
            for bound_id in face.get_refs(0).unwrap_or_default() {
                let Some(bound) = resolver.get(bound_id) else {
                    continue;
                };
                let Some(loop_id) = bound.get_ref(0) else {
                    continue;
                };
                let mut points = match self.loop_points(resolver, loop_id) {
                    Ok(points) if points.len() >= 3 => points,
                    Ok(_) => continue,
                    Err(e) => {
                        log::debug!("skipping bound {bound_id}: {e}");
                        continue;
                    }
                };
                if bound.get(1).and_then(|v| v.as_bool()) == Some(false) {
                    points.reverse();
                }

                let is_outer = bound.ifc_type == IfcType::IfcFaceOuterBound;
                if is_outer {
                    if let Some(previous) = outer.replace(points) {
                        holes.push(previous);
                    }
                } else if outer.is_none() {
                    outer = Some(points);
                } else {
                    holes.push(points);
                }
            }

            if let Some(outer) = outer {
                self.add_face(&mut mesh, &outer, &holes);
            }
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcFacetedBrep]
    }
}
