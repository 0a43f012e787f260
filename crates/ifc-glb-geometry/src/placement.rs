// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement and point helpers
//!
//! Reads `IfcCartesianPoint`, `IfcDirection`, `IfcAxis2Placement2D/3D`,
//! `IfcLocalPlacement` and `IfcCartesianTransformationOperator3D` into
//! nalgebra types. All values stay in file units.

use crate::{Error, Result};
use ifc_glb_model::{AttributeValue, DecodedEntity, EntityId, EntityResolver, IfcType};
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Longest `PlacementRelTo` chain followed before giving up
const MAX_PLACEMENT_DEPTH: usize = 64;

fn coordinate(list: &[AttributeValue], index: usize, default: f64) -> f64 {
    list.get(index).and_then(|v| v.as_float()).unwrap_or(default)
}

/// Read a coordinate tuple such as `(1.,2.,3.)` as a 3D point
pub fn point3_from_list(list: &[AttributeValue]) -> Point3<f64> {
    Point3::new(
        coordinate(list, 0, 0.0),
        coordinate(list, 1, 0.0),
        coordinate(list, 2, 0.0),
    )
}

/// Read a coordinate tuple as a 2D point
pub fn point2_from_list(list: &[AttributeValue]) -> Point2<f64> {
    Point2::new(coordinate(list, 0, 0.0), coordinate(list, 1, 0.0))
}

fn get(resolver: &dyn EntityResolver, id: EntityId) -> Result<std::sync::Arc<DecodedEntity>> {
    resolver.get(id).ok_or(Error::EntityNotFound(id))
}

/// Resolve an `IfcCartesianPoint`
pub fn cartesian_point(resolver: &dyn EntityResolver, id: EntityId) -> Result<Point3<f64>> {
    let point = get(resolver, id)?;
    if point.ifc_type != IfcType::IfcCartesianPoint {
        return Err(Error::geometry(format!(
            "{id} is {}, expected IfcCartesianPoint",
            point.ifc_type.class_name()
        )));
    }
    let coords = point
        .get_list(0)
        .ok_or_else(|| Error::invalid_attribute(0, "Missing Coordinates"))?;
    Ok(point3_from_list(coords))
}

/// Resolve an `IfcDirection`; missing ratios fall back to +Z
pub fn direction(resolver: &dyn EntityResolver, id: EntityId) -> Option<Vector3<f64>> {
    let direction = resolver.get(id)?;
    if direction.ifc_type != IfcType::IfcDirection {
        return None;
    }
    let ratios = direction.get_list(0)?;
    Some(Vector3::new(
        coordinate(ratios, 0, 0.0),
        coordinate(ratios, 1, 0.0),
        coordinate(ratios, 2, 0.0),
    ))
    .filter(|v| v.norm() > 1e-12)
}

/// Build a rigid transform from origin, Z axis and an approximate X axis
fn basis_transform(
    location: Point3<f64>,
    axis: Vector3<f64>,
    ref_direction: Vector3<f64>,
) -> Matrix4<f64> {
    let z = axis.normalize();
    // Gram-Schmidt; a reference parallel to Z gets replaced
    let mut x = ref_direction - z * ref_direction.dot(&z);
    if x.norm() < 1e-9 {
        x = if z.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
        x -= z * x.dot(&z);
    }
    let x = x.normalize();
    let y = z.cross(&x);

    Matrix4::new(
        x.x, y.x, z.x, location.x, //
        x.y, y.y, z.y, location.y, //
        x.z, y.z, z.z, location.z, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Resolve an `IfcAxis2Placement3D` (or 2D, lifted into the XY plane)
pub fn axis2_placement(resolver: &dyn EntityResolver, id: EntityId) -> Result<Matrix4<f64>> {
    let placement = get(resolver, id)?;

    let location = match placement.get_ref(0) {
        Some(point) => cartesian_point(resolver, point)?,
        None => Point3::origin(),
    };

    match placement.ifc_type {
        IfcType::IfcAxis2Placement3D => {
            let axis = placement
                .get_ref(1)
                .and_then(|d| direction(resolver, d))
                .unwrap_or_else(Vector3::z);
            let ref_direction = placement
                .get_ref(2)
                .and_then(|d| direction(resolver, d))
                .unwrap_or_else(Vector3::x);
            Ok(basis_transform(location, axis, ref_direction))
        }
        IfcType::IfcAxis2Placement2D => {
            let ref_direction = placement
                .get_ref(1)
                .and_then(|d| direction(resolver, d))
                .map(|d| Vector3::new(d.x, d.y, 0.0))
                .unwrap_or_else(Vector3::x);
            Ok(basis_transform(location, Vector3::z(), ref_direction))
        }
        ref other => Err(Error::geometry(format!(
            "{id} is {}, expected an axis placement",
            other.class_name()
        ))),
    }
}

/// Resolve an `IfcLocalPlacement` into an absolute transform
///
/// Follows `PlacementRelTo` up to the root; a dangling parent ends the chain.
pub fn local_placement(resolver: &dyn EntityResolver, id: EntityId) -> Result<Matrix4<f64>> {
    let mut transform = Matrix4::identity();
    let mut current = Some(id);
    let mut depth = 0;

    while let Some(placement_id) = current {
        if depth == MAX_PLACEMENT_DEPTH {
            return Err(Error::geometry(format!(
                "placement chain from {id} is deeper than {MAX_PLACEMENT_DEPTH}"
            )));
        }
        depth += 1;

        let Some(placement) = resolver.get(placement_id) else {
            break;
        };
        if placement.ifc_type != IfcType::IfcLocalPlacement {
            return Err(Error::geometry(format!(
                "{placement_id} is {}, expected IfcLocalPlacement",
                placement.ifc_type.class_name()
            )));
        }

        // RelativePlacement at index 1
        if let Some(relative) = placement.get_ref(1) {
            transform = axis2_placement(resolver, relative)? * transform;
        }
        // PlacementRelTo at index 0
        current = placement.get_ref(0);
    }

    Ok(transform)
}

/// Resolve an `IfcCartesianTransformationOperator3D` (mapping target)
///
/// Attributes: Axis1(0), Axis2(1), LocalOrigin(2), Scale(3), Axis3(4).
pub fn transformation_operator(
    resolver: &dyn EntityResolver,
    id: EntityId,
) -> Result<Matrix4<f64>> {
    let op = get(resolver, id)?;
    if op.ifc_type != IfcType::IfcCartesianTransformationOperator3D {
        return Err(Error::geometry(format!(
            "{id} is {}, expected IfcCartesianTransformationOperator3D",
            op.ifc_type.class_name()
        )));
    }

    let origin = match op.get_ref(2) {
        Some(point) => cartesian_point(resolver, point)?,
        None => Point3::origin(),
    };
    let x = op
        .get_ref(0)
        .and_then(|d| direction(resolver, d))
        .unwrap_or_else(Vector3::x);
    let z = op
        .get_ref(4)
        .and_then(|d| direction(resolver, d))
        .unwrap_or_else(Vector3::z);
    let scale = op.get_float(3).unwrap_or(1.0);

    Ok(basis_transform(origin, z, x) * Matrix4::new_scaling(scale))
}

/// Scale the translation of a rigid transform from file units to metres
pub fn scale_translation(transform: &Matrix4<f64>, unit_scale: f64) -> Matrix4<f64> {
    let mut scaled = *transform;
    for row in 0..3 {
        scaled[(row, 3)] *= unit_scale;
    }
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ifc_glb_parser::StepResolver;

    fn resolver(data: &str) -> StepResolver {
        StepResolver::new(format!("ISO-10303-21;\nDATA;\n{data}\nENDSEC;\n"))
    }

    #[test]
    fn test_axis_placement_rotates() {
        let r = resolver(
            "#1=IFCAXIS2PLACEMENT3D(#2,#3,#4);\n\
             #2=IFCCARTESIANPOINT((1.,2.,3.));\n\
             #3=IFCDIRECTION((0.,0.,1.));\n\
             #4=IFCDIRECTION((0.,1.,0.));",
        );
        let m = axis2_placement(&r, EntityId(1)).unwrap();
        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 3.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_local_placement_chain() {
        let r = resolver(
            "#1=IFCLOCALPLACEMENT(#2,#10);\n\
             #2=IFCLOCALPLACEMENT($,#11);\n\
             #10=IFCAXIS2PLACEMENT3D(#20,$,$);\n\
             #11=IFCAXIS2PLACEMENT3D(#21,$,$);\n\
             #20=IFCCARTESIANPOINT((1.,0.,0.));\n\
             #21=IFCCARTESIANPOINT((0.,5.,0.));",
        );
        let m = local_placement(&r, EntityId(1)).unwrap();
        let p = m.transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(1.0, 5.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_placement_cycle_is_an_error() {
        let r = resolver(
            "#1=IFCLOCALPLACEMENT(#2,$);\n\
             #2=IFCLOCALPLACEMENT(#1,$);",
        );
        assert!(local_placement(&r, EntityId(1)).is_err());
    }

    #[test]
    fn test_transformation_operator_scales() {
        let r = resolver(
            "#1=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#2,2.,$);\n\
             #2=IFCCARTESIANPOINT((10.,0.,0.));",
        );
        let m = transformation_operator(&r, EntityId(1)).unwrap();
        let p = m.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p, Point3::new(12.0, 2.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_scale_translation() {
        let m = Matrix4::new_translation(&Vector3::new(1000.0, 0.0, 500.0));
        let scaled = scale_translation(&m, 0.001);
        assert_relative_eq!(scaled[(0, 3)], 1.0);
        assert_relative_eq!(scaled[(2, 3)], 0.5);
        assert_relative_eq!(scaled[(0, 0)], 1.0);
    }
}
