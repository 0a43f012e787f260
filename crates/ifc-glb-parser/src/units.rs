// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length unit scale extraction
//!
//! Geometry is emitted in metres, so the project's length unit decides how
//! every coordinate in the file is scaled.

use ifc_glb_model::{AttributeValue, DecodedEntity, EntityResolver, IfcType};

/// Maximum depth of conversion-based units defined in terms of each other
const MAX_UNIT_DEPTH: usize = 8;

/// Extract the length unit scale (file units to metres)
///
/// Reads `IFCPROJECT.UnitsInContext`. Returns 1.0 if no length unit is found.
pub fn extract_unit_scale(resolver: &dyn EntityResolver) -> f64 {
    let Some(project) = resolver
        .ids_by_type(&IfcType::IfcProject)
        .first()
        .and_then(|id| resolver.get(*id))
    else {
        return 1.0;
    };

    // IFCPROJECT has UnitsInContext at index 8
    let Some(assignment) = project.get(8).and_then(|a| resolver.resolve_ref(a)) else {
        return 1.0;
    };

    // IFCUNITASSIGNMENT has Units list at index 0
    let Some(units) = assignment.get(0) else {
        return 1.0;
    };

    resolver
        .resolve_ref_list(units)
        .iter()
        .find_map(|unit| length_unit_scale(unit, resolver, 0))
        .unwrap_or(1.0)
}

fn length_unit_scale(
    unit: &DecodedEntity,
    resolver: &dyn EntityResolver,
    depth: usize,
) -> Option<f64> {
    if depth > MAX_UNIT_DEPTH {
        return None;
    }
    match unit.ifc_type {
        IfcType::IfcSIUnit => si_unit_scale(unit),
        IfcType::IfcConversionBasedUnit => conversion_unit_scale(unit, resolver, depth),
        _ => None,
    }
}

/// SI prefix multiplier (`.MILLI.` -> 1e-3)
pub fn si_prefix_scale(prefix: &str) -> f64 {
    match prefix {
        "EXA" => 1e18,
        "PETA" => 1e15,
        "TERA" => 1e12,
        "GIGA" => 1e9,
        "MEGA" => 1e6,
        "KILO" => 1e3,
        "HECTO" => 1e2,
        "DECA" => 1e1,
        "DECI" => 1e-1,
        "CENTI" => 1e-2,
        "MILLI" => 1e-3,
        "MICRO" => 1e-6,
        "NANO" => 1e-9,
        "PICO" => 1e-12,
        "FEMTO" => 1e-15,
        "ATTO" => 1e-18,
        _ => 1.0,
    }
}

/// IFCSIUNIT(*, UnitType, Prefix, Name)
fn si_unit_scale(unit: &DecodedEntity) -> Option<f64> {
    if unit.get_enum(1)? != "LENGTHUNIT" || unit.get_enum(3)? != "METRE" {
        return None;
    }
    Some(unit.get_enum(2).map_or(1.0, si_prefix_scale))
}

/// IFCCONVERSIONBASEDUNIT(Dimensions, UnitType, Name, ConversionFactor)
fn conversion_unit_scale(
    unit: &DecodedEntity,
    resolver: &dyn EntityResolver,
    depth: usize,
) -> Option<f64> {
    if unit.get_enum(1)? != "LENGTHUNIT" {
        return None;
    }

    // IFCMEASUREWITHUNIT(ValueComponent, UnitComponent)
    let factor = resolver.get(unit.get_ref(3)?)?;
    if factor.ifc_type != IfcType::IfcMeasureWithUnit {
        return None;
    }
    let value = factor.get(0).and_then(AttributeValue::as_float)?;

    let base_scale = factor
        .get_ref(1)
        .and_then(|id| resolver.get(id))
        .and_then(|base| length_unit_scale(&base, resolver, depth + 1))
        .unwrap_or(1.0);

    Some(value * base_scale)
}
