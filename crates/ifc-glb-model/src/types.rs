// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for IFC data representation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type-safe entity identifier
///
/// Wraps the raw IFC entity ID (e.g., #123 becomes EntityId(123)). This is
/// the "Express ID" that ties extracted geometry back to its source element.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        EntityId(id)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Declares [`IfcType`] together with its STEP keyword and schema class name,
/// so the three spellings can never drift apart.
macro_rules! ifc_types {
    ($($variant:ident => $step:literal, $class:literal;)*) => {
        /// IFC entity type enumeration
        ///
        /// Covers the element, representation, placement and unit entities the
        /// converter reads. Anything else is kept as [`IfcType::Unknown`] with the
        /// keyword as written in the file.
        #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub enum IfcType {
            $($variant,)*
            Unknown(String),
        }

        impl IfcType {
            /// Parse a STEP keyword (case-insensitive) into an IfcType
            pub fn parse(s: &str) -> Self {
                $(
                    if s.eq_ignore_ascii_case($step) {
                        return IfcType::$variant;
                    }
                )*
                IfcType::Unknown(s.to_string())
            }

            /// Upper-case STEP keyword, e.g. `IFCWALL`
            pub fn name(&self) -> &str {
                match self {
                    $(IfcType::$variant => $step,)*
                    IfcType::Unknown(s) => s,
                }
            }

            /// Schema class name, e.g. `IfcWall`
            ///
            /// This is what an IFC engine reports as the runtime type of an
            /// element, and what the native backend uses as a geometry type tag.
            pub fn class_name(&self) -> &str {
                match self {
                    $(IfcType::$variant => $class,)*
                    IfcType::Unknown(s) => s,
                }
            }
        }
    };
}

ifc_types! {
    // Project and units
    IfcProject => "IFCPROJECT", "IfcProject";
    IfcUnitAssignment => "IFCUNITASSIGNMENT", "IfcUnitAssignment";
    IfcSIUnit => "IFCSIUNIT", "IfcSIUnit";
    IfcConversionBasedUnit => "IFCCONVERSIONBASEDUNIT", "IfcConversionBasedUnit";
    IfcMeasureWithUnit => "IFCMEASUREWITHUNIT", "IfcMeasureWithUnit";

    // Building elements
    IfcWall => "IFCWALL", "IfcWall";
    IfcWallStandardCase => "IFCWALLSTANDARDCASE", "IfcWallStandardCase";
    IfcCurtainWall => "IFCCURTAINWALL", "IfcCurtainWall";
    IfcSlab => "IFCSLAB", "IfcSlab";
    IfcRoof => "IFCROOF", "IfcRoof";
    IfcBeam => "IFCBEAM", "IfcBeam";
    IfcColumn => "IFCCOLUMN", "IfcColumn";
    IfcDoor => "IFCDOOR", "IfcDoor";
    IfcWindow => "IFCWINDOW", "IfcWindow";
    IfcStair => "IFCSTAIR", "IfcStair";
    IfcRailing => "IFCRAILING", "IfcRailing";
    IfcPlate => "IFCPLATE", "IfcPlate";
    IfcMember => "IFCMEMBER", "IfcMember";
    IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY", "IfcBuildingElementProxy";
    IfcFurnishingElement => "IFCFURNISHINGELEMENT", "IfcFurnishingElement";

    // Representation structure
    IfcProductDefinitionShape => "IFCPRODUCTDEFINITIONSHAPE", "IfcProductDefinitionShape";
    IfcShapeRepresentation => "IFCSHAPEREPRESENTATION", "IfcShapeRepresentation";
    IfcMappedItem => "IFCMAPPEDITEM", "IfcMappedItem";
    IfcRepresentationMap => "IFCREPRESENTATIONMAP", "IfcRepresentationMap";

    // Solids and surfaces
    IfcExtrudedAreaSolid => "IFCEXTRUDEDAREASOLID", "IfcExtrudedAreaSolid";
    IfcTriangulatedFaceSet => "IFCTRIANGULATEDFACESET", "IfcTriangulatedFaceSet";
    IfcFacetedBrep => "IFCFACETEDBREP", "IfcFacetedBrep";
    IfcClosedShell => "IFCCLOSEDSHELL", "IfcClosedShell";
    IfcFace => "IFCFACE", "IfcFace";
    IfcFaceBound => "IFCFACEBOUND", "IfcFaceBound";
    IfcFaceOuterBound => "IFCFACEOUTERBOUND", "IfcFaceOuterBound";
    IfcPolyLoop => "IFCPOLYLOOP", "IfcPolyLoop";

    // Profiles and curves
    IfcRectangleProfileDef => "IFCRECTANGLEPROFILEDEF", "IfcRectangleProfileDef";
    IfcCircleProfileDef => "IFCCIRCLEPROFILEDEF", "IfcCircleProfileDef";
    IfcArbitraryClosedProfileDef => "IFCARBITRARYCLOSEDPROFILEDEF", "IfcArbitraryClosedProfileDef";
    IfcArbitraryProfileDefWithVoids => "IFCARBITRARYPROFILEDEFWITHVOIDS", "IfcArbitraryProfileDefWithVoids";
    IfcPolyline => "IFCPOLYLINE", "IfcPolyline";
    IfcIndexedPolyCurve => "IFCINDEXEDPOLYCURVE", "IfcIndexedPolyCurve";
    IfcCartesianPointList2D => "IFCCARTESIANPOINTLIST2D", "IfcCartesianPointList2D";
    IfcCartesianPointList3D => "IFCCARTESIANPOINTLIST3D", "IfcCartesianPointList3D";

    // Placement
    IfcLocalPlacement => "IFCLOCALPLACEMENT", "IfcLocalPlacement";
    IfcAxis2Placement2D => "IFCAXIS2PLACEMENT2D", "IfcAxis2Placement2D";
    IfcAxis2Placement3D => "IFCAXIS2PLACEMENT3D", "IfcAxis2Placement3D";
    IfcCartesianPoint => "IFCCARTESIANPOINT", "IfcCartesianPoint";
    IfcDirection => "IFCDIRECTION", "IfcDirection";
    IfcCartesianTransformationOperator3D => "IFCCARTESIANTRANSFORMATIONOPERATOR3D", "IfcCartesianTransformationOperator3D";
}

impl IfcType {
    /// Check if this type is a building element the converter extracts
    pub fn is_building_element(&self) -> bool {
        matches!(
            self,
            IfcType::IfcWall
                | IfcType::IfcWallStandardCase
                | IfcType::IfcCurtainWall
                | IfcType::IfcSlab
                | IfcType::IfcRoof
                | IfcType::IfcBeam
                | IfcType::IfcColumn
                | IfcType::IfcDoor
                | IfcType::IfcWindow
                | IfcType::IfcStair
                | IfcType::IfcRailing
                | IfcType::IfcPlate
                | IfcType::IfcMember
                | IfcType::IfcBuildingElementProxy
                | IfcType::IfcFurnishingElement
        )
    }
}

impl FromStr for IfcType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Default for IfcType {
    fn default() -> Self {
        IfcType::Unknown(String::new())
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decoded attribute value
///
/// Represents any value that can appear in an IFC entity's attribute list.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum AttributeValue {
    /// Null value ($)
    #[default]
    Null,
    /// Derived value (*)
    Derived,
    /// Entity reference (#123)
    EntityRef(EntityId),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Enumeration value (.VALUE.)
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed value like IFCLENGTHMEASURE(2.5)
    TypedValue(String, Vec<AttributeValue>),
}

impl AttributeValue {
    /// Try to get as entity reference
    pub fn as_entity_ref(&self) -> Option<EntityId> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::TypedValue(_, args) if !args.is_empty() => args[0].as_string(),
            _ => None,
        }
    }

    /// Try to get as float (integers and typed measures are widened)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::TypedValue(_, args) if !args.is_empty() => args[0].as_float(),
            _ => None,
        }
    }

    /// Try to get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as boolean (STEP logicals are `.T.` / `.F.`)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Enum(s) if s.eq_ignore_ascii_case("T") => Some(true),
            AttributeValue::Enum(s) if s.eq_ignore_ascii_case("F") => Some(false),
            _ => None,
        }
    }

    /// Try to get as enum string
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as list
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

/// Decoded IFC entity
#[derive(Clone, Debug)]
pub struct DecodedEntity {
    /// Entity ID
    pub id: EntityId,
    /// Entity type
    pub ifc_type: IfcType,
    /// Attribute values in order
    pub attributes: Vec<AttributeValue>,
}

impl DecodedEntity {
    /// Get attribute at index
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// Get entity reference at index
    pub fn get_ref(&self, index: usize) -> Option<EntityId> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// Get string at index
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_string())
    }

    /// Get float at index
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    /// Get list at index
    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    /// Get enum string at index
    pub fn get_enum(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_enum())
    }

    /// Get list of entity references at index
    pub fn get_refs(&self, index: usize) -> Option<Vec<EntityId>> {
        self.get_list(index)
            .map(|list| list.iter().filter_map(|v| v.as_entity_ref()).collect())
    }
}

/// Model metadata extracted from the STEP header
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelMetadata {
    /// IFC schema version (e.g., "IFC2X3", "IFC4")
    pub schema_version: String,
    /// File name from header
    pub file_name: Option<String>,
    /// Originating system (CAD application)
    pub originating_system: Option<String>,
}
