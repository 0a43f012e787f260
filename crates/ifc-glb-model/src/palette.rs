// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type to colour table
//!
//! Both backends colour materials from the same table so a wall looks the
//! same whichever strategy produced it.

use crate::IfcType;

/// Colour for anything the table does not know
pub const NEUTRAL_GRAY: [f32; 3] = [0.7, 0.7, 0.7];

/// Get the display colour (RGB, 0.0-1.0) for an element type tag
///
/// Accepts either spelling of the type (`IfcWall` or `IFCWALL`).
pub fn color_for_type(type_tag: &str) -> [f32; 3] {
    match IfcType::parse(type_tag.trim()) {
        IfcType::IfcWall | IfcType::IfcWallStandardCase => [0.8, 0.8, 0.8],
        IfcType::IfcSlab => [0.7, 0.7, 0.7],
        IfcType::IfcBeam => [0.6, 0.4, 0.2],
        IfcType::IfcColumn => [0.5, 0.5, 0.5],
        IfcType::IfcDoor => [0.6, 0.3, 0.1],
        IfcType::IfcWindow => [0.3, 0.6, 0.8],
        IfcType::IfcRoof => [0.4, 0.2, 0.1],
        IfcType::IfcStair => [0.6, 0.6, 0.4],
        IfcType::IfcRailing => [0.3, 0.3, 0.3],
        IfcType::IfcPlate => [0.7, 0.7, 0.5],
        IfcType::IfcMember => [0.5, 0.4, 0.3],
        IfcType::IfcCurtainWall => [0.4, 0.6, 0.8],
        IfcType::IfcFurnishingElement => [0.8, 0.6, 0.4],
        IfcType::IfcBuildingElementProxy => [0.6, 0.6, 0.6],
        _ => NEUTRAL_GRAY,
    }
}
