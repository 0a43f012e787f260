// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors raised while meshing an element

use ifc_glb_model::{EntityId, IfcType};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Meshing step that gave up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Placement, direction and representation decoding
    Geometry,
    /// 2D profile construction
    Profile,
    /// Polygon triangulation
    Triangulation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Geometry => "geometry",
            Stage::Profile => "profile",
            Stage::Triangulation => "triangulation",
        })
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum Error {
    #[error("{stage}: {message}")]
    Failed { stage: Stage, message: String },

    /// A reference pointed at an id the file never declares
    #[error("{0} is referenced but not declared")]
    EntityNotFound(EntityId),

    #[error("attribute {index}: {message}")]
    InvalidAttribute { index: usize, message: String },

    /// No processor knows how to mesh this representation item
    #[error("no mesher for {0}")]
    UnsupportedType(String),
}

impl Error {
    fn failed(stage: Stage, message: impl Into<String>) -> Self {
        Error::Failed {
            stage,
            message: message.into(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::failed(Stage::Geometry, message)
    }

    pub fn profile(message: impl Into<String>) -> Self {
        Self::failed(Stage::Profile, message)
    }

    pub fn triangulation(message: impl Into<String>) -> Self {
        Self::failed(Stage::Triangulation, message)
    }

    pub fn invalid_attribute(index: usize, message: impl Into<String>) -> Self {
        Error::InvalidAttribute {
            index,
            message: message.into(),
        }
    }

    pub fn unsupported_type(ifc_type: &IfcType) -> Self {
        Error::UnsupportedType(ifc_type.class_name().to_string())
    }

    /// Step that failed, if the error came from one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::profile("radius must be positive").to_string(),
            "profile: radius must be positive"
        );
        assert_eq!(
            Error::EntityNotFound(EntityId(42)).to_string(),
            "#42 is referenced but not declared"
        );
        assert_eq!(Error::triangulation("x").stage(), Some(Stage::Triangulation));
        assert_eq!(Error::invalid_attribute(3, "expected a list").stage(), None);
    }
}
