// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction records
//!
//! A backend turns one IFC file into an [`ExtractionResult`]: flat vertex and
//! index buffers per element plus one material per distinct element type.
//! The records are plain data so they can cross the parse thread boundary.

use crate::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Column-major 4x4 identity matrix
pub const IDENTITY_TRANSFORM: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

/// Column-major translation matrix
pub fn translation_transform(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut m = IDENTITY_TRANSFORM;
    m[12] = x;
    m[13] = y;
    m[14] = z;
    m
}

/// Which parsing strategy produced a result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Full typed-element extraction through an IFC engine
    Native,
    /// Line scan with primitive-shape substitution
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Geometry of one model element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedGeometry {
    /// Express ID of the originating element
    pub source_element_id: EntityId,
    /// Semantic element type, e.g. `IfcWall` or `IFCWALL`
    pub type_tag: String,
    /// Flattened positions [x, y, z, ...]
    pub vertices: Vec<f32>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
    /// Column-major placement in model space
    pub transform: [f32; 16],
}

impl ExtractedGeometry {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True if there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }
}

/// Material for one element type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMaterial {
    /// The type tag this material represents
    pub name: String,
    /// RGB, 0.0-1.0
    pub color: [f32; 3],
}

/// Counters a backend reports alongside its records
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Entities seen while scanning the file
    pub entities_scanned: usize,
    /// Elements skipped because extraction failed
    pub skipped_elements: usize,
}

/// Everything one backend run produced for one file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Source file name
    pub file_name: String,
    /// Strategy that produced the records
    pub backend: BackendKind,
    /// One entry per extracted element
    pub geometries: Vec<ExtractedGeometry>,
    /// One entry per distinct geometry type tag
    pub materials: Vec<ExtractedMaterial>,
    /// Extraction counters
    pub stats: ExtractionStats,
}

impl ExtractionResult {
    /// Create an empty result
    pub fn new(file_name: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            file_name: file_name.into(),
            backend,
            geometries: Vec::new(),
            materials: Vec::new(),
            stats: ExtractionStats::default(),
        }
    }

    /// Append a geometry, registering a material for its type the first time
    /// the type is seen
    pub fn push_geometry(&mut self, geometry: ExtractedGeometry, color: [f32; 3]) {
        if !self.has_material(&geometry.type_tag) {
            self.materials.push(ExtractedMaterial {
                name: geometry.type_tag.clone(),
                color,
            });
        }
        self.geometries.push(geometry);
    }

    /// Look up the material registered for a type tag
    pub fn material(&self, name: &str) -> Option<&ExtractedMaterial> {
        self.materials.iter().find(|m| m.name == name)
    }

    fn has_material(&self, name: &str) -> bool {
        self.material(name).is_some()
    }

    /// Distinct geometry type tags in first-seen order
    pub fn type_tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.geometries
            .iter()
            .map(|g| g.type_tag.as_str())
            .filter(|tag| seen.insert(*tag))
            .collect()
    }

    /// True if material names are exactly the distinct geometry type tags
    pub fn is_paired(&self) -> bool {
        let tags: HashSet<&str> = self.type_tags().into_iter().collect();
        let names: HashSet<&str> = self.materials.iter().map(|m| m.name.as_str()).collect();
        tags == names && names.len() == self.materials.len()
    }
}
