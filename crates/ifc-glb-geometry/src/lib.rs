// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Geometry Processing
//!
//! Turns IFC body representations into triangle meshes ready for glTF.
//! Entity lookup goes through the `EntityResolver` trait from
//! `ifc-glb-model`, so the crate does not depend on a particular parser.
//!
//! ## Overview
//!
//! - **Profiles**: rectangle, circle and arbitrary (with voids) profiles
//! - **Extrusion**: closed solids from extruded profiles
//! - **Triangulation**: polygons with holes via earcutr
//! - **Placement**: `IfcLocalPlacement` chains and mapping operators
//! - **Router**: per-type dispatch through `GeometryProcessor`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_glb_geometry::{extrude_profile, Profile2D};
//!
//! let profile = Profile2D::rectangle(2.0, 1.0);
//! let mesh = extrude_profile(&profile, 3.0, None)?;
//!
//! println!("Generated {} triangles", mesh.triangle_count());
//! ```

pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod placement;
pub mod processors;
pub mod profile;
pub mod router;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};

// Re-export main types
pub use error::{Error, Result, Stage};
pub use extrusion::extrude_profile;
pub use mesh::{compute_vertex_normals, Mesh};
pub use placement::{
    axis2_placement, local_placement, scale_translation, transformation_operator,
};
pub use profile::{calculate_circle_segments, Profile2D, Triangulation};
pub use router::{GeometryProcessor, GeometryRouter};
pub use triangulation::{
    polygon_normal, signed_area, triangulate_polygon, triangulate_polygon_with_holes, PlaneBasis,
};

// Re-export processors
pub use processors::{
    ExtrudedAreaSolidProcessor, FacetedBrepProcessor, TriangulatedFaceSetProcessor,
};
