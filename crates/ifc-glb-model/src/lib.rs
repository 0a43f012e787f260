// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-GLB Model - Shared types and traits for the IFC to GLB converter
//!
//! This crate holds everything the parsing strategies and the conversion
//! pipeline agree on, so that neither side depends on the other's internals.
//!
//! # Architecture
//!
//! - [`IfcParser`] - A parsing strategy (backend) turning IFC bytes into an
//!   [`ExtractionResult`]
//! - [`EntityResolver`] - Entity lookup and reference resolution over a
//!   decoded STEP model
//! - [`ExtractedGeometry`] / [`ExtractedMaterial`] - The records a backend
//!   produces and the assembler consumes
//! - [`palette`] - The type to colour table shared by both backends
//!
//! # Example
//!
//! ```ignore
//! use ifc_glb_model::IfcParser;
//!
//! let backend: Box<dyn IfcParser> = select_backend();
//! let result = backend.parse(&bytes, "house.ifc")?;
//! println!("{} geometries", result.geometries.len());
//! ```

pub mod error;
pub mod extraction;
pub mod palette;
pub mod resolver;
pub mod traits;
pub mod types;

pub use error::*;
pub use extraction::*;
pub use palette::{color_for_type, NEUTRAL_GRAY};
pub use resolver::*;
pub use traits::*;
pub use types::*;
