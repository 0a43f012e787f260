// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-GLB Parser - STEP text to decoded IFC entities
//!
//! This crate opens IFC (STEP) files for the native conversion backend. It
//! implements the [`EntityResolver`](ifc_glb_model::EntityResolver) trait from
//! `ifc-glb-model`, so the geometry engine never sees STEP text.
//!
//! # Features
//!
//! - **Fast tokenization** using `nom` combinators
//! - **SIMD-accelerated scanning** using `memchr`
//! - **Lazy entity decoding** - only parse entities when needed
//! - **Arc-based caching** behind a `parking_lot` lock
//! - **Unit scale** from the project's length unit
//!
//! # Example
//!
//! ```ignore
//! use ifc_glb_model::{EntityResolver, IfcType};
//!
//! let model = ifc_glb_parser::parse(&bytes)?;
//! let walls = model.resolver().ids_by_type(&IfcType::IfcWall);
//! println!("Found {} walls", walls.len());
//! ```

mod model;
mod resolver;
mod scanner;
mod tokenizer;
mod units;

pub use model::ParsedModel;
pub use resolver::StepResolver;
pub use scanner::{data_section_start, parse_header, EntityIndex, EntityScanner, ScannedEntity};
pub use tokenizer::{parse_arguments, parse_entity, Token};
pub use units::{extract_unit_scale, si_prefix_scale};

use ifc_glb_model::Result;

/// Open a model from raw file bytes
pub fn parse(bytes: &[u8]) -> Result<ParsedModel> {
    ParsedModel::parse(bytes)
}
