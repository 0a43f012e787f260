// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ParsedModel - an opened IFC file

use crate::resolver::StepResolver;
use crate::scanner::{data_section_start, parse_header};
use crate::units::extract_unit_scale;

use ifc_glb_model::{EntityResolver, ModelMetadata, ParseError, Result};
use std::sync::Arc;

/// STEP physical file magic
const STEP_MAGIC: &str = "ISO-10303-21";

/// An opened IFC model
///
/// Holds the entity resolver together with the values every geometry
/// extraction needs: the length unit scale and the header metadata.
pub struct ParsedModel {
    resolver: Arc<StepResolver>,
    unit_scale: f64,
    metadata: ModelMetadata,
}

impl ParsedModel {
    /// Open a model from raw file bytes
    ///
    /// The bytes must be UTF-8 STEP text with the `ISO-10303-21` magic and a
    /// DATA section.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| ParseError::format(format!("file is not UTF-8 text: {e}")))?;
        Self::parse_str(content)
    }

    /// Open a model from STEP text
    pub fn parse_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(ParseError::format("file is empty"));
        }
        if !content.trim_start().starts_with(STEP_MAGIC) {
            return Err(ParseError::format(format!(
                "missing {STEP_MAGIC} header"
            )));
        }
        if data_section_start(content).is_none() {
            return Err(ParseError::format("missing DATA section"));
        }

        let metadata = parse_header(content);
        let resolver = Arc::new(StepResolver::new(content));
        let unit_scale = extract_unit_scale(resolver.as_ref());

        log::debug!(
            "opened {} model: {} entities, unit scale {unit_scale}",
            if metadata.schema_version.is_empty() {
                "unknown schema"
            } else {
                metadata.schema_version.as_str()
            },
            resolver.entity_count(),
        );

        Ok(Self {
            resolver,
            unit_scale,
            metadata,
        })
    }

    /// Entity lookups
    pub fn resolver(&self) -> &dyn EntityResolver {
        self.resolver.as_ref()
    }

    /// File length units to metres
    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    /// Header metadata
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Number of entities in the DATA section
    pub fn entity_count(&self) -> usize {
        self.resolver.entity_count()
    }
}
