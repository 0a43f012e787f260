// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Native backend: typed element extraction through the geometry engine

use ifc_glb_geometry::GeometryRouter;
use ifc_glb_model::{
    color_for_type, BackendKind, EntityId, EntityResolver, ExtractedGeometry, ExtractionResult,
    IfcParser, IfcType, ParseError, ProgressCallback, Result,
};

/// Element types the native backend extracts, in extraction order
pub const NATIVE_ELEMENT_TYPES: [IfcType; 14] = [
    IfcType::IfcWall,
    IfcType::IfcWallStandardCase,
    IfcType::IfcSlab,
    IfcType::IfcBeam,
    IfcType::IfcColumn,
    IfcType::IfcDoor,
    IfcType::IfcWindow,
    IfcType::IfcFurnishingElement,
    IfcType::IfcBuildingElementProxy,
    IfcType::IfcRoof,
    IfcType::IfcStair,
    IfcType::IfcRailing,
    IfcType::IfcPlate,
    IfcType::IfcMember,
];

/// Default cap on elements extracted per type
pub const DEFAULT_MAX_ELEMENTS_PER_TYPE: usize = 100;

/// Logs the lifetime of an opened model
struct OpenModel<'a> {
    file_name: &'a str,
}

impl<'a> OpenModel<'a> {
    fn new(file_name: &'a str, entity_count: usize) -> Self {
        log::debug!("opened IFC model {file_name} ({entity_count} entities)");
        Self { file_name }
    }
}

impl Drop for OpenModel<'_> {
    fn drop(&mut self) {
        log::debug!("closed IFC model {}", self.file_name);
    }
}

/// Backend that opens the file as a STEP model and meshes every supported
/// element's body representation
#[derive(Clone, Debug)]
pub struct NativeBackend {
    max_elements_per_type: usize,
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ELEMENTS_PER_TYPE)
    }
}

impl NativeBackend {
    /// Create a backend extracting at most `max_elements_per_type` elements of each type
    pub fn new(max_elements_per_type: usize) -> Self {
        Self {
            max_elements_per_type,
        }
    }

    /// Mesh one element; `Ok(None)` when it has nothing to draw
    fn extract_element(
        &self,
        router: &GeometryRouter,
        resolver: &dyn EntityResolver,
        id: EntityId,
    ) -> Result<Option<ExtractedGeometry>> {
        let element = resolver
            .get(id)
            .ok_or_else(|| ParseError::element_extraction(id, "element could not be decoded"))?;

        let mesh = router
            .process_element(&element, resolver)
            .map_err(|e| ParseError::element_extraction(id, e.to_string()))?;
        if mesh.positions.is_empty() {
            return Ok(None);
        }

        let placement = router
            .element_transform(&element, resolver)
            .map_err(|e| ParseError::element_extraction(id, e.to_string()))?;
        // nalgebra stores matrices column-major
        let mut transform = [0.0f32; 16];
        for (dst, src) in transform.iter_mut().zip(placement.iter()) {
            *dst = *src as f32;
        }

        Ok(Some(ExtractedGeometry {
            source_element_id: id,
            type_tag: element.ifc_type.class_name().to_string(),
            vertices: mesh.positions,
            indices: mesh.indices,
            transform,
        }))
    }
}

impl IfcParser for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn parse_with_progress(
        &self,
        content: &[u8],
        file_name: &str,
        on_progress: ProgressCallback<'_>,
    ) -> Result<ExtractionResult> {
        on_progress(25, "Opening IFC model");
        let model = ifc_glb_parser::parse(content)?;
        let _open = OpenModel::new(file_name, model.entity_count());

        on_progress(35, "Extracting geometries");
        let resolver = model.resolver();
        let router = GeometryRouter::with_default_processors_and_unit_scale(model.unit_scale());

        let mut result = ExtractionResult::new(file_name, BackendKind::Native);
        result.stats.entities_scanned = model.entity_count();

        let total_types = NATIVE_ELEMENT_TYPES.len();
        for (processed, ifc_type) in NATIVE_ELEMENT_TYPES.iter().enumerate() {
            let ids = resolver.ids_by_type(ifc_type);
            if ids.is_empty() {
                continue;
            }

            let percent = 35 + (processed * 40 / total_types) as u8;
            on_progress(
                percent,
                &format!(
                    "Processing {} elements of type {}",
                    ids.len(),
                    ifc_type.class_name()
                ),
            );

            for id in ids.into_iter().take(self.max_elements_per_type) {
                match self.extract_element(&router, resolver, id) {
                    Ok(Some(geometry)) => {
                        let color = color_for_type(&geometry.type_tag);
                        result.push_geometry(geometry, color);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!("{file_name}: {e}");
                        result.stats.skipped_elements += 1;
                    }
                }
            }
        }

        on_progress(75, "Geometry extraction complete");
        log::debug!(
            "{file_name}: {} geometries, {} skipped",
            result.geometries.len(),
            result.stats.skipped_elements
        );
        Ok(result)
    }
}
