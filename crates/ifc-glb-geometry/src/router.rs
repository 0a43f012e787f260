// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Representation item dispatch
//!
//! Items go to the processor registered for their type. `IfcMappedItem` is
//! expanded here, and lengths are converted to metres once per element.

use crate::placement::{axis2_placement, local_placement, scale_translation, transformation_operator};
use crate::{Error, Mesh, Result};
use ifc_glb_model::{DecodedEntity, EntityId, EntityResolver, IfcType};
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::sync::Arc;

/// Nesting limit for mapped items that map other mapped items
const MAX_MAPPING_DEPTH: usize = 8;

/// Meshes one family of representation items
///
/// Lookups go through [`EntityResolver`], so processors never see the parser.
pub trait GeometryProcessor: Send + Sync {
    /// Mesh in the item's own coordinate system, in file units
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh>;

    fn supported_types(&self) -> Vec<IfcType>;
}

/// Element mesher for one model
///
/// Holds a cache of representation map meshes, so one router serves one
/// model on one thread.
pub struct GeometryRouter {
    processors: FxHashMap<IfcType, Arc<dyn GeometryProcessor>>,
    /// Representation map id -> mesh placed at the map origin
    maps: RefCell<FxHashMap<EntityId, Arc<Mesh>>>,
    /// Length unit in metres (0.001 for millimetre files)
    unit_scale: f64,
}

impl GeometryRouter {
    /// Router with nothing registered, working in metres
    pub fn new() -> Self {
        Self {
            processors: FxHashMap::default(),
            maps: RefCell::new(FxHashMap::default()),
            unit_scale: 1.0,
        }
    }

    /// Extrusions, triangulated face sets and faceted breps
    pub fn with_default_processors() -> Self {
        use crate::processors::{
            ExtrudedAreaSolidProcessor, FacetedBrepProcessor, TriangulatedFaceSetProcessor,
        };

        let mut router = Self::new();
        router.register(Arc::new(ExtrudedAreaSolidProcessor::new()));
        router.register(Arc::new(TriangulatedFaceSetProcessor::new()));
        router.register(Arc::new(FacetedBrepProcessor::new()));
        router
    }

    pub fn with_unit_scale(mut self, unit_scale: f64) -> Self {
        self.unit_scale = unit_scale;
        self
    }

    pub fn with_default_processors_and_unit_scale(unit_scale: f64) -> Self {
        Self::with_default_processors().with_unit_scale(unit_scale)
    }

    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    /// Route every type the processor claims to it, replacing earlier claims
    pub fn register(&mut self, processor: Arc<dyn GeometryProcessor>) {
        for ifc_type in processor.supported_types() {
            self.processors.insert(ifc_type, Arc::clone(&processor));
        }
    }

    pub fn has_processor(&self, ifc_type: &IfcType) -> bool {
        *ifc_type == IfcType::IfcMappedItem || self.processors.contains_key(ifc_type)
    }

    /// Process a single representation item, in file units
    pub fn process_representation_item(
        &self,
        entity: &DecodedEntity,
        resolver: &dyn EntityResolver,
    ) -> Result<Mesh> {
        self.process_item(entity, resolver, 0)
    }

    fn process_item(
        &self,
        entity: &DecodedEntity,
        resolver: &dyn EntityResolver,
        depth: usize,
    ) -> Result<Mesh> {
        if entity.ifc_type == IfcType::IfcMappedItem {
            return self.process_mapped_item(entity, resolver, depth);
        }

        let processor = self
            .processors
            .get(&entity.ifc_type)
            .ok_or_else(|| Error::unsupported_type(&entity.ifc_type))?;
        processor.process(entity, resolver)
    }

    /// Expand an `IfcMappedItem`: the map's geometry placed at its origin,
    /// then moved by the mapping target
    fn process_mapped_item(
        &self,
        mapped_item: &DecodedEntity,
        resolver: &dyn EntityResolver,
        depth: usize,
    ) -> Result<Mesh> {
        if depth >= MAX_MAPPING_DEPTH {
            return Err(Error::geometry(format!(
                "mapped items nested deeper than {MAX_MAPPING_DEPTH} at {}",
                mapped_item.id
            )));
        }

        // MappingSource at index 0, MappingTarget at index 1
        let source_id = mapped_item
            .get_ref(0)
            .ok_or_else(|| Error::invalid_attribute(0, "Missing MappingSource"))?;
        let source = self.representation_map(source_id, resolver, depth)?;

        let mut mesh = (*source).clone();
        if let Some(target) = mapped_item.get_ref(1) {
            mesh.transform(&transformation_operator(resolver, target)?);
        }
        Ok(mesh)
    }

    fn representation_map(
        &self,
        map_id: EntityId,
        resolver: &dyn EntityResolver,
        depth: usize,
    ) -> Result<Arc<Mesh>> {
        if let Some(cached) = self.maps.borrow().get(&map_id) {
            return Ok(Arc::clone(cached));
        }

        let map = resolver.get(map_id).ok_or(Error::EntityNotFound(map_id))?;
        if map.ifc_type != IfcType::IfcRepresentationMap {
            return Err(Error::geometry(format!(
                "{map_id} is {}, expected IfcRepresentationMap",
                map.ifc_type.class_name()
            )));
        }

        // MappingOrigin at index 0, MappedRepresentation at index 1
        let representation_id = map
            .get_ref(1)
            .ok_or_else(|| Error::invalid_attribute(1, "Missing MappedRepresentation"))?;
        let representation = resolver
            .get(representation_id)
            .ok_or(Error::EntityNotFound(representation_id))?;

        let mut mesh = self.process_items(&representation, resolver, depth + 1)?;
        if let Some(origin) = map.get_ref(0) {
            mesh.transform(&axis2_placement(resolver, origin)?);
        }

        let mesh = Arc::new(mesh);
        self.maps.borrow_mut().insert(map_id, Arc::clone(&mesh));
        Ok(mesh)
    }

    /// Process a building element's body geometry
    ///
    /// Follows Element -> ProductDefinitionShape -> ShapeRepresentation ->
    /// Items and returns the merged mesh in the element's local coordinate
    /// system, in metres. Items that fail are skipped; if none succeeds the
    /// first failure is returned.
    pub fn process_element(
        &self,
        element: &DecodedEntity,
        resolver: &dyn EntityResolver,
    ) -> Result<Mesh> {
        let mut combined = Mesh::new();

        // Representation at index 6
        let Some(shape_id) = element.get_ref(6) else {
            return Ok(combined);
        };
        let shape = resolver.get(shape_id).ok_or(Error::EntityNotFound(shape_id))?;

        let mut first_error = None;
        // Representations at index 1
        for rep_id in shape.get_refs(1).unwrap_or_default() {
            let Some(rep) = resolver.get(rep_id) else {
                continue;
            };

            // RepresentationIdentifier at index 1
            if let Some(identifier) = rep.get_string(1) {
                if identifier != "Body" && identifier != "Facetation" {
                    continue;
                }
            }

            match self.process_items(&rep, resolver, 0) {
                Ok(mesh) => combined.merge(&mesh),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if combined.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        combined.scale(self.unit_scale);
        Ok(combined)
    }

    /// Merge all items of an `IfcShapeRepresentation` (Items at index 3)
    fn process_items(
        &self,
        representation: &DecodedEntity,
        resolver: &dyn EntityResolver,
        depth: usize,
    ) -> Result<Mesh> {
        let mut combined = Mesh::new();
        let mut first_error = None;

        for item_id in representation.get_refs(3).unwrap_or_default() {
            let result = resolver
                .get(item_id)
                .ok_or(Error::EntityNotFound(item_id))
                .and_then(|item| self.process_item(&item, resolver, depth));
            match result {
                Ok(mesh) => combined.merge(&mesh),
                Err(e) => {
                    log::debug!("skipping representation item {item_id}: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if combined.is_empty() => Err(e),
            _ => Ok(combined),
        }
    }

    /// Absolute placement of an element (ObjectPlacement at index 5), with
    /// the translation converted to metres
    ///
    /// Elements without a placement sit at the origin.
    pub fn element_transform(
        &self,
        element: &DecodedEntity,
        resolver: &dyn EntityResolver,
    ) -> Result<Matrix4<f64>> {
        match element.get_ref(5) {
            Some(placement) => Ok(scale_translation(
                &local_placement(resolver, placement)?,
                self.unit_scale,
            )),
            None => Ok(Matrix4::identity()),
        }
    }
}

impl Default for GeometryRouter {
    fn default() -> Self {
        Self::new()
    }
}
