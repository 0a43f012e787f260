// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EntityResolver implementation over STEP text

use crate::scanner::{EntityIndex, EntityScanner};
use crate::tokenizer::parse_entity;
use ifc_glb_model::{DecodedEntity, EntityId, EntityResolver, IfcType, ParseError, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Thread-safe, lazily decoding entity resolver
///
/// The text is scanned once up front; entities are tokenized the first time
/// they are asked for and cached afterwards.
pub struct StepResolver {
    /// Raw IFC content, shared so the resolver can cross threads
    content: Arc<str>,
    /// Entity ID -> (start, end) byte offsets
    index: EntityIndex,
    /// Type -> entity IDs, ascending
    type_index: FxHashMap<IfcType, Vec<EntityId>>,
    /// Decoded entity cache
    cache: RwLock<FxHashMap<u32, Arc<DecodedEntity>>>,
}

impl StepResolver {
    /// Scan `content` and build the ID and type indexes
    pub fn new(content: impl Into<Arc<str>>) -> Self {
        let content: Arc<str> = content.into();

        let mut index = EntityIndex::default();
        let mut types: FxHashMap<u32, IfcType> = FxHashMap::default();
        for entity in EntityScanner::new(&content) {
            index.insert(entity.id, (entity.start, entity.end));
            types.insert(entity.id, IfcType::parse(entity.type_name));
        }

        let mut type_index: FxHashMap<IfcType, Vec<EntityId>> = FxHashMap::default();
        for (id, ifc_type) in types {
            type_index.entry(ifc_type).or_default().push(EntityId(id));
        }
        for ids in type_index.values_mut() {
            ids.sort_unstable();
        }

        log::debug!(
            "indexed {} entities of {} types",
            index.len(),
            type_index.len()
        );

        Self {
            content,
            index,
            type_index,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Get raw content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Raw `#id=TYPE(...);` text of an entity
    pub fn raw_text(&self, id: EntityId) -> Option<&str> {
        let (start, end) = self.index.get(&id.0)?;
        Some(&self.content[*start..*end])
    }

    /// Decode an entity, reporting why it could not be
    pub fn decode(&self, id: EntityId) -> Result<Arc<DecodedEntity>> {
        if let Some(cached) = self.cache.read().get(&id.0) {
            return Ok(Arc::clone(cached));
        }

        let text = self.raw_text(id).ok_or(ParseError::EntityNotFound(id))?;
        let entity = Arc::new(parse_entity(text)?);

        self.cache.write().insert(id.0, Arc::clone(&entity));
        Ok(entity)
    }

    /// Number of entities decoded so far
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }
}

impl EntityResolver for StepResolver {
    fn get(&self, id: EntityId) -> Option<Arc<DecodedEntity>> {
        match self.decode(id) {
            Ok(entity) => Some(entity),
            Err(ParseError::EntityNotFound(_)) => None,
            Err(e) => {
                log::debug!("{e}");
                None
            }
        }
    }

    fn ids_by_type(&self, ifc_type: &IfcType) -> Vec<EntityId> {
        self.type_index.get(ifc_type).cloned().unwrap_or_default()
    }

    fn count_by_type(&self, ifc_type: &IfcType) -> usize {
        self.type_index.get(ifc_type).map_or(0, Vec::len)
    }

    fn entity_count(&self) -> usize {
        self.index.len()
    }
}
