// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity resolution trait for looking up and resolving IFC entities

use crate::{AttributeValue, DecodedEntity, EntityId, IfcType};
use std::sync::Arc;

/// Entity lookup and reference resolution
///
/// Implementations should provide O(1) lookup by entity ID. Geometry code
/// only ever talks to this trait, never to a concrete parser.
///
/// # Example
///
/// ```ignore
/// use ifc_glb_model::{EntityResolver, EntityId};
///
/// fn placement_of(resolver: &dyn EntityResolver, wall_id: EntityId) {
///     if let Some(wall) = resolver.get(wall_id) {
///         if let Some(placement) = wall.get(5).and_then(|a| resolver.resolve_ref(a)) {
///             println!("placed by {:?}", placement.ifc_type);
///         }
///     }
/// }
/// ```
pub trait EntityResolver: Send + Sync {
    /// Get entity by ID
    fn get(&self, id: EntityId) -> Option<Arc<DecodedEntity>>;

    /// Resolve an entity reference from an attribute value
    fn resolve_ref(&self, attr: &AttributeValue) -> Option<Arc<DecodedEntity>> {
        match attr {
            AttributeValue::EntityRef(id) => self.get(*id),
            _ => None,
        }
    }

    /// Resolve every reference in a list attribute, skipping dangling ones
    fn resolve_ref_list(&self, attr: &AttributeValue) -> Vec<Arc<DecodedEntity>> {
        match attr {
            AttributeValue::List(items) => items
                .iter()
                .filter_map(|item| self.resolve_ref(item))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// IDs of all entities of a type, in ascending ID order
    fn ids_by_type(&self, ifc_type: &IfcType) -> Vec<EntityId>;

    /// Count entities of a type without decoding them
    fn count_by_type(&self, ifc_type: &IfcType) -> usize {
        self.ids_by_type(ifc_type).len()
    }

    /// Total number of entities in the DATA section
    fn entity_count(&self) -> usize;
}
