// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene assembly: extraction records to meshes with materials
//!
//! Material refinements only touch appearance; positions and indices are
//! copied through unchanged.

use ifc_glb_geometry::compute_vertex_normals;
use ifc_glb_model::{ExtractedMaterial, ExtractionResult, NEUTRAL_GRAY};

/// Name of the material used for geometries whose type has none
pub const DEFAULT_MATERIAL_NAME: &str = "Default";

/// How a material blends with what is behind it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Blend,
}

/// Metallic-roughness material
#[derive(Clone, Debug, PartialEq)]
pub struct SceneMaterial {
    pub name: String,
    /// RGBA, alpha is opacity
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
}

impl SceneMaterial {
    /// Material for an extracted type, with the name-based refinements applied
    pub fn from_extracted(material: &ExtractedMaterial) -> Self {
        let [r, g, b] = material.color;
        let mut scene_material = Self {
            name: material.name.clone(),
            base_color: [r, g, b, 1.0],
            metallic: 0.0,
            roughness: 1.0,
            alpha_mode: AlphaMode::Opaque,
            double_sided: true,
        };

        let name = material.name.to_ascii_lowercase();
        if name.contains("window") {
            scene_material.alpha_mode = AlphaMode::Blend;
            scene_material.base_color[3] = 0.7;
        } else if name.contains("door") {
            scene_material.roughness = 0.8;
        } else if name.contains("beam") || name.contains("column") {
            scene_material.metallic = 0.1;
            scene_material.roughness = 0.6;
        }
        scene_material
    }

    /// Neutral material for geometries without a matching type material
    pub fn fallback() -> Self {
        Self::from_extracted(&ExtractedMaterial {
            name: DEFAULT_MATERIAL_NAME.to_string(),
            color: NEUTRAL_GRAY,
        })
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }
}

/// One placed mesh
#[derive(Clone, Debug, PartialEq)]
pub struct SceneMesh {
    /// `<type>_<express id>`
    pub name: String,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
    /// Index into [`SceneGraph::materials`]
    pub material: usize,
    /// Column-major node matrix
    pub transform: [f32; 16],
    /// Source element, carried as node metadata
    pub express_id: u32,
    pub ifc_type: String,
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Scene ready for export
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    pub name: String,
    pub materials: Vec<SceneMaterial>,
    pub meshes: Vec<SceneMesh>,
}

impl SceneGraph {
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Build a scene from one extraction result
///
/// Geometries with no vertices or indices are skipped, as are those whose
/// indices point past their vertex data. Materials are added in the order
/// their first mesh is kept, so a type with no surviving mesh has none. A
/// geometry whose type has no material is drawn with the default material.
pub fn assemble(result: &ExtractionResult) -> SceneGraph {
    let mut scene = SceneGraph {
        name: result.file_name.replacen(".ifc", "", 1),
        materials: Vec::with_capacity(result.materials.len()),
        meshes: Vec::with_capacity(result.geometries.len()),
    };
    // extracted material index -> scene material index
    let mut registered: Vec<Option<usize>> = vec![None; result.materials.len()];
    let mut default_material = None;

    for geometry in &result.geometries {
        let label = format!("{}_{}", geometry.type_tag, geometry.source_element_id.0);
        if geometry.is_empty() {
            log::debug!("{}: {label} has no triangles, skipped", result.file_name);
            continue;
        }
        let vertex_count = geometry.vertex_count() as u32;
        if let Some(bad) = geometry.indices.iter().find(|&&i| i >= vertex_count) {
            log::warn!(
                "{}: {label} index {bad} is past its {vertex_count} vertices, skipped",
                result.file_name
            );
            continue;
        }

        let material = match result
            .materials
            .iter()
            .position(|m| m.name == geometry.type_tag)
        {
            Some(index) => *registered[index].get_or_insert_with(|| {
                scene
                    .materials
                    .push(SceneMaterial::from_extracted(&result.materials[index]));
                scene.materials.len() - 1
            }),
            None => {
                log::warn!(
                    "{}: no material for type {}, using {DEFAULT_MATERIAL_NAME}",
                    result.file_name,
                    geometry.type_tag
                );
                *default_material.get_or_insert_with(|| {
                    scene.materials.push(SceneMaterial::fallback());
                    scene.materials.len() - 1
                })
            }
        };

        // trailing coordinates that do not form a vertex are dropped
        let positions = geometry.vertices[..geometry.vertex_count() * 3].to_vec();
        let normals = compute_vertex_normals(&positions, &geometry.indices);
        scene.meshes.push(SceneMesh {
            name: label,
            positions,
            normals,
            indices: geometry.indices.clone(),
            material,
            transform: geometry.transform,
            express_id: geometry.source_element_id.0,
            ifc_type: geometry.type_tag.clone(),
        });
    }

    log::debug!(
        "assembled {}: {} meshes, {} materials",
        scene.name,
        scene.meshes.len(),
        scene.materials.len()
    );
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ifc_glb_model::{
        translation_transform, BackendKind, EntityId, ExtractedGeometry, IDENTITY_TRANSFORM,
    };
    use pretty_assertions::assert_eq;

    fn triangle(id: u32, tag: &str) -> ExtractedGeometry {
        ExtractedGeometry {
            source_element_id: EntityId(id),
            type_tag: tag.to_string(),
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            transform: IDENTITY_TRANSFORM,
        }
    }

    fn material(name: &str) -> SceneMaterial {
        SceneMaterial::from_extracted(&ExtractedMaterial {
            name: name.to_string(),
            color: [0.5, 0.5, 0.5],
        })
    }

    #[test]
    fn test_refinements_by_name() {
        let window = material("IfcWindow");
        assert_eq!(window.alpha_mode, AlphaMode::Blend);
        assert_relative_eq!(window.base_color[3], 0.7);

        let door = material("IFCDOOR");
        assert_eq!(door.alpha_mode, AlphaMode::Opaque);
        assert_relative_eq!(door.roughness, 0.8);

        for name in ["IfcBeam", "IFCCOLUMN"] {
            let m = material(name);
            assert_relative_eq!(m.metallic, 0.1);
            assert_relative_eq!(m.roughness, 0.6);
        }

        let wall = material("IfcWall");
        assert_eq!((wall.metallic, wall.roughness), (0.0, 1.0));
        assert!(wall.double_sided);
        assert!(!wall.is_transparent());
    }

    #[test]
    fn test_first_refinement_wins() {
        // contains both "window" and "door"
        let m = material("IfcWindowDoorPanel");
        assert!(m.is_transparent());
        assert_relative_eq!(m.roughness, 1.0);
    }

    #[test]
    fn test_assembles_one_mesh_per_geometry() {
        let mut result = ExtractionResult::new("house.ifc", BackendKind::Native);
        let mut wall = triangle(12, "IfcWall");
        wall.transform = translation_transform(1.0, 2.0, 3.0);
        result.push_geometry(wall, [0.8, 0.8, 0.8]);
        result.push_geometry(triangle(13, "IfcWall"), [0.8, 0.8, 0.8]);
        result.push_geometry(triangle(20, "IfcWindow"), [0.3, 0.6, 0.8]);

        let scene = assemble(&result);
        assert_eq!(scene.name, "house");
        assert_eq!(scene.mesh_count(), 3);
        assert_eq!(scene.material_count(), 2);

        let first = &scene.meshes[0];
        assert_eq!(first.name, "IfcWall_12");
        assert_eq!((first.express_id, first.ifc_type.as_str()), (12, "IfcWall"));
        assert_eq!(&first.transform[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(first.positions, result.geometries[0].vertices);
        assert_eq!(first.indices, vec![0, 1, 2]);
        for n in first.normals.chunks(3) {
            assert_relative_eq!(n[2], 1.0);
        }
        assert_eq!(scene.meshes[2].material, 1);
        assert_eq!(scene.materials[1].base_color, [0.3, 0.6, 0.8, 0.7]);
    }

    #[test]
    fn test_missing_material_uses_default_once() {
        let mut result = ExtractionResult::new("a.ifc", BackendKind::Native);
        result.push_geometry(triangle(1, "IfcSlab"), [0.7, 0.7, 0.7]);
        result.geometries.push(triangle(2, "IfcRamp"));
        result.geometries.push(triangle(3, "IfcRamp"));

        let scene = assemble(&result);
        assert_eq!(scene.mesh_count(), 3);
        assert_eq!(scene.material_count(), 2);
        assert_eq!(scene.materials[1].name, DEFAULT_MATERIAL_NAME);
        assert_eq!(scene.materials[1].base_color, [0.7, 0.7, 0.7, 1.0]);
        assert_eq!(scene.meshes[1].material, 1);
        assert_eq!(scene.meshes[2].material, 1);
    }

    #[test]
    fn test_skips_unusable_geometry() {
        let mut result = ExtractionResult::new("a.ifc", BackendKind::Native);
        let mut empty = triangle(1, "IfcWall");
        empty.indices.clear();
        let mut dangling = triangle(2, "IfcWall");
        dangling.indices = vec![0, 1, 3];
        result.push_geometry(empty, [0.8, 0.8, 0.8]);
        result.push_geometry(dangling, [0.8, 0.8, 0.8]);
        result.push_geometry(triangle(3, "IfcWall"), [0.8, 0.8, 0.8]);

        let scene = assemble(&result);
        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.meshes[0].express_id, 3);
    }

    #[test]
    fn test_types_without_kept_meshes_have_no_material() {
        let mut result = ExtractionResult::new("a.ifc", BackendKind::Native);
        let mut dangling = triangle(1, "IfcDoor");
        dangling.indices = vec![0, 1, 9];
        result.push_geometry(dangling, [0.6, 0.4, 0.2]);
        result.push_geometry(triangle(2, "IfcSlab"), [0.7, 0.7, 0.7]);
        result.push_geometry(triangle(3, "IfcWall"), [0.8, 0.8, 0.8]);
        assert_eq!(result.materials.len(), 3);

        let scene = assemble(&result);
        let names: Vec<&str> = scene.materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["IfcSlab", "IfcWall"]);
        assert_eq!(scene.meshes[0].material, 0);
        assert_eq!(scene.meshes[1].material, 1);
    }

    #[test]
    fn test_empty_result() {
        let scene = assemble(&ExtractionResult::new("none.ifc", BackendKind::Fallback));
        assert!(scene.is_empty());
        assert_eq!(scene.name, "none");
    }
}
