// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GLB export
//!
//! The glTF document is built with `gltf-json` and packed by hand into a
//! single binary container:
//!
//! ```text
//! header   magic "glTF" | version 2 | total length
//! chunk 0  length | "JSON" | document, padded with spaces
//! chunk 1  length | "BIN\0" | buffer, padded with zeros (omitted when empty)
//! ```

use crate::assembler::{AlphaMode, SceneGraph, SceneMaterial, SceneMesh};
use crate::config::ExportOptions;
use gltf_json::accessor::{ComponentType, GenericComponentType, Type};
use gltf_json::validation::Checked::Valid;
use gltf_json::validation::USize64;
use gltf_json::Index;
use std::collections::BTreeMap;
use thiserror::Error;

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// The scene could not be serialized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Export failed: {0}")]
pub struct ExportError(String);

impl ExportError {
    pub fn new(msg: impl Into<String>) -> Self {
        ExportError(msg.into())
    }

    /// Message without the "Export failed" prefix
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Serializes an assembled scene into one contiguous buffer
pub trait SceneExporter: Send {
    fn export(&self, scene: &SceneGraph) -> Result<Vec<u8>, ExportError>;
}

/// Binary glTF 2.0 exporter
#[derive(Clone, Debug, Default)]
pub struct GltfBinaryExporter {
    options: ExportOptions,
}

impl GltfBinaryExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    fn check_options(&self) -> Result<(), ExportError> {
        if !self.options.binary {
            return Err(ExportError::new(
                "only binary packaging is supported; set export.binary",
            ));
        }
        if self.options.max_texture_size == 0 {
            return Err(ExportError::new("max_texture_size must be greater than zero"));
        }
        Ok(())
    }

    /// Vertices the mesh writes: all of them, or only up to the highest index drawn
    fn draw_range(&self, mesh: &SceneMesh) -> usize {
        if self.options.truncate_draw_range {
            mesh.indices.iter().max().map_or(0, |&i| i as usize + 1)
        } else {
            mesh.vertex_count()
        }
    }
}

impl SceneExporter for GltfBinaryExporter {
    fn export(&self, scene: &SceneGraph) -> Result<Vec<u8>, ExportError> {
        self.check_options()?;
        for mesh in &scene.meshes {
            validate_mesh(mesh, scene.materials.len())?;
        }

        let mut root = gltf_json::Root {
            asset: gltf_json::Asset {
                generator: Some(format!("ifc-glb {}", env!("CARGO_PKG_VERSION"))),
                ..gltf_json::Asset::default()
            },
            ..gltf_json::Root::default()
        };

        let materials: Vec<Index<gltf_json::Material>> = scene
            .materials
            .iter()
            .map(|m| root.push(material_json(m)))
            .collect();

        // the single buffer is pushed once its length is known
        let buffer = Index::<gltf_json::Buffer>::new(0);
        let mut bin = Vec::new();
        let mut nodes = Vec::with_capacity(scene.meshes.len());

        for mesh in &scene.meshes {
            let range = self.draw_range(mesh);
            let positions = &mesh.positions[..range * 3];
            let normals = &mesh.normals[..range * 3];

            let position_view = push_view(
                &mut root,
                &mut bin,
                buffer,
                f32_bytes(positions),
                format!("{} positions", mesh.name),
                gltf_json::buffer::Target::ArrayBuffer,
            );
            let normal_view = push_view(
                &mut root,
                &mut bin,
                buffer,
                f32_bytes(normals),
                format!("{} normals", mesh.name),
                gltf_json::buffer::Target::ArrayBuffer,
            );
            let index_view = push_view(
                &mut root,
                &mut bin,
                buffer,
                mesh.indices.iter().flat_map(|i| i.to_le_bytes()).collect(),
                format!("{} indices", mesh.name),
                gltf_json::buffer::Target::ElementArrayBuffer,
            );

            let [min, max] = vec3_minmax(positions);
            let position_accessor = root.push(accessor(
                position_view,
                range,
                ComponentType::F32,
                Type::Vec3,
                [min, max],
                format!("{} positions", mesh.name),
            ));
            let normal_accessor = root.push(accessor(
                normal_view,
                range,
                ComponentType::F32,
                Type::Vec3,
                [None, None],
                format!("{} normals", mesh.name),
            ));
            let index_accessor = root.push(accessor(
                index_view,
                mesh.indices.len(),
                ComponentType::U32,
                Type::Scalar,
                [None, None],
                format!("{} indices", mesh.name),
            ));

            let mesh_index = root.push(gltf_json::Mesh {
                name: Some(mesh.name.clone()),
                primitives: vec![gltf_json::mesh::Primitive {
                    attributes: BTreeMap::from([
                        (Valid(gltf_json::mesh::Semantic::Positions), position_accessor),
                        (Valid(gltf_json::mesh::Semantic::Normals), normal_accessor),
                    ]),
                    indices: Some(index_accessor),
                    material: Some(materials[mesh.material]),
                    mode: Valid(gltf_json::mesh::Mode::Triangles),
                    targets: None,
                    extensions: Default::default(),
                    extras: Default::default(),
                }],
                weights: None,
                extensions: Default::default(),
                extras: Default::default(),
            });

            nodes.push(root.push(gltf_json::Node {
                mesh: Some(mesh_index),
                matrix: Some(mesh.transform),
                extras: node_extras(mesh)?,
                ..empty_node(Some(mesh.name.clone()))
            }));
        }

        if !bin.is_empty() {
            root.push(gltf_json::Buffer {
                byte_length: USize64::from(bin.len()),
                name: Some(scene.name.clone()),
                uri: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
        }

        let scene_index = root.push(gltf_json::Scene {
            name: Some(scene.name.clone()),
            nodes,
            extras: Default::default(),
            extensions: None,
        });
        root.scene = Some(scene_index);

        let json = serde_json::to_vec(&root)
            .map_err(|e| ExportError::new(format!("glTF JSON serialization: {e}")))?;
        let glb = pack_glb(&json, &bin)?;
        log::debug!(
            "exported {}: {} nodes, {} bytes",
            scene.name,
            scene.meshes.len(),
            glb.len()
        );
        Ok(glb)
    }
}

fn validate_mesh(mesh: &SceneMesh, material_count: usize) -> Result<(), ExportError> {
    let fail = |what: String| Err(ExportError::new(format!("mesh {}: {what}", mesh.name)));

    if mesh.positions.is_empty() || mesh.positions.len() % 3 != 0 {
        return fail(format!("{} position values", mesh.positions.len()));
    }
    if mesh.normals.len() != mesh.positions.len() {
        return fail(format!(
            "{} normal values for {} position values",
            mesh.normals.len(),
            mesh.positions.len()
        ));
    }
    if mesh.indices.is_empty() || mesh.indices.len() % 3 != 0 {
        return fail(format!("{} indices do not form triangles", mesh.indices.len()));
    }
    let vertex_count = mesh.vertex_count();
    if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return fail(format!("index {bad} out of range for {vertex_count} vertices"));
    }
    if mesh.material >= material_count {
        return fail(format!("material {} does not exist", mesh.material));
    }
    Ok(())
}

fn material_json(material: &SceneMaterial) -> gltf_json::Material {
    gltf_json::Material {
        name: Some(material.name.clone()),
        alpha_mode: Valid(match material.alpha_mode {
            AlphaMode::Opaque => gltf_json::material::AlphaMode::Opaque,
            AlphaMode::Blend => gltf_json::material::AlphaMode::Blend,
        }),
        double_sided: material.double_sided,
        pbr_metallic_roughness: gltf_json::material::PbrMetallicRoughness {
            base_color_factor: gltf_json::material::PbrBaseColorFactor(material.base_color),
            metallic_factor: gltf_json::material::StrengthFactor(material.metallic),
            roughness_factor: gltf_json::material::StrengthFactor(material.roughness),
            ..Default::default()
        },
        ..gltf_json::Material::default()
    }
}

fn node_extras(mesh: &SceneMesh) -> Result<gltf_json::extras::Extras, ExportError> {
    let raw = serde_json::value::to_raw_value(&serde_json::json!({
        "expressID": mesh.express_id,
        "ifcType": mesh.ifc_type,
    }))
    .map_err(|e| ExportError::new(format!("node metadata: {e}")))?;
    Ok(Some(raw))
}

fn empty_node(name: Option<String>) -> gltf_json::Node {
    gltf_json::Node {
        camera: None,
        children: None,
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: None,
        name,
        rotation: None,
        scale: None,
        translation: None,
        skin: None,
        weights: None,
    }
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Append `bytes` to the binary chunk and describe them with a buffer view
fn push_view(
    root: &mut gltf_json::Root,
    bin: &mut Vec<u8>,
    buffer: Index<gltf_json::Buffer>,
    bytes: Vec<u8>,
    name: String,
    target: gltf_json::buffer::Target,
) -> Index<gltf_json::buffer::View> {
    let offset = bin.len();
    bin.extend_from_slice(&bytes);
    root.push(gltf_json::buffer::View {
        buffer,
        byte_length: USize64::from(bytes.len()),
        byte_offset: Some(USize64::from(offset)),
        byte_stride: None,
        name: Some(name),
        target: Some(Valid(target)),
        extensions: Default::default(),
        extras: Default::default(),
    })
}

fn accessor(
    buffer_view: Index<gltf_json::buffer::View>,
    count: usize,
    component_type: ComponentType,
    type_: Type,
    [min, max]: [Option<serde_json::Value>; 2],
    name: String,
) -> gltf_json::Accessor {
    gltf_json::Accessor {
        buffer_view: Some(buffer_view),
        byte_offset: Some(USize64::from(0usize)),
        count: USize64::from(count),
        component_type: Valid(GenericComponentType(component_type)),
        type_: Valid(type_),
        min,
        max,
        name: Some(name),
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    }
}

/// Per-component bounds of a flat VEC3 array, as glTF wants them on positions
fn vec3_minmax(values: &[f32]) -> [Option<serde_json::Value>; 2] {
    let mut mins = [f32::INFINITY; 3];
    let mut maxes = [f32::NEG_INFINITY; 3];
    for v in values.chunks_exact(3) {
        for i in 0..3 {
            mins[i] = mins[i].min(v[i]);
            maxes[i] = maxes[i].max(v[i]);
        }
    }
    if mins[0].is_finite() {
        [Some(serde_json::json!(mins)), Some(serde_json::json!(maxes))]
    } else {
        [None, None]
    }
}

/// Pack a glTF JSON document and its binary buffer into one GLB container
pub fn pack_glb(json: &[u8], bin: &[u8]) -> Result<Vec<u8>, ExportError> {
    let json_len = json.len().next_multiple_of(4);
    let bin_len = bin.len().next_multiple_of(4);
    let mut total = HEADER_LEN + CHUNK_HEADER_LEN + json_len;
    if !bin.is_empty() {
        total += CHUNK_HEADER_LEN + bin_len;
    }
    let total_u32 = u32::try_from(total)
        .map_err(|_| ExportError::new(format!("{total} bytes exceed the GLB size limit")))?;

    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&total_u32.to_le_bytes());

    // both lengths fit: they are bounded by `total`
    glb.extend_from_slice(&(json_len as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(json);
    glb.resize(glb.len() + json_len - json.len(), b' ');

    if !bin.is_empty() {
        glb.extend_from_slice(&(bin_len as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(bin);
        glb.resize(glb.len() + bin_len - bin.len(), 0);
    }

    Ok(glb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    /// Split a GLB into its JSON document and binary chunk
    fn unpack(glb: &[u8]) -> (Value, Option<Vec<u8>>) {
        assert_eq!(u32_at(glb, 0), GLB_MAGIC);
        assert_eq!(u32_at(glb, 4), 2);
        assert_eq!(u32_at(glb, 8) as usize, glb.len());

        let json_len = u32_at(glb, 12) as usize;
        assert_eq!(u32_at(glb, 16), CHUNK_JSON);
        assert_eq!(json_len % 4, 0);
        let json = serde_json::from_slice(&glb[20..20 + json_len]).unwrap();

        let rest = 20 + json_len;
        if rest == glb.len() {
            return (json, None);
        }
        let bin_len = u32_at(glb, rest) as usize;
        assert_eq!(u32_at(glb, rest + 4), CHUNK_BIN);
        (json, Some(glb[rest + 8..rest + 8 + bin_len].to_vec()))
    }

    fn quad_mesh() -> SceneMesh {
        let mut transform = ifc_glb_model::IDENTITY_TRANSFORM;
        transform[12] = 5.0;
        SceneMesh {
            name: "IfcSlab_7".to_string(),
            positions: vec![
                0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0, 0.0, 9.0, 9.0, 9.0,
            ],
            normals: [0.0, 0.0, 1.0].repeat(5),
            indices: vec![0, 1, 2, 0, 2, 3],
            material: 0,
            transform,
            express_id: 7,
            ifc_type: "IfcSlab".to_string(),
        }
    }

    fn scene(meshes: Vec<SceneMesh>) -> SceneGraph {
        SceneGraph {
            name: "slab".to_string(),
            materials: vec![SceneMaterial::fallback()],
            meshes,
        }
    }

    #[test]
    fn test_exports_one_node_per_mesh() {
        let glb = GltfBinaryExporter::default()
            .export(&scene(vec![quad_mesh()]))
            .unwrap();
        let (json, bin) = unpack(&glb);

        assert_eq!(json["asset"]["version"], "2.0");
        assert_eq!(json["scenes"][0]["name"], "slab");
        assert_eq!(json["scenes"][0]["nodes"], serde_json::json!([0]));
        assert_eq!(json["scene"], 0);

        let node = &json["nodes"][0];
        assert_eq!(node["name"], "IfcSlab_7");
        assert_eq!(node["mesh"], 0);
        assert_eq!(node["extras"]["expressID"], 7);
        assert_eq!(node["extras"]["ifcType"], "IfcSlab");
        assert_eq!(node["matrix"][12], 5.0);

        let material = &json["materials"][0];
        assert_eq!(material["name"], "Default");
        assert_eq!(material["doubleSided"], true);
        assert_eq!(material["pbrMetallicRoughness"]["metallicFactor"], 0.0);

        // the unused fifth vertex is truncated away
        let accessors = json["accessors"].as_array().unwrap();
        assert_eq!(accessors.len(), 3);
        assert_eq!(accessors[0]["count"], 4);
        assert_eq!(accessors[0]["min"], serde_json::json!([0.0, 0.0, 0.0]));
        assert_eq!(accessors[0]["max"], serde_json::json!([2.0, 1.0, 0.0]));
        assert_eq!(accessors[2]["count"], 6);
        assert_eq!(accessors[2]["componentType"], 5125);

        let bin = bin.unwrap();
        assert_eq!(bin.len(), 4 * 3 * 4 * 2 + 6 * 4);
        assert_eq!(json["buffers"][0]["byteLength"], bin.len());
    }

    #[test]
    fn test_full_vertex_range() {
        let exporter = GltfBinaryExporter::new(ExportOptions {
            truncate_draw_range: false,
            ..ExportOptions::default()
        });
        let (json, _) = unpack(&exporter.export(&scene(vec![quad_mesh()])).unwrap());
        assert_eq!(json["accessors"][0]["count"], 5);
        assert_eq!(json["accessors"][0]["max"], serde_json::json!([9.0, 9.0, 9.0]));
    }

    #[test]
    fn test_empty_scene_has_no_binary_chunk() {
        let glb = GltfBinaryExporter::default().export(&scene(Vec::new())).unwrap();
        let (json, bin) = unpack(&glb);
        assert!(bin.is_none());
        assert!(json.get("buffers").is_none());
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn test_rejects_textual_output() {
        let exporter = GltfBinaryExporter::new(ExportOptions {
            binary: false,
            ..ExportOptions::default()
        });
        let err = exporter.export(&scene(Vec::new())).unwrap_err();
        assert!(err.message().contains("binary"));
    }

    #[test]
    fn test_rejects_unrepresentable_meshes() {
        let exporter = GltfBinaryExporter::default();

        let mut bad_index = quad_mesh();
        bad_index.indices[5] = 40;
        assert!(exporter.export(&scene(vec![bad_index])).is_err());

        let mut short_normals = quad_mesh();
        short_normals.normals.truncate(3);
        assert!(exporter.export(&scene(vec![short_normals])).is_err());

        let mut no_material = quad_mesh();
        no_material.material = 3;
        let err = exporter.export(&scene(vec![no_material])).unwrap_err();
        assert_eq!(err.to_string(), "Export failed: mesh IfcSlab_7: material 3 does not exist");
    }

    #[test]
    fn test_pack_pads_chunks() {
        let glb = pack_glb(b"{}", &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(glb.len(), 12 + 8 + 4 + 8 + 8);
        assert_eq!(&glb[20..24], b"{}  ");
        assert_eq!(&glb[32..40], &[1, 2, 3, 4, 5, 0, 0, 0]);
    }
}
