// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fallback backend: line scan with box substitution
//!
//! Recognises single-line `#<id> = <TYPE>(...)` declarations and replaces
//! every known building element with a coloured box at a pseudo-random
//! offset. No spatial layout is attempted. A file that yields nothing gets a
//! fixed seven-piece room instead, so the result is never empty.

use ifc_glb_model::{
    color_for_type, translation_transform, BackendKind, EntityId, ExtractedGeometry,
    ExtractionResult, IfcParser, ProgressCallback, Result,
};
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{digit1, multispace0};
use nom::combinator::map_res;
use nom::{IResult, Parser};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rustc_hash::FxHashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Box size `[width, height, depth]` for each type the fallback draws
const KNOWN_TYPES: [(&str, [f32; 3]); 10] = [
    ("IFCWALL", [4.0, 3.0, 0.2]),
    ("IFCWALLSTANDARDCASE", [4.0, 3.0, 0.2]),
    ("IFCSLAB", [6.0, 0.2, 6.0]),
    ("IFCBEAM", [3.0, 0.3, 0.3]),
    ("IFCCOLUMN", [0.3, 3.0, 0.3]),
    ("IFCDOOR", [0.9, 2.1, 0.05]),
    ("IFCWINDOW", [1.2, 1.2, 0.05]),
    ("IFCROOF", [8.0, 0.3, 8.0]),
    ("IFCSTAIR", [3.0, 0.2, 1.0]),
    ("IFCFURNISHINGELEMENT", [1.0, 1.0, 1.0]),
];

/// The room emitted when nothing in the file is recognised: type, size, centre
const SCAFFOLD: [(&str, [f32; 3], [f32; 3]); 7] = [
    ("IFCWALL", [4.0, 3.0, 0.2], [0.0, 1.5, 2.0]),
    ("IFCWALL", [4.0, 3.0, 0.2], [0.0, 1.5, -2.0]),
    ("IFCWALL", [0.2, 3.0, 4.0], [2.0, 1.5, 0.0]),
    ("IFCWALL", [0.2, 3.0, 4.0], [-2.0, 1.5, 0.0]),
    ("IFCSLAB", [4.0, 0.2, 4.0], [0.0, 0.0, 0.0]),
    ("IFCSLAB", [4.0, 0.2, 4.0], [0.0, 3.0, 0.0]),
    ("IFCDOOR", [0.9, 2.1, 0.05], [0.0, 1.0, 2.0]),
];

/// Box triangle indices, two per face, wound outwards
const BOX_INDICES: [u32; 36] = [
    0, 1, 2, 0, 2, 3, // front
    4, 5, 6, 4, 6, 7, // back
    8, 9, 10, 8, 10, 11, // top
    12, 13, 14, 12, 14, 15, // bottom
    16, 17, 18, 16, 18, 19, // right
    20, 21, 22, 20, 22, 23, // left
];

/// Box size for a fallback type tag
pub fn box_size(type_tag: &str) -> Option<[f32; 3]> {
    KNOWN_TYPES
        .iter()
        .find(|(name, _)| *name == type_tag)
        .map(|(_, size)| *size)
}

/// Axis-aligned box centred at the origin: 24 vertices, 4 per face
pub fn box_vertices([width, height, depth]: [f32; 3]) -> Vec<f32> {
    let (w, h, d) = (width / 2.0, height / 2.0, depth / 2.0);
    #[rustfmt::skip]
    let vertices = vec![
        // front
        -w, -h, d, w, -h, d, w, h, d, -w, h, d,
        // back
        -w, -h, -d, -w, h, -d, w, h, -d, w, -h, -d,
        // top
        -w, h, -d, -w, h, d, w, h, d, w, h, -d,
        // bottom
        -w, -h, -d, w, -h, -d, w, -h, d, -w, -h, d,
        // right
        w, -h, -d, w, h, -d, w, h, d, w, -h, d,
        // left
        -w, -h, -d, -w, -h, d, -w, h, d, -w, h, -d,
    ];
    vertices
}

/// Box triangle indices matching [`box_vertices`]
pub fn box_indices() -> Vec<u32> {
    BOX_INDICES.to_vec()
}

/// One `#id = TYPE(...)` declaration found by the line scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredEntity {
    /// Express ID
    pub id: u32,
    /// Type name as written, trimmed
    pub type_name: String,
}

/// `#<digits> ws = ws <type>(` ... `)`
fn declaration(line: &str) -> IResult<&str, (u32, &str)> {
    let (rest, (_, id, _, _, _, type_name, _)) = (
        tag("#"),
        map_res(digit1, str::parse::<u32>),
        multispace0,
        tag("="),
        multispace0,
        take_until("("),
        tag("("),
    )
        .parse(line)?;
    // arguments must close on the same line
    let (rest, _) = take_until(")")(rest)?;
    Ok((rest, (id, type_name.trim())))
}

/// Scan text for single-line entity declarations
///
/// A later declaration of the same id replaces the earlier one but keeps the
/// position of the first.
pub fn scan_declarations(text: &str) -> Vec<DeclaredEntity> {
    let mut entities: Vec<DeclaredEntity> = Vec::new();
    let mut positions: FxHashMap<u32, usize> = FxHashMap::default();

    for line in text.split('\n') {
        if !line.starts_with('#') {
            continue;
        }
        let Ok((_, (id, type_name))) = declaration(line) else {
            continue;
        };
        if type_name.is_empty() {
            continue;
        }
        match positions.get(&id) {
            Some(&index) => entities[index].type_name = type_name.to_string(),
            None => {
                positions.insert(id, entities.len());
                entities.push(DeclaredEntity {
                    id,
                    type_name: type_name.to_string(),
                });
            }
        }
    }

    entities
}

/// Backend that never fails: scans text, draws boxes
#[derive(Clone, Debug, Default)]
pub struct FallbackBackend {
    seed: Option<u64>,
}

impl FallbackBackend {
    /// Create a fallback backend; `None` seeds box offsets from the clock
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    fn rng(&self) -> Xoshiro256Plus {
        let seed = self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });
        Xoshiro256Plus::seed_from_u64(seed)
    }

    fn scaffold(result: &mut ExtractionResult) {
        for (index, (type_tag, size, [x, y, z])) in SCAFFOLD.iter().enumerate() {
            result.push_geometry(
                ExtractedGeometry {
                    source_element_id: EntityId(index as u32 + 1),
                    type_tag: type_tag.to_string(),
                    vertices: box_vertices(*size),
                    indices: box_indices(),
                    transform: translation_transform(*x, *y, *z),
                },
                color_for_type(type_tag),
            );
        }
    }
}

impl IfcParser for FallbackBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn parse_with_progress(
        &self,
        content: &[u8],
        file_name: &str,
        on_progress: ProgressCallback<'_>,
    ) -> Result<ExtractionResult> {
        on_progress(25, "Using simplified IFC parser");
        let text = String::from_utf8_lossy(content);

        on_progress(40, "Parsing IFC text");
        let entities = scan_declarations(&text);
        on_progress(60, &format!("Found {} entities", entities.len()));

        let mut result = ExtractionResult::new(file_name, BackendKind::Fallback);
        result.stats.entities_scanned = entities.len();

        let mut rng = self.rng();
        for entity in &entities {
            let Some(size) = box_size(&entity.type_name) else {
                continue;
            };
            let offset = [
                rng.random_range(-5.0..5.0),
                rng.random_range(0.0..5.0),
                rng.random_range(-5.0..5.0),
            ];
            result.push_geometry(
                ExtractedGeometry {
                    source_element_id: EntityId(entity.id),
                    type_tag: entity.type_name.clone(),
                    vertices: box_vertices(size),
                    indices: box_indices(),
                    transform: translation_transform(offset[0], offset[1], offset[2]),
                },
                color_for_type(&entity.type_name),
            );

            let count = result.geometries.len();
            if count % 10 == 0 {
                let percent = 60 + (count * 20 / entities.len()) as u8;
                on_progress(percent, &format!("Created {count} geometries"));
            }
        }

        if result.geometries.is_empty() {
            log::info!("{file_name}: no known elements found, using the default room");
            Self::scaffold(&mut result);
        }

        Ok(result)
    }
}
