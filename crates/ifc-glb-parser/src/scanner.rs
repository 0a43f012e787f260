// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast entity scanner using SIMD-accelerated byte searching
//!
//! Finds entity boundaries in the DATA section without decoding attributes,
//! and reads the few header records the converter cares about.

use crate::tokenizer::parse_arguments;
use ifc_glb_model::ModelMetadata;
use memchr::{memchr, memmem};
use rustc_hash::FxHashMap;

/// Entity index mapping ID to byte offsets
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// One entity definition located by the scanner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScannedEntity<'a> {
    /// Express ID
    pub id: u32,
    /// Type keyword as written in the file
    pub type_name: &'a str,
    /// Byte offset of the leading `#`
    pub start: usize,
    /// Byte offset just past the terminating `;`
    pub end: usize,
}

impl ScannedEntity<'_> {
    /// The full `#id=TYPE(...);` text
    pub fn text<'c>(&self, content: &'c str) -> &'c str {
        &content[self.start..self.end]
    }
}

/// Byte offset just after the `DATA;` keyword, if the file has a DATA section
pub fn data_section_start(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    memmem::find_iter(bytes, b"DATA;")
        .find(|&pos| pos == 0 || matches!(bytes[pos - 1], b'\n' | b'\r' | b' ' | b'\t' | b';'))
        .map(|pos| pos + 5)
}

/// Find the `;` ending a statement, skipping quoted strings
///
/// Returns the offset just past the `;`.
fn statement_end(bytes: &[u8], mut pos: usize) -> Option<usize> {
    let mut in_string = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' => {
                if in_string && bytes.get(pos + 1) == Some(&b'\'') {
                    pos += 2;
                    continue;
                }
                in_string = !in_string;
            }
            b';' if !in_string => return Some(pos + 1),
            _ => {}
        }
        pos += 1;
    }

    None
}

/// Iterator over entity definitions in the DATA section
///
/// Uses memchr to jump between `#` characters; a `#` only starts an
/// entity when it opens a line or follows the previous statement's `;`.
pub struct EntityScanner<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner positioned at the DATA section
    ///
    /// Content without a DATA section is scanned from the start.
    pub fn new(content: &'a str) -> Self {
        let pos = data_section_start(content).unwrap_or(0);
        Self { content, pos }
    }

    fn skip_blanks(&mut self) {
        let bytes = self.content.as_bytes();
        while self.pos < bytes.len() && matches!(bytes[self.pos], b' ' | b'\t') {
            self.pos += 1;
        }
    }

    /// Build an index of all entities (ID -> byte offsets)
    ///
    /// A repeated ID keeps its last definition.
    pub fn build_index(content: &'a str) -> EntityIndex {
        Self::new(content).map(|e| (e.id, (e.start, e.end))).collect()
    }

    /// Count entities by upper-case type keyword
    pub fn count_by_type(content: &'a str) -> FxHashMap<String, usize> {
        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        for entity in Self::new(content) {
            *counts.entry(entity.type_name.to_ascii_uppercase()).or_insert(0) += 1;
        }
        counts
    }
}

impl<'a> Iterator for EntityScanner<'a> {
    type Item = ScannedEntity<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.content.as_bytes();

        while self.pos < bytes.len() {
            let hash_pos = memchr(b'#', &bytes[self.pos..])?;
            self.pos += hash_pos;

            // References inside attribute lists are not definitions
            let is_entity_start = self.pos == 0
                || matches!(bytes[self.pos - 1], b'\n' | b'\r' | b';');
            if !is_entity_start {
                self.pos += 1;
                continue;
            }

            let start = self.pos;
            self.pos += 1;

            let id_start = self.pos;
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            if self.pos == id_start {
                continue;
            }
            let Ok(id) = self.content[id_start..self.pos].parse::<u32>() else {
                continue;
            };

            self.skip_blanks();
            if bytes.get(self.pos) != Some(&b'=') {
                continue;
            }
            self.pos += 1;
            self.skip_blanks();

            let type_start = self.pos;
            while self.pos < bytes.len()
                && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
            {
                self.pos += 1;
            }
            if self.pos == type_start {
                continue;
            }
            let type_name = &self.content[type_start..self.pos];

            // An unterminated trailing entity ends the scan
            let end = statement_end(bytes, self.pos)?;
            self.pos = end;

            return Some(ScannedEntity {
                id,
                type_name,
                start,
                end,
            });
        }

        None
    }
}

/// Argument list of a header record such as `FILE_SCHEMA(('IFC4'));`
fn header_record<'a>(header: &'a str, keyword: &str) -> Option<&'a str> {
    let key_pos = header.find(keyword)?;
    let open = key_pos + header[key_pos..].find('(')?;
    let end = statement_end(header.as_bytes(), open)?;
    // drop the trailing ';'
    Some(&header[open..end - 1])
}

/// Parse the header section into model metadata
///
/// Missing or malformed records leave the corresponding field empty.
pub fn parse_header(content: &str) -> ModelMetadata {
    let mut metadata = ModelMetadata::default();

    let header_start = content.find("HEADER;").unwrap_or(0);
    let header_end = data_section_start(content).unwrap_or(content.len());
    let header = &content[header_start..header_end.max(header_start)];

    if let Some(args) = header_record(header, "FILE_SCHEMA").and_then(parse_arguments) {
        if let Some(schema) = args
            .first()
            .and_then(|a| a.as_list())
            .and_then(|list| list.first())
            .and_then(|s| s.as_string())
        {
            metadata.schema_version = schema.to_string();
        }
    }

    // FILE_NAME(name, time_stamp, author, organization, preprocessor_version,
    //           originating_system, authorization)
    if let Some(args) = header_record(header, "FILE_NAME").and_then(parse_arguments) {
        let non_empty = |index: usize| {
            args.get(index)
                .and_then(|a| a.as_string())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        metadata.file_name = non_empty(0);
        metadata.originating_system = non_empty(5);
    }

    metadata
}
