// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Backend capability trait

use crate::{BackendKind, ExtractionResult, Result};

/// Progress callback for parsing operations
///
/// Receives (percent 0-100 on the file's overall scale, message).
pub type ProgressCallback<'a> = &'a mut dyn FnMut(u8, &str);

/// A parsing strategy - entry point for turning IFC bytes into extraction records
///
/// Exactly two implementations exist in the converter: a native backend that
/// walks typed elements through a geometry engine, and a fallback backend
/// that scans text and substitutes boxes. Callers never care which one they
/// hold.
///
/// # Example
///
/// ```ignore
/// use ifc_glb_model::IfcParser;
///
/// let result = backend.parse_with_progress(&bytes, "house.ifc", &mut |pct, msg| {
///     println!("{pct}% {msg}");
/// })?;
/// ```
pub trait IfcParser: Send + Sync {
    /// Which strategy this is
    fn kind(&self) -> BackendKind;

    /// Parse one file with progress reporting
    ///
    /// # Arguments
    /// * `content` - Raw file bytes
    /// * `file_name` - Source file name, carried into the result
    /// * `on_progress` - Receives (percent, message); percents are non-decreasing
    fn parse_with_progress(
        &self,
        content: &[u8],
        file_name: &str,
        on_progress: ProgressCallback<'_>,
    ) -> Result<ExtractionResult>;

    /// Parse one file without progress reporting
    fn parse(&self, content: &[u8], file_name: &str) -> Result<ExtractionResult> {
        self.parse_with_progress(content, file_name, &mut |_, _| {})
    }
}
