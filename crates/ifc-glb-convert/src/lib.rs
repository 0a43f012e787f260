// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC to GLB Conversion
//!
//! Batch conversion of IFC building models into binary glTF. A session picks
//! one parsing strategy up front, then converts files one at a time:
//!
//! ```text
//! bytes -> parse thread (native or fallback backend) -> ExtractionResult
//!       -> assemble -> SceneGraph -> export -> GLB -> job store
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_glb_convert::{Converter, ConverterConfig};
//!
//! let mut converter = Converter::new(ConverterConfig::default())?;
//! converter.initialize()?;
//! let ids = converter.enqueue([("house.ifc", std::fs::read("house.ifc")?)]);
//! converter.convert_all()?;
//!
//! if let Some(artifact) = converter.artifact(ids[0]) {
//!     std::fs::write(&artifact.file_name, &artifact.glb)?;
//! }
//! ```
//!
//! ## Backends
//!
//! - **Native**: opens the file as a STEP model and meshes each element's
//!   body representation through `ifc-glb-geometry`
//! - **Fallback**: scans declaration lines and draws a box per known element,
//!   never producing an empty scene

pub mod assembler;
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod glb;
pub mod job;
pub mod selector;

pub use assembler::{assemble, AlphaMode, SceneGraph, SceneMaterial, SceneMesh};
pub use backend::{FallbackBackend, NativeBackend};
pub use config::{BackendMode, ConverterConfig, ExportOptions};
pub use coordinator::{
    artifact_name, format_file_size, Artifact, BatchSummary, Converter, Readiness,
};
pub use error::{Error, Result};
pub use executor::{FromExecutor, ParseExecutor, ToExecutor};
pub use glb::{ExportError, GltfBinaryExporter, SceneExporter};
pub use job::{
    ConversionJob, ConversionOutput, JobEvent, JobId, JobObserver, JobStatus, JobSummary,
    SubscriptionId,
};
pub use selector::{BackendSelector, BuiltinNativeSource, NativeSource, Selection, FALLBACK_MESSAGE};

// Re-export the shared model types consumers need
pub use ifc_glb_model::{BackendKind, ExtractedGeometry, ExtractedMaterial, ExtractionResult, IfcParser};
