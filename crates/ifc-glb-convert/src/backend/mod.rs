// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The two parsing strategies
//!
//! Both implement [`IfcParser`](ifc_glb_model::IfcParser) and produce the same
//! [`ExtractionResult`](ifc_glb_model::ExtractionResult) shape, so nothing
//! downstream of the parse thread knows which one ran.

pub mod fallback;
pub mod native;

pub use fallback::FallbackBackend;
pub use native::{NativeBackend, DEFAULT_MAX_ELEMENTS_PER_TYPE, NATIVE_ELEMENT_TYPES};
