// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Converter configuration
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```json
//! { "backend": "fallback", "fallback_seed": 7 }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// How the backend is chosen at initialization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Probe native sources, fall back if none loads
    #[default]
    Auto,
    /// Probe native sources; failing all of them is an initialization error
    Native,
    /// Skip probing and use the fallback backend
    Fallback,
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendMode::Auto),
            "native" => Ok(BackendMode::Native),
            "fallback" => Ok(BackendMode::Fallback),
            other => Err(format!(
                "unknown backend mode '{other}' (expected auto, native or fallback)"
            )),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Auto => write!(f, "auto"),
            BackendMode::Native => write!(f, "native"),
            BackendMode::Fallback => write!(f, "fallback"),
        }
    }
}

/// GLB export options
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Binary packaging; textual glTF is not supported
    pub binary: bool,
    /// Embed images in the binary chunk
    pub embed_images: bool,
    /// Largest texture edge in pixels
    pub max_texture_size: u32,
    /// Only write the index range each primitive draws
    pub truncate_draw_range: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            binary: true,
            embed_images: true,
            max_texture_size: 4096,
            truncate_draw_range: true,
        }
    }
}

/// Converter configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Backend selection mode
    pub backend: BackendMode,
    /// Time allowed for one native source to load
    pub per_source_timeout_ms: u64,
    /// Overall backend initialization window
    pub init_timeout_ms: u64,
    /// Elements extracted per IFC type by the native backend, at least 1
    pub max_elements_per_type: usize,
    /// Seed for fallback box offsets; `None` seeds from the clock
    pub fallback_seed: Option<u64>,
    /// GLB export options
    pub export: ExportOptions,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::Auto,
            per_source_timeout_ms: 10_000,
            init_timeout_ms: 45_000,
            max_elements_per_type: 100,
            fallback_seed: None,
            export: ExportOptions::default(),
        }
    }
}

impl ConverterConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json).map_err(|e| match e {
            Error::Config(msg) => Error::config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Check the timeouts and element cap are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_elements_per_type == 0 {
            return Err(Error::config("max_elements_per_type must be at least 1"));
        }
        if self.per_source_timeout_ms == 0 || self.init_timeout_ms == 0 {
            return Err(Error::config("timeouts must be greater than zero"));
        }
        if self.per_source_timeout_ms > self.init_timeout_ms {
            return Err(Error::config(format!(
                "per_source_timeout_ms ({}) exceeds init_timeout_ms ({})",
                self.per_source_timeout_ms, self.init_timeout_ms
            )));
        }
        Ok(())
    }

    /// Per-source timeout as a `Duration`
    pub fn per_source_timeout(&self) -> Duration {
        Duration::from_millis(self.per_source_timeout_ms)
    }

    /// Overall initialization window as a `Duration`
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ConverterConfig::from_json_str(r#"{"backend": "fallback", "fallback_seed": 7}"#)
                .unwrap();
        assert_eq!(
            config,
            ConverterConfig {
                backend: BackendMode::Fallback,
                fallback_seed: Some(7),
                ..ConverterConfig::default()
            }
        );
        assert_eq!(config.init_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_nested_export_options() {
        let config =
            ConverterConfig::from_json_str(r#"{"export": {"max_texture_size": 1024}}"#).unwrap();
        assert_eq!(config.export.max_texture_size, 1024);
        assert!(config.export.binary);
    }

    #[test]
    fn test_validation() {
        assert!(ConverterConfig::from_json_str(r#"{"init_timeout_ms": 0}"#).is_err());
        assert!(ConverterConfig::from_json_str(
            r#"{"per_source_timeout_ms": 5000, "init_timeout_ms": 1000}"#
        )
        .is_err());
        assert!(ConverterConfig::from_json_str(r#"{"backend": "wasm"}"#).is_err());

        let err = ConverterConfig::from_json_str(r#"{"max_elements_per_type": 0}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max_elements_per_type must be at least 1"
        );
        assert!(ConverterConfig::from_json_str(r#"{"max_elements_per_type": 1}"#).is_ok());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"max_elements_per_type": 5}}"#).unwrap();
        let config = ConverterConfig::from_path(file.path()).unwrap();
        assert_eq!(config.max_elements_per_type, 5);

        assert!(matches!(
            ConverterConfig::from_path(file.path().with_extension("missing")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_backend_mode_from_str() {
        assert_eq!("Native".parse::<BackendMode>(), Ok(BackendMode::Native));
        assert!("cdn".parse::<BackendMode>().is_err());
        assert_eq!(BackendMode::Fallback.to_string(), "fallback");
    }
}
