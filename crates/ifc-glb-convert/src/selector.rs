// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One-time backend selection
//!
//! Native sources are tried in order, each on a helper thread bounded by the
//! per-source timeout and the remaining initialization window. A source that
//! misses its budget is abandoned; its thread is left to finish on its own.

use crate::backend::{FallbackBackend, NativeBackend};
use crate::config::{BackendMode, ConverterConfig};
use crate::{Error, Result};
use ifc_glb_model::{BackendKind, IfcParser};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reported when the session commits to the fallback backend
pub const FALLBACK_MESSAGE: &str = "Native IFC engine unavailable, using simplified parser";

/// Somewhere a native backend can be loaded from
pub trait NativeSource: Send + Sync {
    /// Name used in logs and readiness reports
    fn name(&self) -> &str;

    /// Load and initialize the backend; may block
    fn load(&self) -> ifc_glb_model::Result<Box<dyn IfcParser>>;
}

/// The native engine compiled into this crate
#[derive(Clone, Debug)]
pub struct BuiltinNativeSource {
    max_elements_per_type: usize,
}

impl BuiltinNativeSource {
    pub fn new(max_elements_per_type: usize) -> Self {
        Self {
            max_elements_per_type,
        }
    }
}

impl NativeSource for BuiltinNativeSource {
    fn name(&self) -> &str {
        "ifc-glb-geometry"
    }

    fn load(&self) -> ifc_glb_model::Result<Box<dyn IfcParser>> {
        Ok(Box::new(NativeBackend::new(self.max_elements_per_type)))
    }
}

/// Outcome of backend selection
pub enum Selection {
    Native {
        source: String,
        backend: Box<dyn IfcParser>,
    },
    Fallback {
        message: String,
        backend: Box<dyn IfcParser>,
    },
}

impl Selection {
    pub fn kind(&self) -> BackendKind {
        match self {
            Selection::Native { .. } => BackendKind::Native,
            Selection::Fallback { .. } => BackendKind::Fallback,
        }
    }

    pub fn backend(&self) -> &dyn IfcParser {
        match self {
            Selection::Native { backend, .. } | Selection::Fallback { backend, .. } => {
                backend.as_ref()
            }
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Native { source, .. } => {
                f.debug_struct("Native").field("source", source).finish()
            }
            Selection::Fallback { message, .. } => {
                f.debug_struct("Fallback").field("message", message).finish()
            }
        }
    }
}

/// Chooses the session's backend
pub struct BackendSelector {
    mode: BackendMode,
    sources: Vec<Arc<dyn NativeSource>>,
    per_source_timeout: Duration,
    init_timeout: Duration,
    fallback_seed: Option<u64>,
}

impl BackendSelector {
    /// Selector over the built-in native source
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            mode: config.backend,
            sources: vec![Arc::new(BuiltinNativeSource::new(
                config.max_elements_per_type,
            ))],
            per_source_timeout: config.per_source_timeout(),
            init_timeout: config.init_timeout(),
            fallback_seed: config.fallback_seed,
        }
    }

    /// Replace the ordered source list
    pub fn with_sources(mut self, sources: Vec<Arc<dyn NativeSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_timeouts(mut self, per_source: Duration, overall: Duration) -> Self {
        self.per_source_timeout = per_source;
        self.init_timeout = overall;
        self
    }

    fn fallback(&self) -> Selection {
        log::info!("{FALLBACK_MESSAGE}");
        Selection::Fallback {
            message: FALLBACK_MESSAGE.to_string(),
            backend: Box::new(FallbackBackend::new(self.fallback_seed)),
        }
    }

    /// Pick a backend
    ///
    /// Returns an initialization error when the overall window closes with
    /// sources still untried, or in `native` mode when every source fails.
    pub fn select(&self) -> Result<Selection> {
        if self.mode == BackendMode::Fallback {
            return Ok(self.fallback());
        }

        let deadline = Instant::now() + self.init_timeout;
        for (tried, source) in self.sources.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::initialization(format!(
                    "no IFC backend became ready within {:?} ({} sources untried)",
                    self.init_timeout,
                    self.sources.len() - tried
                )));
            }

            let name = source.name().to_string();
            let budget = self.per_source_timeout.min(remaining);
            match try_load(Arc::clone(source), budget) {
                Ok(backend) => {
                    log::info!("native IFC backend ready from {name}");
                    return Ok(Selection::Native {
                        source: name,
                        backend,
                    });
                }
                Err(reason) => log::warn!("native source {name}: {reason}"),
            }
        }

        match self.mode {
            BackendMode::Native => Err(Error::initialization(format!(
                "none of {} native IFC sources could be loaded",
                self.sources.len()
            ))),
            _ => Ok(self.fallback()),
        }
    }
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("mode", &self.mode)
            .field("sources", &self.sources.len())
            .field("per_source_timeout", &self.per_source_timeout)
            .field("init_timeout", &self.init_timeout)
            .finish()
    }
}

fn try_load(
    source: Arc<dyn NativeSource>,
    budget: Duration,
) -> std::result::Result<Box<dyn IfcParser>, String> {
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name("ifc-source".to_string())
        .spawn(move || {
            // nobody listens after a timeout
            let _ = sender.send(source.load());
        })
        .map_err(|e| format!("could not start loader thread: {e}"))?;

    match receiver.recv_timeout(budget) {
        Ok(Ok(backend)) => Ok(backend),
        Ok(Err(e)) => Err(e.to_string()),
        Err(RecvTimeoutError::Timeout) => Err(format!("not ready after {budget:?}")),
        Err(RecvTimeoutError::Disconnected) => Err("loader panicked".to_string()),
    }
}
