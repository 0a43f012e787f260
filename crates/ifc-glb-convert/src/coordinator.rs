// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch coordinator: the public face of the pipeline
//!
//! ```rust,ignore
//! let mut converter = Converter::new(ConverterConfig::default())?;
//! converter.initialize()?;
//! converter.enqueue([("house.ifc", bytes)]);
//! let summary = converter.convert_all()?;
//! ```
//!
//! Jobs run strictly one after another on the calling thread; only parsing
//! is handed to the parse thread. Assembly and export happen here.

use crate::assembler::assemble;
use crate::config::ConverterConfig;
use crate::executor::{FromExecutor, ParseExecutor, ToExecutor};
use crate::glb::{GltfBinaryExporter, SceneExporter};
use crate::job::{
    batch_progress, ConversionJob, ConversionOutput, JobEvent, JobId, JobObserver, JobStatus,
    JobStore, JobSummary, SubscriptionId,
};
use crate::selector::{BackendSelector, NativeSource};
use crate::{Error, Result};
use ifc_glb_model::ExtractionResult;
use std::sync::Arc;
use std::time::Instant;

/// Backend readiness for the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    Uninitialized,
    Native { source: String },
    /// Degraded but usable
    Fallback { message: String },
    /// Nothing can be converted this session
    Failed { message: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Native { .. } | Readiness::Fallback { .. })
    }
}

/// A finished GLB ready for download or hand-off
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    pub job_id: JobId,
    /// Source name with `.ifc` replaced by `.glb`
    pub file_name: String,
    pub glb: Arc<[u8]>,
}

/// Outcome of [`Converter::convert_all`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

/// Human readable byte count: "0 Bytes", "1.5 KB", "2 MB"
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let digits = format!("{value:.2}");
    let digits = digits.trim_end_matches('0').trim_end_matches('.');
    format!("{digits} {}", UNITS[unit])
}

/// Download name for a source file
pub fn artifact_name(source_name: &str) -> String {
    if source_name.contains(".ifc") {
        source_name.replacen(".ifc", ".glb", 1)
    } else {
        format!("{source_name}.glb")
    }
}

/// IFC to GLB batch converter
pub struct Converter {
    store: JobStore,
    selector: Option<BackendSelector>,
    executor: Option<ParseExecutor>,
    exporter: Box<dyn SceneExporter>,
    readiness: Readiness,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("store", &self.store)
            .field("readiness", &self.readiness)
            .finish()
    }
}

impl Converter {
    /// Create a converter; the parse thread starts on [`initialize`](Self::initialize)
    pub fn new(config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: JobStore::new(),
            selector: Some(BackendSelector::new(&config)),
            executor: None,
            exporter: Box::new(GltfBinaryExporter::new(config.export.clone())),
            readiness: Readiness::Uninitialized,
        })
    }

    /// Replace the native sources probed at initialization
    ///
    /// Ignored, with a warning, once [`initialize`](Self::initialize) has run.
    pub fn with_sources(mut self, sources: Vec<Arc<dyn NativeSource>>) -> Self {
        match self.selector.take() {
            Some(selector) => self.selector = Some(selector.with_sources(sources)),
            None => log::warn!("backend already selected; ignoring {} new sources", sources.len()),
        }
        self
    }

    /// Replace the selector entirely
    ///
    /// Ignored, with a warning, once [`initialize`](Self::initialize) has run.
    pub fn with_selector(mut self, selector: BackendSelector) -> Self {
        if self.readiness == Readiness::Uninitialized {
            self.selector = Some(selector);
        } else {
            log::warn!("backend already selected; ignoring new selector");
        }
        self
    }

    /// Whether [`initialize`](Self::initialize) has run; sources are fixed from then on
    pub fn is_initialized(&self) -> bool {
        self.readiness != Readiness::Uninitialized
    }

    /// Replace the GLB exporter
    pub fn with_exporter(mut self, exporter: impl SceneExporter + 'static) -> Self {
        self.exporter = Box::new(exporter);
        self
    }

    /// Start the parse thread and select the session's backend
    ///
    /// Runs once; later calls return the cached outcome. A fallback is not an
    /// error, check [`readiness`](Self::readiness) to tell it apart.
    pub fn initialize(&mut self) -> Result<&Readiness> {
        if self.readiness == Readiness::Uninitialized {
            self.readiness = self.start_executor();
            match &self.readiness {
                Readiness::Native { source } => log::info!("converter ready, native backend from {source}"),
                Readiness::Fallback { message } => log::info!("converter ready: {message}"),
                Readiness::Failed { message } => log::error!("converter initialization failed: {message}"),
                Readiness::Uninitialized => {}
            }
        }
        match &self.readiness {
            Readiness::Failed { message } => Err(Error::initialization(message.clone())),
            readiness => Ok(readiness),
        }
    }

    fn start_executor(&mut self) -> Readiness {
        let Some(selector) = self.selector.take() else {
            return Readiness::Failed {
                message: "backend selector already consumed".to_string(),
            };
        };
        let executor = match ParseExecutor::spawn(selector) {
            Ok(executor) => executor,
            Err(e) => {
                return Readiness::Failed {
                    message: e.to_string(),
                }
            }
        };
        if let Err(e) = executor.send(ToExecutor::Init) {
            return Readiness::Failed {
                message: e.to_string(),
            };
        }

        let readiness = loop {
            match executor.recv() {
                Ok(FromExecutor::InitComplete { source }) => break Readiness::Native { source },
                Ok(FromExecutor::FallbackMode { message }) => break Readiness::Fallback { message },
                Ok(FromExecutor::Error {
                    job_id: None,
                    message,
                }) => break Readiness::Failed { message },
                Ok(other) => log::debug!("ignoring {other:?} before readiness"),
                Err(e) => {
                    break Readiness::Failed {
                        message: e.to_string(),
                    }
                }
            }
        };
        self.executor = Some(executor);
        readiness
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    fn ready_executor(&self) -> Result<&ParseExecutor> {
        match (&self.readiness, &self.executor) {
            (Readiness::Failed { message }, _) => Err(Error::initialization(message.clone())),
            (Readiness::Native { .. } | Readiness::Fallback { .. }, Some(executor)) => Ok(executor),
            _ => Err(Error::NotReady),
        }
    }

    /// Add one `Pending` job per file
    pub fn enqueue<N, B>(&mut self, files: impl IntoIterator<Item = (N, B)>) -> Vec<JobId>
    where
        N: Into<String>,
        B: Into<Arc<[u8]>>,
    {
        files
            .into_iter()
            .map(|(name, bytes)| self.store.add(name, bytes))
            .collect()
    }

    /// Reset every job and convert them one at a time
    pub fn convert_all(&mut self) -> Result<BatchSummary> {
        self.ready_executor()?;
        let started = Instant::now();
        let ids = self.store.ids();
        for &id in &ids {
            self.store.reset(id)?;
        }

        let total = ids.len();
        self.store.notify(&JobEvent::BatchProgress {
            completed: 0,
            total,
            percent: batch_progress(0, total),
        });

        let mut summary = BatchSummary {
            total,
            succeeded: 0,
            failed: 0,
            elapsed_ms: 0,
        };
        for (done, &id) in ids.iter().enumerate() {
            match self.run_job(id)? {
                JobStatus::Success => summary.succeeded += 1,
                _ => summary.failed += 1,
            }
            self.store.notify(&JobEvent::BatchProgress {
                completed: done + 1,
                total,
                percent: batch_progress(done + 1, total),
            });
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "batch finished: {} converted, {} failed in {} ms",
            summary.succeeded,
            summary.failed,
            summary.elapsed_ms
        );
        Ok(summary)
    }

    /// Convert one job, whatever state it was left in
    pub fn convert_single(&mut self, id: JobId) -> Result<JobStatus> {
        self.ready_executor()?;
        self.store.reset(id)?;
        self.run_job(id)
    }

    /// Drive one `Pending` job to a terminal state
    ///
    /// Only bookkeeping errors are returned; conversion failures end up in
    /// the job record.
    fn run_job(&mut self, id: JobId) -> Result<JobStatus> {
        let (name, bytes) = self.store.begin(id)?;
        let started = Instant::now();
        self.store.set_progress(id, 5, "Starting conversion");

        match self.convert(id, &name, bytes) {
            Ok((glb, geometry_count, material_count, result)) => {
                let output = ConversionOutput {
                    glb: glb.into(),
                    geometry_count,
                    material_count,
                    conversion_time_ms: started.elapsed().as_millis() as u64,
                    backend: result.backend,
                };
                log::info!(
                    "{name}: {geometry_count} geometries, {material_count} materials in {} ms",
                    output.conversion_time_ms
                );
                self.store.succeed(id, output)?;
                Ok(JobStatus::Success)
            }
            Err(e) => {
                log::error!("{name}: {e}");
                self.store.fail(id, e.to_string())?;
                Ok(JobStatus::Failed)
            }
        }
    }

    fn convert(
        &self,
        id: JobId,
        name: &str,
        bytes: Arc<[u8]>,
    ) -> Result<(Vec<u8>, usize, usize, ExtractionResult)> {
        let executor = self.ready_executor()?;
        executor.send(ToExecutor::ParseRequest {
            job_id: id,
            bytes,
            file_name: name.to_string(),
        })?;

        let result = loop {
            match executor.recv()? {
                FromExecutor::Progress {
                    job_id,
                    percent,
                    message,
                } if job_id == id => {
                    self.store.set_progress(id, percent, &message);
                }
                FromExecutor::ParseComplete { job_id, result } if job_id == id => break *result,
                FromExecutor::Error {
                    job_id: Some(job_id),
                    message,
                } if job_id == id => return Err(Error::Backend(message)),
                other => log::debug!("{id}: ignoring {other:?}"),
            }
        };

        self.store.set_progress(id, 85, "Building scene");
        let scene = assemble(&result);
        self.store.set_progress(id, 95, "Exporting GLB");
        let glb = self.exporter.export(&scene)?;
        Ok((glb, scene.mesh_count(), scene.material_count(), result))
    }

    /// Remove a job that is not converting
    pub fn remove(&mut self, id: JobId) -> Result<ConversionJob> {
        self.store.remove(id)
    }

    /// Snapshot of one job
    pub fn job(&self, id: JobId) -> Option<ConversionJob> {
        self.store.get(id)
    }

    /// Snapshot of every job in enqueue order
    pub fn jobs(&self) -> Vec<ConversionJob> {
        self.store.jobs()
    }

    /// GLB of a successful job
    pub fn artifact(&self, id: JobId) -> Option<Artifact> {
        let job = self.store.get(id)?;
        let output = job.result?;
        Some(Artifact {
            job_id: id,
            file_name: artifact_name(&job.name),
            glb: output.glb,
        })
    }

    /// Every successful job's GLB, in enqueue order
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.store
            .ids()
            .into_iter()
            .filter_map(|id| self.artifact(id))
            .collect()
    }

    pub fn summary(&self) -> JobSummary {
        self.store.summary()
    }

    /// Read-only handle to the jobs, for observers on other threads
    pub fn observer(&self) -> JobObserver {
        self.store.observer()
    }

    pub fn subscribe(&self, callback: impl Fn(&JobEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.store.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }
}
