// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the conversion pipeline

use crate::glb::ExportError;
use crate::job::{JobId, JobStatus};
use ifc_glb_model::ParseError;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the converter
///
/// Element-level failures never show up here; backends recover from them and
/// only report a lower geometry count.
#[derive(Error, Debug)]
pub enum Error {
    /// No backend became usable; fatal for the session
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Conversion requested before backend selection finished
    #[error("Converter is not ready; backend selection has not completed")]
    NotReady,

    /// Unknown job
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    /// The job is being converted and cannot be changed
    #[error("Job {0} is converting")]
    JobBusy(JobId),

    /// The job is not in a state that allows the transition
    #[error("Job {id} is {status}")]
    InvalidState { id: JobId, status: JobStatus },

    /// A backend failed to parse a whole file
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The parse thread reported a failure for one file
    #[error("{0}")]
    Backend(String),

    /// GLB serialization failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The parse thread panicked or went away
    #[error("Parse worker fault: {0}")]
    WorkerFault(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new initialization error
    pub fn initialization(msg: impl Into<String>) -> Self {
        Error::Initialization(msg.into())
    }

    /// Create a new worker fault
    pub fn worker_fault(msg: impl Into<String>) -> Self {
        Error::WorkerFault(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
