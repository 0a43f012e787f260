// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The parse thread
//!
//! All backend work (selection, model opening, extraction) happens on one
//! dedicated thread. The orchestrator talks to it only through
//! [`ToExecutor`] and [`FromExecutor`] messages. Panics inside a backend are
//! caught and reported as worker faults; the thread keeps serving requests.

use crate::job::JobId;
use crate::selector::{BackendSelector, Selection};
use crate::{Error, Result};
use ifc_glb_model::{ExtractionResult, IfcParser};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Orchestrator to parse thread
#[derive(Clone, Debug)]
pub enum ToExecutor {
    /// Run backend selection; repeated requests get the cached answer
    Init,
    ParseRequest {
        job_id: JobId,
        bytes: Arc<[u8]>,
        file_name: String,
    },
    Shutdown,
}

/// Parse thread to orchestrator
#[derive(Clone, Debug)]
pub enum FromExecutor {
    /// A native backend is ready
    InitComplete { source: String },
    /// The fallback backend was committed to; informational
    FallbackMode { message: String },
    Progress {
        job_id: JobId,
        percent: u8,
        message: String,
    },
    ParseComplete {
        job_id: JobId,
        result: Box<ExtractionResult>,
    },
    /// No job id means initialization failed
    Error {
        job_id: Option<JobId>,
        message: String,
    },
}

/// Handle to the parse thread; shuts it down on drop
#[derive(Debug)]
pub struct ParseExecutor {
    sender: Sender<ToExecutor>,
    receiver: Receiver<FromExecutor>,
    handle: Option<JoinHandle<()>>,
}

impl ParseExecutor {
    /// Start the parse thread
    pub fn spawn(selector: BackendSelector) -> Result<Self> {
        let (to_worker, from_orchestrator) = mpsc::channel();
        let (to_orchestrator, from_worker) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("ifc-parse".to_string())
            .spawn(move || run(selector, from_orchestrator, to_orchestrator))?;
        Ok(Self {
            sender: to_worker,
            receiver: from_worker,
            handle: Some(handle),
        })
    }

    pub fn send(&self, message: ToExecutor) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| Error::worker_fault("parse thread is gone"))
    }

    /// Block until the parse thread says something
    pub fn recv(&self) -> Result<FromExecutor> {
        self.receiver
            .recv()
            .map_err(|_| Error::worker_fault("parse thread is gone"))
    }
}

impl Drop for ParseExecutor {
    fn drop(&mut self) {
        let _ = self.sender.send(ToExecutor::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("parse thread panicked during shutdown");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn init_reply(selector: &BackendSelector, backend: &mut Option<Box<dyn IfcParser>>) -> FromExecutor {
    match catch_unwind(AssertUnwindSafe(|| selector.select())) {
        Ok(Ok(Selection::Native { source, backend: b })) => {
            *backend = Some(b);
            FromExecutor::InitComplete { source }
        }
        Ok(Ok(Selection::Fallback { message, backend: b })) => {
            *backend = Some(b);
            FromExecutor::FallbackMode { message }
        }
        Ok(Err(Error::Initialization(message))) => FromExecutor::Error {
            job_id: None,
            message,
        },
        Ok(Err(e)) => FromExecutor::Error {
            job_id: None,
            message: e.to_string(),
        },
        Err(payload) => FromExecutor::Error {
            job_id: None,
            message: Error::worker_fault(panic_message(payload.as_ref())).to_string(),
        },
    }
}

fn parse_reply(
    parser: &dyn IfcParser,
    job_id: JobId,
    bytes: &[u8],
    file_name: &str,
    progress: &Sender<FromExecutor>,
) -> FromExecutor {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        parser.parse_with_progress(bytes, file_name, &mut |percent, message| {
            let _ = progress.send(FromExecutor::Progress {
                job_id,
                percent,
                message: message.to_string(),
            });
        })
    }));
    match outcome {
        Ok(Ok(result)) => FromExecutor::ParseComplete {
            job_id,
            result: Box::new(result),
        },
        Ok(Err(e)) => FromExecutor::Error {
            job_id: Some(job_id),
            message: e.to_string(),
        },
        Err(payload) => FromExecutor::Error {
            job_id: Some(job_id),
            message: Error::worker_fault(panic_message(payload.as_ref())).to_string(),
        },
    }
}

fn run(selector: BackendSelector, inbox: Receiver<ToExecutor>, outbox: Sender<FromExecutor>) {
    let mut backend: Option<Box<dyn IfcParser>> = None;
    let mut init: Option<FromExecutor> = None;

    while let Ok(message) = inbox.recv() {
        let reply = match message {
            ToExecutor::Init => init
                .get_or_insert_with(|| init_reply(&selector, &mut backend))
                .clone(),
            ToExecutor::ParseRequest {
                job_id,
                bytes,
                file_name,
            } => match backend.as_deref() {
                Some(parser) => {
                    log::debug!("{job_id}: parsing {file_name} with the {} backend", parser.kind());
                    parse_reply(parser, job_id, &bytes, &file_name, &outbox)
                }
                None => FromExecutor::Error {
                    job_id: Some(job_id),
                    message: Error::NotReady.to_string(),
                },
            },
            ToExecutor::Shutdown => break,
        };
        if outbox.send(reply).is_err() {
            break;
        }
    }
    log::debug!("parse thread stopped");
}
