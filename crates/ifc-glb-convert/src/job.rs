// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job store: one record per input file, observed through subscriptions
//!
//! The coordinator is the only writer. Everyone else gets a [`JobObserver`]:
//! snapshots, counts and a [`JobEvent`] for every change. Callbacks run after
//! the store lock has been released, so they may read through an observer.

use crate::{Error, Result};
use ifc_glb_model::BackendKind;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque job identifier, unique within one store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Converting,
    Success,
    Failed,
}

impl JobStatus {
    /// Success or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Converting => write!(f, "converting"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What a successful conversion produced
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionOutput {
    /// The GLB file
    pub glb: Arc<[u8]>,
    /// Meshes in the exported scene
    pub geometry_count: usize,
    /// Materials in the exported scene
    pub material_count: usize,
    /// Wall time from `Converting` to `Success`
    pub conversion_time_ms: u64,
    /// Backend that parsed the file
    pub backend: BackendKind,
}

/// One input file and its conversion state
#[derive(Clone, Debug)]
pub struct ConversionJob {
    pub id: JobId,
    pub name: String,
    pub byte_size: usize,
    /// Source bytes; never written after enqueue
    pub bytes: Arc<[u8]>,
    pub status: JobStatus,
    /// 0-100, non-decreasing while converting
    pub progress: u8,
    /// Present only on `Success`
    pub result: Option<ConversionOutput>,
    /// Present only on `Failed`
    pub error: Option<String>,
}

/// Store change notification
#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent {
    Added {
        id: JobId,
        name: String,
    },
    StatusChanged {
        id: JobId,
        status: JobStatus,
    },
    Progress {
        id: JobId,
        percent: u8,
        message: String,
    },
    Removed {
        id: JobId,
    },
    /// Overall batch progress, `completed / total * 100`
    BatchProgress {
        completed: usize,
        total: usize,
        percent: f64,
    },
}

/// Handle returned by [`JobObserver::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&JobEvent) + Send + Sync>;

/// Counts per status plus byte and progress totals
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobSummary {
    pub total: usize,
    pub pending: usize,
    pub converting: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of source file sizes
    pub total_bytes: usize,
    /// Terminal jobs over all jobs, in percent
    pub progress: f64,
}

/// Overall progress once `completed` of `total` jobs are terminal
pub fn batch_progress(completed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

#[derive(Default)]
struct StoreData {
    jobs: Vec<ConversionJob>,
    next_id: u64,
}

impl StoreData {
    fn job_mut(&mut self, id: JobId) -> Result<&mut ConversionJob> {
        self.jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or(Error::JobNotFound(id))
    }
}

/// Thread-safe job store, written only by the coordinator
#[derive(Clone, Default)]
pub(crate) struct JobStore {
    data: Arc<RwLock<StoreData>>,
    subscribers: Arc<RwLock<Vec<(SubscriptionId, Subscriber)>>>,
    next_subscription: Arc<AtomicU64>,
}

impl fmt::Debug for JobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobStore")
            .field("jobs", &self.data.read().jobs.len())
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

impl JobStore {
    /// Create an empty store
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a `Pending` job
    pub(crate) fn add(&self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> JobId {
        let name = name.into();
        let bytes = bytes.into();
        let id = {
            let mut data = self.data.write();
            data.next_id += 1;
            let id = JobId(data.next_id);
            data.jobs.push(ConversionJob {
                id,
                name: name.clone(),
                byte_size: bytes.len(),
                bytes,
                status: JobStatus::Pending,
                progress: 0,
                result: None,
                error: None,
            });
            id
        };
        self.notify(&JobEvent::Added { id, name });
        id
    }

    /// Snapshot of one job
    pub(crate) fn get(&self, id: JobId) -> Option<ConversionJob> {
        self.data.read().jobs.iter().find(|j| j.id == id).cloned()
    }

    /// Snapshot of every job in enqueue order
    pub(crate) fn jobs(&self) -> Vec<ConversionJob> {
        self.data.read().jobs.clone()
    }

    /// Job ids in enqueue order
    pub(crate) fn ids(&self) -> Vec<JobId> {
        self.data.read().jobs.iter().map(|j| j.id).collect()
    }

    /// Number of jobs currently converting
    pub(crate) fn converting_count(&self) -> usize {
        self.data
            .read()
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Converting)
            .count()
    }

    /// Return a job to `Pending`, dropping its result or error
    pub(crate) fn reset(&self, id: JobId) -> Result<()> {
        let changed = {
            let mut data = self.data.write();
            let job = data.job_mut(id)?;
            if job.status == JobStatus::Converting {
                return Err(Error::JobBusy(id));
            }
            let changed = job.status != JobStatus::Pending;
            job.status = JobStatus::Pending;
            job.progress = 0;
            job.result = None;
            job.error = None;
            changed
        };
        if changed {
            self.notify(&JobEvent::StatusChanged {
                id,
                status: JobStatus::Pending,
            });
        }
        Ok(())
    }

    /// Move a `Pending` job to `Converting` and hand out its bytes
    pub(crate) fn begin(&self, id: JobId) -> Result<(String, Arc<[u8]>)> {
        let taken = {
            let mut data = self.data.write();
            let job = data.job_mut(id)?;
            if job.status != JobStatus::Pending {
                return Err(Error::JobBusy(id));
            }
            job.status = JobStatus::Converting;
            job.progress = 0;
            (job.name.clone(), Arc::clone(&job.bytes))
        };
        self.notify(&JobEvent::StatusChanged {
            id,
            status: JobStatus::Converting,
        });
        Ok(taken)
    }

    /// Record progress for a converting job
    ///
    /// Values below the current progress are raised to it and 100 is reserved
    /// for success. Returns the stored value, or `None` if the job is not
    /// converting.
    pub(crate) fn set_progress(&self, id: JobId, percent: u8, message: &str) -> Option<u8> {
        let stored = {
            let mut data = self.data.write();
            let job = data.job_mut(id).ok()?;
            if job.status != JobStatus::Converting {
                return None;
            }
            job.progress = job.progress.max(percent.min(99));
            job.progress
        };
        log::debug!("{id}: {stored}% {message}");
        self.notify(&JobEvent::Progress {
            id,
            percent: stored,
            message: message.to_string(),
        });
        Some(stored)
    }

    /// Finish a converting job successfully
    pub(crate) fn succeed(&self, id: JobId, output: ConversionOutput) -> Result<()> {
        self.finish(id, JobStatus::Success, |job| {
            job.progress = 100;
            job.result = Some(output);
        })
    }

    /// Finish a converting job with an error message
    pub(crate) fn fail(&self, id: JobId, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.finish(id, JobStatus::Failed, |job| job.error = Some(message))
    }

    fn finish(
        &self,
        id: JobId,
        status: JobStatus,
        apply: impl FnOnce(&mut ConversionJob),
    ) -> Result<()> {
        {
            let mut data = self.data.write();
            let job = data.job_mut(id)?;
            if job.status != JobStatus::Converting {
                return Err(Error::InvalidState {
                    id,
                    status: job.status,
                });
            }
            job.status = status;
            apply(job);
        }
        self.notify(&JobEvent::StatusChanged { id, status });
        Ok(())
    }

    /// Remove a job that is not converting
    pub(crate) fn remove(&self, id: JobId) -> Result<ConversionJob> {
        let removed = {
            let mut data = self.data.write();
            let index = data
                .jobs
                .iter()
                .position(|j| j.id == id)
                .ok_or(Error::JobNotFound(id))?;
            if data.jobs[index].status == JobStatus::Converting {
                return Err(Error::JobBusy(id));
            }
            data.jobs.remove(index)
        };
        self.notify(&JobEvent::Removed { id });
        Ok(removed)
    }

    /// Counts per status
    pub(crate) fn summary(&self) -> JobSummary {
        let data = self.data.read();
        let mut summary = JobSummary {
            total: data.jobs.len(),
            ..JobSummary::default()
        };
        for job in &data.jobs {
            summary.total_bytes += job.byte_size;
            match job.status {
                JobStatus::Pending => summary.pending += 1,
                JobStatus::Converting => summary.converting += 1,
                JobStatus::Success => summary.succeeded += 1,
                JobStatus::Failed => summary.failed += 1,
            }
        }
        summary.progress = if summary.total == 0 {
            0.0
        } else {
            batch_progress(summary.succeeded + summary.failed, summary.total)
        };
        summary
    }

    /// Register an observer
    pub(crate) fn subscribe(&self, callback: impl Fn(&JobEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Drop an observer; false if it was not registered
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Deliver an event to every observer
    pub(crate) fn notify(&self, event: &JobEvent) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    /// Read-only handle for observers
    pub(crate) fn observer(&self) -> JobObserver {
        JobObserver {
            store: self.clone(),
        }
    }
}

/// Read-only view of the job store
///
/// Cheap to clone and safe to move into subscriber callbacks or other
/// threads. It cannot change any job.
#[derive(Clone, Debug)]
pub struct JobObserver {
    store: JobStore,
}

impl JobObserver {
    /// Snapshot of one job
    pub fn get(&self, id: JobId) -> Option<ConversionJob> {
        self.store.get(id)
    }

    /// Snapshot of every job in enqueue order
    pub fn jobs(&self) -> Vec<ConversionJob> {
        self.store.jobs()
    }

    pub fn len(&self) -> usize {
        self.store.data.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn converting_count(&self) -> usize {
        self.store.converting_count()
    }

    pub fn summary(&self) -> JobSummary {
        self.store.summary()
    }

    pub fn subscribe(&self, callback: impl Fn(&JobEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.store.subscribe(callback)
    }

    /// Drop an observer; false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }
}
