use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error};

use super::record::{JobId, JobRecord, JobState};

/// Read capability the ticket and renderer need from whoever owns job records.
pub trait JobRegistry: Send + Sync {
    type Error;

    /// Looks up the current record for `id`.
    fn find(&self, id: &JobId) -> Result<JobRecord, Self::Error>;

    /// Whether the hosting process has been asked to stop.
    fn is_stopped(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job {id} is already {state}")]
    AlreadyTerminal { id: JobId, state: JobState },
}

/// In-process registry backed by a locked map.
///
/// Every read clones the record under the read lock, so callers never see a
/// half-applied update.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: RwLock<HashMap<JobId, JobRecord>>,
    order: RwLock<Vec<JobId>>,
    stopped: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new queued job and returns its identifier.
    pub fn submit(&self, job_type: impl Into<String>) -> JobId {
        let id = JobId::generate();
        let record = JobRecord::new(id.clone(), job_type);
        debug!(job_id = %id, job_type = %record.job_type, "job submitted");
        self.write_records().insert(id.clone(), record);
        match self.order.write() {
            Ok(mut order) => order.push(id.clone()),
            Err(e) => error!("RwLock poisoned writing job order: {e}"),
        }
        id
    }

    /// Identifiers of every live job, in submission order.
    pub fn ids(&self) -> Vec<JobId> {
        let records = self.read_records();
        match self.order.read() {
            Ok(order) => order
                .iter()
                .filter(|id| records.contains_key(*id))
                .cloned()
                .collect(),
            Err(e) => {
                error!("RwLock poisoned reading job order: {e}");
                Vec::new()
            }
        }
    }

    /// Replaces the human-readable progress text. Allowed in any state.
    pub fn set_status(&self, id: &JobId, status: impl Into<String>) -> Result<(), RegistryError> {
        let status = status.into();
        self.update(id, |record| {
            debug!(job_id = %record.id, %status, "status updated");
            record.status = status;
            Ok(())
        })
    }

    pub fn start(&self, id: &JobId) -> Result<(), RegistryError> {
        self.transition(id, JobState::Running, None)
    }

    pub fn complete(&self, id: &JobId, result: Option<String>) -> Result<(), RegistryError> {
        self.transition(id, JobState::Completed, result)
    }

    pub fn fail(&self, id: &JobId, result: Option<String>) -> Result<(), RegistryError> {
        self.transition(id, JobState::Failed, result)
    }

    /// Drops the record; subsequent lookups fail with `NotFound`.
    pub fn remove(&self, id: &JobId) -> Result<JobRecord, RegistryError> {
        self.write_records()
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Raises the process-wide termination flag.
    pub fn stop(&self) {
        debug!("termination requested");
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn transition(
        &self,
        id: &JobId,
        next: JobState,
        result: Option<String>,
    ) -> Result<(), RegistryError> {
        self.update(id, |record| {
            if record.state.is_terminal() {
                return Err(RegistryError::AlreadyTerminal {
                    id: record.id.clone(),
                    state: record.state,
                });
            }
            debug!(job_id = %record.id, from = %record.state, to = %next, "state changed");
            record.state = next;
            if next.is_terminal() {
                record.result = result;
            }
            Ok(())
        })
    }

    fn update(
        &self,
        id: &JobId,
        apply: impl FnOnce(&mut JobRecord) -> Result<(), RegistryError>,
    ) -> Result<(), RegistryError> {
        let mut records = self.write_records();
        let record = records
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        apply(record)?;
        record.updated_at = Utc::now();
        Ok(())
    }

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, JobRecord>> {
        // Writers never leave a record half-updated, so poisoned data is still consistent.
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_records(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, JobRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl JobRegistry for MemoryRegistry {
    type Error = RegistryError;

    fn find(&self, id: &JobId) -> Result<JobRecord, RegistryError> {
        self.read_records()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
