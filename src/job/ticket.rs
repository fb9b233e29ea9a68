//! Registry-backed job handles.
//!
//! A [`Ticket`] holds nothing but an identifier and the registry it resolves
//! against. Every accessor goes back to the registry, so a ticket always shows
//! the live record and never a value remembered from an earlier call.

use std::sync::Arc;

use serde::Serialize;

use super::record::{JobId, JobRecord, JobState};
use super::registry::JobRegistry;

/// Read view of a job that the status renderer can poll.
///
/// Implementors supply `id` and a point-in-time `snapshot`; the field
/// accessors each take their own snapshot.
pub trait JobView {
    type Error;

    fn id(&self) -> &JobId;

    fn snapshot(&self) -> Result<JobRecord, Self::Error>;

    fn job_type(&self) -> Result<String, Self::Error> {
        self.snapshot().map(|r| r.job_type)
    }

    fn state(&self) -> Result<JobState, Self::Error> {
        self.snapshot().map(|r| r.state)
    }

    fn status(&self) -> Result<String, Self::Error> {
        self.snapshot().map(|r| r.status)
    }

    fn result(&self) -> Result<Option<String>, Self::Error> {
        self.snapshot().map(|r| r.result)
    }

    fn is_completed(&self) -> Result<bool, Self::Error> {
        self.snapshot().map(|r| r.is_completed())
    }

    fn is_failed(&self) -> Result<bool, Self::Error> {
        self.snapshot().map(|r| r.is_failed())
    }
}

/// Serializable payload describing a job at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketPayload {
    pub id: JobId,
    pub result: Option<String>,
    pub state: JobState,
    pub status: String,
    #[serde(rename = "type")]
    pub job_type: String,
}

impl From<JobRecord> for TicketPayload {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            result: record.result,
            state: record.state,
            status: record.status,
            job_type: record.job_type,
        }
    }
}

/// Handle to one job in a registry.
pub struct Ticket<R> {
    id: JobId,
    registry: Arc<R>,
}

impl<R> Clone for Ticket<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R> std::fmt::Debug for Ticket<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket").field("id", &self.id).finish()
    }
}

impl<R: JobRegistry> Ticket<R> {
    /// Creates a ticket without checking that `id` resolves yet.
    pub fn new(id: JobId, registry: Arc<R>) -> Self {
        Self { id, registry }
    }

    /// Reads all fields from a single lookup.
    pub fn serialize(&self) -> Result<TicketPayload, R::Error> {
        self.registry.find(&self.id).map(TicketPayload::from)
    }
}

impl<R: JobRegistry> JobView for Ticket<R> {
    type Error = R::Error;

    fn id(&self) -> &JobId {
        &self.id
    }

    fn snapshot(&self) -> Result<JobRecord, R::Error> {
        self.registry.find(&self.id)
    }
}
