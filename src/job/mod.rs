mod record;
mod registry;
mod ticket;

pub use record::{JobId, JobRecord, JobState};
pub use registry::{JobRegistry, MemoryRegistry, RegistryError};
pub use ticket::{JobView, Ticket, TicketPayload};
