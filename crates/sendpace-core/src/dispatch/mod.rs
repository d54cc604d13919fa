//! Interactive dispatch - sequential, paced sending to a contact list

mod controller;
mod events;
mod progress;
mod queue;

pub use controller::DispatchController;
pub use events::{DispatchLog, LogEntry, LogKind};
pub use progress::{DispatchProgress, DispatchState, RecipientState};
pub use queue::{DispatchQueue, DispatchRequest, DispatchSummary};
