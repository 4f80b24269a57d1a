pub mod admin;
pub mod capabilities;
pub mod domain;
pub mod entry;
pub mod ports;
pub mod session_view;
pub mod sync;
pub mod view;

#[cfg(test)]
mod testing;

pub use admin::{AdminAuthGate, AdminError, AdminState};
pub use capabilities::{Capabilities, MemoryCapabilityStore};
pub use domain::{Item, ItemId, ItemUpdate, LocalSnapshot, NewItem, NewSession, Session, SessionId};
pub use entry::{AccessCode, EntryError};
pub use ports::{ApiError, ApiResult, CapabilityStore, FailureKind, SessionApi, StoreError, StoreResult};
pub use session_view::SessionView;
pub use sync::{ActionError, CriticalError, RefreshOutcome, SessionSyncEngine, REFRESH_INTERVAL};
pub use view::{QueueState, QueueView};
