//! crates/karaoke_queue_core/src/ports.rs
//!
//! Defines the service contracts (traits) the engine talks through.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the HTTP client and of the client-side storage used to
//! remember capabilities.

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{Item, ItemId, ItemUpdate, NewItem, NewSession, Session, SessionId};

//=========================================================================================
// Uniform API Error
//=========================================================================================

/// Which layer of a call failed. Carried for logging only; callers decide
/// what to do from the error as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server could not be reached, or answered with something that is
    /// not the JSON envelope.
    Transport,
    /// The server answered with a non-2xx status.
    Http,
    /// The server answered 2xx but the envelope said `success: false`.
    Application,
}

/// The single error shape every session/item call resolves to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    /// Human readable message, already chosen from the best available source.
    pub message: String,
    pub status: Option<u16>,
    /// The raw `error` field of the envelope, when the server sent one.
    pub server_message: Option<String>,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
            status: None,
            server_message: None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>, server_message: Option<String>) -> Self {
        Self {
            kind: FailureKind::Http,
            message: message.into(),
            status: Some(status),
            server_message,
        }
    }

    pub fn application(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .clone()
            .unwrap_or_else(|| "API request failed".to_string());
        Self {
            kind: FailureKind::Application,
            message,
            status: Some(status),
            server_message,
        }
    }

    /// True when the server rejected a create because the requested access
    /// code is taken.
    pub fn is_duplicate(&self) -> bool {
        self.message.contains("already exists")
            || self
                .server_message
                .as_deref()
                .is_some_and(|m| m.contains("already exists"))
    }
}

/// A convenience type alias for `Result<T, ApiError>`.
pub type ApiResult<T> = Result<T, ApiError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The session/item REST service, the server of record.
#[async_trait]
pub trait SessionApi: Send + Sync {
    // --- Sessions ---
    /// Returns `Ok(None)` when the server answered successfully but without a
    /// session in the payload.
    async fn get_session_by_code(&self, code: &str) -> ApiResult<Option<Session>>;

    async fn create_session(&self, new_session: &NewSession) -> ApiResult<Session>;

    async fn rename_session(&self, session_id: &SessionId, title: &str) -> ApiResult<()>;

    async fn delete_session(&self, session_id: &SessionId) -> ApiResult<()>;

    // --- Items ---
    async fn list_items(&self, session_id: &SessionId) -> ApiResult<Vec<Item>>;

    async fn get_item(&self, session_id: &SessionId, item_id: &ItemId) -> ApiResult<Item>;

    async fn create_item(&self, session_id: &SessionId, new_item: &NewItem) -> ApiResult<()>;

    async fn update_item(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        update: &ItemUpdate,
    ) -> ApiResult<()>;

    async fn delete_item(&self, session_id: &SessionId, item_id: &ItemId) -> ApiResult<()>;

    async fn toggle_item(&self, session_id: &SessionId, item_id: &ItemId) -> ApiResult<()>;
}

/// Failure of the client-side key/value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(String),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Client-persisted key/value storage with per-entry expiry. Expired
/// entries read as absent.
pub trait CapabilityStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    fn delete(&self, key: &str) -> StoreResult<()>;
}
