//! services/client/src/error.rs
//!
//! Defines the primary error type for the karaoke client.

use crate::config::ConfigError;
use karaoke_queue_core::{ActionError, AdminError, ApiError, CriticalError, EntryError, StoreError};

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A call to the session service failed.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The local capability store could not be read or written.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The session view could not be opened.
    #[error("{0}")]
    Critical(#[from] CriticalError),

    #[error("{0}")]
    Action(#[from] ActionError),

    #[error("{0}")]
    Admin(#[from] AdminError),

    #[error("{0}")]
    Entry(#[from] EntryError),

    /// Building the HTTP client failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
