//! crates/karaoke_queue_core/src/entry.rs
//!
//! Everything that happens before a session view is entered: choosing a
//! display name, typing an access code, and creating a new session.

use std::fmt;
use tracing::{error, info};

use crate::capabilities::Capabilities;
use crate::domain::{NewSession, Session};
use crate::ports::{ApiError, SessionApi, StoreError};

/// Number of digits in an access code.
pub const ACCESS_CODE_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("Please enter a complete 6-digit code")]
    IncompleteCode,
    #[error("Please enter a session title")]
    MissingTitle,
    #[error("Please enter an admin password")]
    MissingPassword,
    #[error("Access code {0} is already in use. Please choose another one.")]
    CodeTaken(String),
    #[error("Failed to create session. Please try again.")]
    CreateFailed(#[source] ApiError),
    #[error("Failed to save your name: {0}")]
    Store(#[from] StoreError),
}

/// A six digit session access code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessCode(String);

impl AccessCode {
    /// Keeps only the digits of `input`; exactly six must remain.
    pub fn parse(input: &str) -> Result<Self, EntryError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != ACCESS_CODE_LEN {
            return Err(EntryError::IncompleteCode);
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn set_display_name(capabilities: &Capabilities, name: &str) -> Result<(), EntryError> {
    capabilities.set_display_name(name)?;
    Ok(())
}

/// Creates a session, optionally with a requested access code.
pub async fn create_session(
    api: &dyn SessionApi,
    title: &str,
    admin_password: &str,
    access_code: Option<&AccessCode>,
) -> Result<Session, EntryError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(EntryError::MissingTitle);
    }
    let admin_password = admin_password.trim();
    if admin_password.is_empty() {
        return Err(EntryError::MissingPassword);
    }

    let request = NewSession {
        title: title.to_string(),
        admin_password: admin_password.to_string(),
        access_code: access_code.map(|c| c.as_str().to_string()),
    };

    match api.create_session(&request).await {
        Ok(session) => {
            info!("Created session '{}' with code {}", session.title, session.access_code);
            Ok(session)
        }
        Err(e) if e.is_duplicate() => Err(EntryError::CodeTaken(
            request.access_code.unwrap_or_default(),
        )),
        Err(e) => {
            error!("Error creating session: {}", e);
            Err(EntryError::CreateFailed(e))
        }
    }
}
