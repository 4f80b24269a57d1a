//! crates/karaoke_queue_core/src/admin.rs
//!
//! The admin login gate for one session view.
//!
//! The gate compares the submitted secret with the `admin_password` the
//! server shipped inside the session payload, and remembers a successful
//! login in the `CapabilityStore`. It is a UX convenience: the server still
//! decides whether a toggle or delete is accepted.

use tracing::{info, warn};

use crate::capabilities::Capabilities;
use crate::domain::Session;

/// Login form errors. Both are shown inline on the form only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    #[error("Please enter the admin password")]
    Validation,
    #[error("Incorrect admin password")]
    Auth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    Anonymous,
    /// The login form is open.
    PendingLogin,
    Admin,
}

pub struct AdminAuthGate {
    code: String,
    state: AdminState,
    last_error: Option<AdminError>,
    capabilities: Capabilities,
}

impl AdminAuthGate {
    pub fn new(code: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            code: code.into(),
            state: AdminState::Anonymous,
            last_error: None,
            capabilities,
        }
    }

    pub fn state(&self) -> AdminState {
        self.state
    }

    pub fn is_admin(&self) -> bool {
        self.state == AdminState::Admin
    }

    /// The error currently shown on the login form, if any.
    pub fn last_error(&self) -> Option<&AdminError> {
        self.last_error.as_ref()
    }

    /// Grants admin from a remembered capability record without prompting.
    pub fn restore(&mut self) -> bool {
        if self.capabilities.is_admin(&self.code) {
            info!("Restored admin capability for session {}", self.code);
            self.state = AdminState::Admin;
        }
        self.is_admin()
    }

    pub fn open_login(&mut self) {
        if self.state == AdminState::Anonymous {
            self.state = AdminState::PendingLogin;
        }
    }

    pub fn cancel_login(&mut self) {
        if self.state == AdminState::PendingLogin {
            self.state = AdminState::Anonymous;
            self.last_error = None;
        }
    }

    /// Checks `submitted` against the session's admin secret.
    ///
    /// Submitting from `Anonymous` opens the form implicitly. The checks run
    /// from every state, `Admin` included; a failed attempt leaves the gate
    /// in `PendingLogin` with the error recorded.
    pub fn attempt_login(&mut self, submitted: &str, session: &Session) -> Result<(), AdminError> {
        self.state = AdminState::PendingLogin;

        let submitted = submitted.trim();
        let outcome = if submitted.is_empty() {
            Err(AdminError::Validation)
        } else if submitted != session.admin_password {
            Err(AdminError::Auth)
        } else {
            Ok(())
        };

        match outcome {
            Ok(()) => {
                self.state = AdminState::Admin;
                self.last_error = None;
                if let Err(e) = self.capabilities.grant_admin(&self.code) {
                    warn!("Failed to persist admin capability for {}: {}", self.code, e);
                }
                info!("Admin login succeeded for session {}", self.code);
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) {
        self.state = AdminState::Anonymous;
        self.last_error = None;
        if let Err(e) = self.capabilities.revoke_admin(&self.code) {
            warn!("Failed to delete admin capability for {}: {}", self.code, e);
        }
        info!("Admin logout for session {}", self.code);
    }
}
