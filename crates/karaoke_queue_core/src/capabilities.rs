//! crates/karaoke_queue_core/src/capabilities.rs
//!
//! Typed access to the records the client keeps in its `CapabilityStore`:
//! the participant's display name and the per-session admin flags.
//!
//! Nothing stored here is ever sent to or checked by the server.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

use crate::ports::{CapabilityStore, StoreResult};

/// Lifetime of every record written through [`Capabilities`].
pub const RECORD_TTL_DAYS: i64 = 30;

const DISPLAY_NAME_KEY: &str = "karaokeUsername";

fn admin_key(code: &str) -> String {
    format!("karaokeAdmin_{}", code)
}

fn record_ttl() -> Duration {
    Duration::days(RECORD_TTL_DAYS)
}

/// Cheap-to-clone handle over a shared store.
#[derive(Clone)]
pub struct Capabilities {
    store: Arc<dyn CapabilityStore>,
}

impl Capabilities {
    pub fn new(store: Arc<dyn CapabilityStore>) -> Self {
        Self { store }
    }

    /// The remembered display name, if any. A failing store reads as "no
    /// name" so the caller falls into the same path as a first visit.
    pub fn display_name(&self) -> Option<String> {
        match self.store.get(DISPLAY_NAME_KEY) {
            Ok(name) => name.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read display name: {}", e);
                None
            }
        }
    }

    /// Persists a trimmed display name. Blank names are ignored and leave
    /// any previous name in place.
    pub fn set_display_name(&self, name: &str) -> StoreResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        self.store.set(DISPLAY_NAME_KEY, name, record_ttl())
    }

    pub fn is_admin(&self, code: &str) -> bool {
        match self.store.get(&admin_key(code)) {
            Ok(flag) => flag.as_deref() == Some("true"),
            Err(e) => {
                warn!("Failed to read admin flag for session {}: {}", code, e);
                false
            }
        }
    }

    pub fn grant_admin(&self, code: &str) -> StoreResult<()> {
        self.store.set(&admin_key(code), "true", record_ttl())
    }

    pub fn revoke_admin(&self, code: &str) -> StoreResult<()> {
        self.store.delete(&admin_key(code))
    }
}

//=========================================================================================
// In-memory store
//=========================================================================================

/// A process-local `CapabilityStore`. Used by tests and by callers that do
/// not want anything written to disk.
#[derive(Default)]
pub struct MemoryCapabilityStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryCapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CapabilityStore for MemoryCapabilityStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= now => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), (value.to_string(), Utc::now() + ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
