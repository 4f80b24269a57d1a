//! crates/karaoke_queue_core/src/domain.rs
//!
//! Defines the pure, core data structures for the karaoke queue client.
//! These structs are independent of any wire or storage format.

use chrono::{DateTime, Utc};
use std::fmt;

/// Server-assigned identifier of a karaoke session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned identifier of a queued song, unique within its session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A karaoke event. `items` is kept in server insertion order, which is
/// also the queue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub access_code: String,
    pub title: String,
    /// Opaque admin secret as issued by the server. Only ever compared.
    pub admin_password: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub items: Vec<Item>,
}

impl Session {
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn item_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

/// One queued song request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    /// Display name of the participant who queued the song.
    pub username: String,
    pub title: String,
    pub artist: Option<String>,
    pub video_url: Option<String>,
    pub is_completed: bool,
}

/// The client's cached copy of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSnapshot {
    pub session: Session,
    /// Time of the most recent successful fetch, whether or not it changed
    /// the cached content.
    pub last_synced: DateTime<Utc>,
}

// Payloads sent to the server of record.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub title: String,
    pub admin_password: String,
    pub access_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub username: String,
    pub title: String,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub username: String,
    pub video_url: Option<String>,
    pub title: String,
}
