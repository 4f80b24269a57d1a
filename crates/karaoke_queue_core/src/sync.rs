//! crates/karaoke_queue_core/src/sync.rs
//!
//! The session synchronization engine.
//!
//! One engine owns the `LocalSnapshot` of one session for as long as the
//! session is being viewed. It merges with the server at two granularities:
//! a background refresh replaces the whole session when the fetched copy
//! differs, and a successful mutation patches the single affected item in
//! place. A refresh that reads stale server state can therefore revert a
//! freshly patched item until the next refresh; that window is accepted.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capabilities::Capabilities;
use crate::domain::{ItemId, ItemUpdate, LocalSnapshot, NewItem, Session, SessionId};
use crate::ports::{ApiError, SessionApi};
use crate::view::QueueView;

/// Period of the background refresh.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(15);

const ANONYMOUS: &str = "Anonymous";

const ADD_FAILED: &str = "Failed to add song. Please try again.";
const TOGGLE_FAILED: &str = "Failed to update song status. Please try again.";
const DELETE_FAILED: &str = "Failed to delete song. Please try again.";
const UPDATE_FAILED: &str = "Failed to update song. Please try again.";
const RENAME_FAILED: &str = "Failed to rename session. Please try again.";
const CLOSE_FAILED: &str = "Failed to delete session. Please try again.";

//=========================================================================================
// Error Classes
//=========================================================================================

/// Errors that block the whole session view. The only way out is leaving it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CriticalError {
    #[error("Please set your username on the home page first")]
    MissingDisplayName,
    #[error("Karaoke session not found")]
    SessionNotFound,
    #[error("{0}")]
    Load(ApiError),
}

/// A failed user action. The view keeps working and shows a dismissible notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Admin access is required for this action")]
    AdminRequired,
    #[error("The session has not been loaded yet")]
    NotLoaded,
    #[error("Song {0} is no longer in the queue")]
    UnknownItem(ItemId),
    #[error("{0}")]
    Invalid(&'static str),
    #[error("{notice}")]
    Failed {
        notice: &'static str,
        #[source]
        source: ApiError,
    },
}

/// What a single background refresh did to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Replaced,
    Unchanged,
    /// The fetch failed; nothing was surfaced.
    Failed,
    /// The view is torn down or blocked by a critical error.
    Skipped,
}

//=========================================================================================
// Engine
//=========================================================================================

#[derive(Default)]
struct SyncState {
    snapshot: Option<LocalSnapshot>,
    critical: Option<CriticalError>,
    alert: Option<String>,
}

pub struct SessionSyncEngine {
    code: String,
    api: Arc<dyn SessionApi>,
    capabilities: Capabilities,
    state: Mutex<SyncState>,
    /// Bumped every time the snapshot content changes.
    revision: watch::Sender<u64>,
    teardown: CancellationToken,
}

impl SessionSyncEngine {
    pub fn new(code: impl Into<String>, api: Arc<dyn SessionApi>, capabilities: Capabilities) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            code: code.into(),
            api,
            capabilities,
            state: Mutex::new(SyncState::default()),
            revision,
            teardown: CancellationToken::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    // --- Reads ---

    pub async fn snapshot(&self) -> Option<LocalSnapshot> {
        self.state.lock().await.snapshot.clone()
    }

    pub async fn critical_error(&self) -> Option<CriticalError> {
        self.state.lock().await.critical.clone()
    }

    pub async fn alert(&self) -> Option<String> {
        self.state.lock().await.alert.clone()
    }

    pub async fn dismiss_alert(&self) {
        self.state.lock().await.alert = None;
    }

    /// Derives the queue view from the current snapshot. An unloaded session
    /// derives as an empty queue.
    pub async fn queue_view(&self, show_completed: bool) -> QueueView {
        let state = self.state.lock().await;
        let items = state
            .snapshot
            .as_ref()
            .map(|s| s.session.items.as_slice())
            .unwrap_or(&[]);
        QueueView::derive(items, show_completed)
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// A receiver that wakes whenever the snapshot content changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // --- Lifecycle ---

    /// Disarms the refresh task. Responses that arrive afterwards are dropped.
    pub fn close(&self) {
        if !self.teardown.is_cancelled() {
            debug!("Closing sync engine for session {}", self.code);
            self.teardown.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.teardown.is_cancelled()
    }

    /// Arms the background refresh. The first tick fires one `period` after
    /// the call. Each tick runs as its own task, so a slow fetch never delays
    /// the next one.
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let token = self.teardown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Refresh task for session {} stopped.", engine.code);
                        break;
                    }
                    _ = ticker.tick() => {
                        let engine = Arc::clone(&engine);
                        tokio::spawn(async move {
                            engine.refresh().await;
                        });
                    }
                }
            }
        })
    }

    // --- Synchronization ---

    /// Initial, fail-fast load of the session.
    pub async fn load(&self) -> Result<(), CriticalError> {
        if self.capabilities.display_name().is_none() {
            return Err(self.fail_critical(CriticalError::MissingDisplayName).await);
        }

        match self.api.get_session_by_code(&self.code).await {
            Ok(Some(session)) => {
                if self.is_closed() {
                    return Ok(());
                }
                self.store(session, true).await;
                info!("Loaded session {}", self.code);
                Ok(())
            }
            Ok(None) => Err(self.fail_critical(CriticalError::SessionNotFound).await),
            Err(e) => Err(self.fail_critical(CriticalError::Load(e)).await),
        }
    }

    /// One background refresh. Never surfaces an error.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self.is_closed() || self.state.lock().await.critical.is_some() {
            return RefreshOutcome::Skipped;
        }

        let outcome = match self.api.get_session_by_code(&self.code).await {
            Ok(Some(_)) if self.is_closed() => RefreshOutcome::Skipped,
            Ok(Some(session)) => {
                if self.store(session, false).await {
                    RefreshOutcome::Replaced
                } else {
                    RefreshOutcome::Unchanged
                }
            }
            Ok(None) => {
                warn!("Background refresh of {} returned no session", self.code);
                RefreshOutcome::Failed
            }
            Err(e) => {
                warn!("Background refresh of {} failed: {}", self.code, e);
                RefreshOutcome::Failed
            }
        };
        debug!("Refresh of {}: {:?}", self.code, outcome);
        outcome
    }

    // --- Mutations ---

    pub async fn mutate_toggle_completion(&self, item_id: &ItemId) -> Result<(), ActionError> {
        let session_id = self.session_id().await?;
        if let Err(e) = self.api.toggle_item(&session_id, item_id).await {
            return Err(self.raise_alert(TOGGLE_FAILED, e).await);
        }
        self.patch(|session| match session.item_mut(item_id) {
            Some(item) => {
                item.is_completed = !item.is_completed;
                true
            }
            None => false,
        })
        .await;
        info!("Toggled completion of {} in {}", item_id, self.code);
        Ok(())
    }

    pub async fn mutate_delete(&self, item_id: &ItemId) -> Result<(), ActionError> {
        let session_id = self.session_id().await?;
        if let Err(e) = self.api.delete_item(&session_id, item_id).await {
            return Err(self.raise_alert(DELETE_FAILED, e).await);
        }
        self.patch(|session| {
            let before = session.items.len();
            session.items.retain(|item| &item.id != item_id);
            session.items.len() != before
        })
        .await;
        info!("Deleted {} from {}", item_id, self.code);
        Ok(())
    }

    /// Queues a song, then reloads so the server's identifier and ordering
    /// come back with it.
    pub async fn mutate_add(&self, title: &str, artist: &str, contributor: &str) -> Result<(), ActionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ActionError::Invalid("Please enter a song title"));
        }
        let session_id = self.session_id().await?;

        let contributor = contributor.trim();
        let new_item = NewItem {
            username: if contributor.is_empty() { ANONYMOUS.to_string() } else { contributor.to_string() },
            title: title.to_string(),
            artist: Some(artist.trim().to_string()).filter(|a| !a.is_empty()),
        };
        if let Err(e) = self.api.create_item(&session_id, &new_item).await {
            return Err(self.raise_alert(ADD_FAILED, e).await);
        }
        info!("Added '{}' to {}", new_item.title, self.code);

        // A failed reload is recorded as the view's critical error.
        if let Err(e) = self.load().await {
            warn!("Reload of {} after adding a song failed: {}", self.code, e);
        }
        Ok(())
    }

    /// Sets or clears the video link of a queued song.
    pub async fn mutate_set_video(&self, item_id: &ItemId, video_url: Option<&str>) -> Result<(), ActionError> {
        let (session_id, current) = {
            let state = self.state.lock().await;
            let session = &state.snapshot.as_ref().ok_or(ActionError::NotLoaded)?.session;
            let item = session
                .item(item_id)
                .ok_or_else(|| ActionError::UnknownItem(item_id.clone()))?;
            (session.id.clone(), item.clone())
        };

        let video_url = video_url.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string);
        let update = ItemUpdate {
            username: current.username,
            video_url: video_url.clone(),
            title: current.title,
        };
        if let Err(e) = self.api.update_item(&session_id, item_id, &update).await {
            return Err(self.raise_alert(UPDATE_FAILED, e).await);
        }
        self.patch(|session| match session.item_mut(item_id) {
            Some(item) if item.video_url != video_url => {
                item.video_url = video_url;
                true
            }
            _ => false,
        })
        .await;
        Ok(())
    }

    pub async fn rename_session(&self, title: &str) -> Result<(), ActionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ActionError::Invalid("Please enter a session title"));
        }
        let session_id = self.session_id().await?;
        if let Err(e) = self.api.rename_session(&session_id, title).await {
            return Err(self.raise_alert(RENAME_FAILED, e).await);
        }
        self.patch(|session| {
            session.title = title.to_string();
            true
        })
        .await;
        info!("Renamed session {} to '{}'", self.code, title);
        Ok(())
    }

    /// Deletes the session on the server and tears this engine down.
    pub async fn delete_session(&self) -> Result<(), ActionError> {
        let session_id = self.session_id().await?;
        if let Err(e) = self.api.delete_session(&session_id).await {
            return Err(self.raise_alert(CLOSE_FAILED, e).await);
        }
        info!("Deleted session {}", self.code);
        self.close();
        Ok(())
    }

    //=====================================================================================
    // Internal helpers
    //=====================================================================================

    async fn session_id(&self) -> Result<SessionId, ActionError> {
        self.state
            .lock()
            .await
            .snapshot
            .as_ref()
            .map(|s| s.session.id.clone())
            .ok_or(ActionError::NotLoaded)
    }

    /// Writes a fetched session. Returns whether the content changed.
    async fn store(&self, session: Session, clear_critical: bool) -> bool {
        let changed = {
            let mut state = self.state.lock().await;
            if clear_critical {
                state.critical = None;
            }
            let now = Utc::now();
            match state.snapshot.as_mut() {
                Some(snapshot) if snapshot.session == session => {
                    snapshot.last_synced = snapshot.last_synced.max(now);
                    false
                }
                _ => {
                    state.snapshot = Some(LocalSnapshot {
                        session,
                        last_synced: now,
                    });
                    true
                }
            }
        };
        if changed {
            self.bump();
        }
        changed
    }

    /// Applies an in-place edit to the cached session. The closure reports
    /// whether it changed anything.
    async fn patch<F>(&self, edit: F)
    where
        F: FnOnce(&mut Session) -> bool,
    {
        if self.is_closed() {
            return;
        }
        let changed = {
            let mut state = self.state.lock().await;
            match state.snapshot.as_mut() {
                Some(snapshot) => edit(&mut snapshot.session),
                None => false,
            }
        };
        if changed {
            self.bump();
        }
    }

    async fn fail_critical(&self, err: CriticalError) -> CriticalError {
        error!("Session {} unavailable: {}", self.code, err);
        if !self.is_closed() {
            self.state.lock().await.critical = Some(err.clone());
        }
        err
    }

    async fn raise_alert(&self, notice: &'static str, source: ApiError) -> ActionError {
        warn!("{} ({})", notice, source);
        if !self.is_closed() {
            self.state.lock().await.alert = Some(notice.to_string());
        }
        ActionError::Failed { notice, source }
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

impl Drop for SessionSyncEngine {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}
