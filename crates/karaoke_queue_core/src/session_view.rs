//! crates/karaoke_queue_core/src/session_view.rs
//!
//! Binds one sync engine, one admin gate and the "show completed" toggle for
//! the lifetime of a single visit to a session.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::admin::{AdminAuthGate, AdminError, AdminState};
use crate::capabilities::Capabilities;
use crate::domain::{ItemId, LocalSnapshot};
use crate::ports::SessionApi;
use crate::sync::{ActionError, CriticalError, SessionSyncEngine};
use crate::view::QueueView;

pub struct SessionView {
    engine: Arc<SessionSyncEngine>,
    gate: AdminAuthGate,
    capabilities: Capabilities,
    show_completed: bool,
    refresh_task: Option<JoinHandle<()>>,
}

impl SessionView {
    /// Restores a remembered admin login, loads the session and arms the
    /// background refresh.
    ///
    /// A failed load does not fail `enter`; the view is returned blocked and
    /// `critical_error` reports why.
    pub async fn enter(
        code: &str,
        api: Arc<dyn SessionApi>,
        capabilities: Capabilities,
        refresh_period: Duration,
    ) -> Self {
        let mut view = Self::enter_once(code, api, capabilities).await;
        view.refresh_task = Some(view.engine.spawn_refresh(refresh_period));
        view
    }

    /// Enters without arming the background refresh. Used for one-shot
    /// commands that act on the session and leave.
    pub async fn enter_once(code: &str, api: Arc<dyn SessionApi>, capabilities: Capabilities) -> Self {
        let engine = Arc::new(SessionSyncEngine::new(code, api, capabilities.clone()));
        let mut gate = AdminAuthGate::new(code, capabilities.clone());
        gate.restore();
        let _ = engine.load().await;

        Self {
            engine,
            gate,
            capabilities,
            show_completed: false,
            refresh_task: None,
        }
    }

    pub fn engine(&self) -> &Arc<SessionSyncEngine> {
        &self.engine
    }

    pub fn display_name(&self) -> Option<String> {
        self.capabilities.display_name()
    }

    pub async fn critical_error(&self) -> Option<CriticalError> {
        self.engine.critical_error().await
    }

    pub async fn snapshot(&self) -> Option<LocalSnapshot> {
        self.engine.snapshot().await
    }

    // --- Queue display ---

    pub fn show_completed(&self) -> bool {
        self.show_completed
    }

    pub fn set_show_completed(&mut self, show: bool) {
        self.show_completed = show;
    }

    pub async fn queue(&self) -> QueueView {
        self.engine.queue_view(self.show_completed).await
    }

    // --- Admin ---

    pub fn admin_state(&self) -> AdminState {
        self.gate.state()
    }

    pub fn is_admin(&self) -> bool {
        self.gate.is_admin()
    }

    pub fn open_admin_login(&mut self) {
        self.gate.open_login();
    }

    pub fn cancel_admin_login(&mut self) {
        self.gate.cancel_login();
    }

    /// Checks the secret against the currently cached session. Without a
    /// snapshot there is nothing to compare against and the attempt fails.
    pub async fn admin_login(&mut self, secret: &str) -> Result<(), AdminError> {
        match self.engine.snapshot().await {
            Some(snapshot) => self.gate.attempt_login(secret, &snapshot.session),
            None if secret.trim().is_empty() => Err(AdminError::Validation),
            None => Err(AdminError::Auth),
        }
    }

    pub fn admin_logout(&mut self) {
        self.gate.logout();
    }

    // --- Actions ---

    pub async fn add_song(&self, title: &str, artist: &str) -> Result<(), ActionError> {
        let contributor = self.capabilities.display_name().unwrap_or_default();
        self.engine.mutate_add(title, artist, &contributor).await
    }

    pub async fn toggle_completion(&self, item_id: &ItemId) -> Result<(), ActionError> {
        self.require_admin()?;
        self.engine.mutate_toggle_completion(item_id).await
    }

    pub async fn delete_song(&self, item_id: &ItemId) -> Result<(), ActionError> {
        self.require_admin()?;
        self.engine.mutate_delete(item_id).await
    }

    pub async fn set_video_url(&self, item_id: &ItemId, video_url: Option<&str>) -> Result<(), ActionError> {
        self.require_admin()?;
        self.engine.mutate_set_video(item_id, video_url).await
    }

    pub async fn rename_session(&self, title: &str) -> Result<(), ActionError> {
        self.require_admin()?;
        self.engine.rename_session(title).await
    }

    /// Deletes the session, forgets the admin login for it and tears the
    /// view down.
    pub async fn close_session(mut self) -> Result<(), ActionError> {
        self.require_admin()?;
        self.engine.delete_session().await?;
        self.gate.logout();
        self.leave();
        Ok(())
    }

    pub async fn alert(&self) -> Option<String> {
        self.engine.alert().await
    }

    pub async fn dismiss_alert(&self) {
        self.engine.dismiss_alert().await;
    }

    /// Tears the view down. Called on drop as well.
    pub fn leave(&mut self) {
        self.engine.close();
        self.refresh_task.take();
    }

    fn require_admin(&self) -> Result<(), ActionError> {
        if self.gate.is_admin() {
            Ok(())
        } else {
            Err(ActionError::AdminRequired)
        }
    }
}

impl Drop for SessionView {
    fn drop(&mut self) {
        self.leave();
    }
}
