//! In-memory server of record used by the unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::{Item, ItemId, ItemUpdate, NewItem, NewSession, Session, SessionId};
use crate::ports::{ApiError, ApiResult, SessionApi};

pub(crate) fn item(id: &str, done: bool) -> Item {
    Item {
        id: ItemId::from(id),
        username: "ana".to_string(),
        title: format!("Song {}", id),
        artist: None,
        video_url: None,
        is_completed: done,
    }
}

pub(crate) fn session(items: Vec<Item>) -> Session {
    Session {
        id: SessionId("s1".to_string()),
        access_code: "123456".to_string(),
        title: "Friday Night".to_string(),
        admin_password: "abcd".to_string(),
        created_at: None,
        expires_at: None,
        items,
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    session: Mutex<Option<Session>>,
    failure: Mutex<Option<ApiError>>,
    fetch_failure: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<&'static str>>,
    fetches: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn with_session(session: Session) -> Self {
        let api = Self::default();
        *api.session.lock().unwrap() = Some(session);
        api.next_id.store(100, Ordering::SeqCst);
        api
    }

    /// Every call fails with `err` until `recover` is called.
    pub(crate) fn fail_with(&self, err: ApiError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    /// Only session fetches fail; writes keep working.
    pub(crate) fn fail_fetches_with(&self, err: ApiError) {
        *self.fetch_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn recover(&self) {
        *self.failure.lock().unwrap() = None;
        *self.fetch_failure.lock().unwrap() = None;
    }

    pub(crate) fn edit(&self, f: impl FnOnce(&mut Session)) {
        if let Some(session) = self.session.lock().unwrap().as_mut() {
            f(session);
        }
    }

    /// Drops the session server-side, as if another client deleted it.
    pub(crate) fn remove_session(&self) {
        *self.session.lock().unwrap() = None;
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str) -> ApiResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        match self.failure.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_item<T>(&self, id: &ItemId, f: impl FnOnce(&mut Session, usize) -> T) -> ApiResult<T> {
        let mut guard = self.session.lock().unwrap();
        let session = guard
            .as_mut()
            .ok_or_else(|| ApiError::http(404, "Session not found", Some("Session not found".into())))?;
        let index = session
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| ApiError::http(404, "Item not found", Some("Item not found".into())))?;
        Ok(f(session, index))
    }
}

#[async_trait]
impl SessionApi for FakeApi {
    async fn get_session_by_code(&self, code: &str) -> ApiResult<Option<Session>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.enter("get_session_by_code")?;
        if let Some(err) = self.fetch_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .session
            .lock()
            .unwrap()
            .clone()
            .filter(|s| s.access_code == code))
    }

    async fn create_session(&self, new_session: &NewSession) -> ApiResult<Session> {
        self.enter("create_session")?;
        let mut guard = self.session.lock().unwrap();
        if let (Some(existing), Some(code)) = (guard.as_ref(), new_session.access_code.as_ref()) {
            if &existing.access_code == code {
                return Err(ApiError::application(
                    400,
                    Some(format!("Session with access code {} already exists", code)),
                ));
            }
        }
        let created = Session {
            id: SessionId(format!("s{}", self.next_id.fetch_add(1, Ordering::SeqCst))),
            access_code: new_session
                .access_code
                .clone()
                .unwrap_or_else(|| "654321".to_string()),
            title: new_session.title.clone(),
            admin_password: new_session.admin_password.clone(),
            created_at: None,
            expires_at: None,
            items: Vec::new(),
        };
        *guard = Some(created.clone());
        Ok(created)
    }

    async fn rename_session(&self, _session_id: &SessionId, title: &str) -> ApiResult<()> {
        self.enter("rename_session")?;
        self.edit(|s| s.title = title.to_string());
        Ok(())
    }

    async fn delete_session(&self, _session_id: &SessionId) -> ApiResult<()> {
        self.enter("delete_session")?;
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn list_items(&self, _session_id: &SessionId) -> ApiResult<Vec<Item>> {
        self.enter("list_items")?;
        Ok(self.session().map(|s| s.items).unwrap_or_default())
    }

    async fn get_item(&self, _session_id: &SessionId, item_id: &ItemId) -> ApiResult<Item> {
        self.enter("get_item")?;
        self.with_item(item_id, |s, i| s.items[i].clone())
    }

    async fn create_item(&self, _session_id: &SessionId, new_item: &NewItem) -> ApiResult<()> {
        self.enter("create_item")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.edit(|s| {
            s.items.push(Item {
                id: ItemId(id.to_string()),
                username: new_item.username.clone(),
                title: new_item.title.clone(),
                artist: new_item.artist.clone(),
                video_url: None,
                is_completed: false,
            })
        });
        Ok(())
    }

    async fn update_item(
        &self,
        _session_id: &SessionId,
        item_id: &ItemId,
        update: &ItemUpdate,
    ) -> ApiResult<()> {
        self.enter("update_item")?;
        self.with_item(item_id, |s, i| {
            let item = &mut s.items[i];
            item.username = update.username.clone();
            item.title = update.title.clone();
            item.video_url = update.video_url.clone();
        })
    }

    async fn delete_item(&self, _session_id: &SessionId, item_id: &ItemId) -> ApiResult<()> {
        self.enter("delete_item")?;
        self.with_item(item_id, |s, i| {
            s.items.remove(i);
        })
    }

    async fn toggle_item(&self, _session_id: &SessionId, item_id: &ItemId) -> ApiResult<()> {
        self.enter("toggle_item")?;
        self.with_item(item_id, |s, i| {
            s.items[i].is_completed = !s.items[i].is_completed;
        })
    }
}
