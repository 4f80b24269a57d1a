//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter, the concrete implementation of the
//! `SessionApi` port from the core crate. It speaks the session service's
//! JSON envelope (`{success, data?, error?}`) over `reqwest` and folds every
//! failure into the core's uniform `ApiError`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use karaoke_queue_core::domain::{Item, ItemId, ItemUpdate, NewItem, NewSession, Session, SessionId};
use karaoke_queue_core::ports::{ApiError, ApiResult, SessionApi};
use reqwest::{header::CONTENT_TYPE, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SessionApi` port against the REST service.
#[derive(Clone)]
pub struct HttpSessionApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSessionApi {
    /// Creates a new `HttpSessionApi`. `base_url` includes the `/api` prefix.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends one request and returns the envelope's `data`, if any.
    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<Option<Value>>
    where
        B: Serialize + ?Sized,
    {
        let request_id = Uuid::new_v4();
        debug!("{} {} (x-request-id {})", method, path, request_id);

        let mut request = self
            .http
            .request(method, self.url(path))
            .header("x-request-id", request_id.to_string())
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("Network error: {}", e)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(format!("Failed to read response: {}", e)))?;

        classify_response(status, &bytes)
    }

    async fn get(&self, path: &str) -> ApiResult<Option<Value>> {
        self.send::<()>(Method::GET, path, None).await
    }
}

//=========================================================================================
// Envelope Classification
//=========================================================================================

/// Turns a status and raw body into the envelope's `data` or an `ApiError`.
///
/// - non-2xx: message from the JSON `error` field, then `detail.message`,
///   then `HTTP Error {status}`; a non-JSON body uses the status reason.
/// - 2xx but not JSON: transport failure.
/// - 2xx with `success` false or missing: application failure.
pub fn classify_response(status: StatusCode, body: &[u8]) -> ApiResult<Option<Value>> {
    let code = status.as_u16();

    if !status.is_success() {
        let fallback = format!("HTTP Error {}", code);
        let err = match serde_json::from_slice::<Value>(body) {
            Ok(json) => {
                let server_message = string_at(&json, "/error");
                let message = server_message
                    .clone()
                    .or_else(|| string_at(&json, "/detail/message"))
                    .unwrap_or(fallback);
                ApiError::http(code, message, server_message)
            }
            Err(_) => {
                let message = status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or(fallback);
                ApiError::http(code, message, None)
            }
        };
        return Err(err);
    }

    let json: Value = serde_json::from_slice(body).map_err(|_| ApiError {
        status: Some(code),
        ..ApiError::transport("Invalid response from server")
    })?;

    if !json.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Err(ApiError::application(code, string_at(&json, "/error")));
    }

    Ok(json.get("data").filter(|d| !d.is_null()).cloned())
}

fn string_at(json: &Value, pointer: &str) -> Option<String> {
    json.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn decode<T>(data: Value, what: &str) -> ApiResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(data)
        .map_err(|e| ApiError::transport(format!("Malformed {} in response: {}", what, e)))
}

fn require(data: Option<Value>, what: &str) -> ApiResult<Value> {
    data.ok_or_else(|| ApiError::transport(format!("Response did not include the {}", what)))
}

//=========================================================================================
// Wire Record Structs
//=========================================================================================

/// Identifiers arrive as strings from some backends and numbers from others.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(i64),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            RecordId::Text(s) => s,
            RecordId::Number(n) => n.to_string(),
        }
    }
}

/// Document stores may send `_id`, `id`, or both. `_id` wins when both are set.
fn record_id(mongo_id: Option<RecordId>, id: Option<RecordId>, what: &str) -> ApiResult<String> {
    mongo_id
        .or(id)
        .map(RecordId::into_string)
        .ok_or_else(|| ApiError::transport(format!("Malformed {} in response: missing identifier", what)))
}

#[derive(Deserialize)]
struct SessionRecord {
    #[serde(default, rename = "_id")]
    mongo_id: Option<RecordId>,
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    access_code: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    admin_password: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    items: Vec<ItemRecord>,
}

impl SessionRecord {
    fn into_domain(self) -> ApiResult<Session> {
        Ok(Session {
            id: SessionId(record_id(self.mongo_id, self.id, "session")?),
            access_code: self.access_code,
            title: self.title,
            admin_password: self.admin_password,
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            expires_at: self.expires_at.as_deref().and_then(parse_timestamp),
            items: self
                .items
                .into_iter()
                .map(ItemRecord::into_domain)
                .collect::<ApiResult<_>>()?,
        })
    }
}

#[derive(Deserialize)]
struct ItemRecord {
    #[serde(default, rename = "_id")]
    mongo_id: Option<RecordId>,
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    is_completed: bool,
}

impl ItemRecord {
    fn into_domain(self) -> ApiResult<Item> {
        Ok(Item {
            id: ItemId(record_id(self.mongo_id, self.id, "item")?),
            username: self.username,
            title: self.title,
            artist: self.artist.filter(|a| !a.trim().is_empty()),
            video_url: self.video_url.filter(|u| !u.trim().is_empty()),
            is_completed: self.is_completed,
        })
    }
}

/// `GET /sessions/{sid}/items` returns either a bare array or `{items: [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ItemList {
    Bare(Vec<ItemRecord>),
    Wrapped { items: Vec<ItemRecord> },
}

/// Accepts RFC 3339 or a naive ISO timestamp, which is read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

// Request payloads.

#[derive(Serialize)]
struct CreateSessionBody<'a> {
    title: &'a str,
    admin_password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_code: Option<&'a str>,
}

#[derive(Serialize)]
struct RenameSessionBody<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct CreateItemBody<'a> {
    username: &'a str,
    title: &'a str,
    artist: &'a str,
}

#[derive(Serialize)]
struct UpdateItemBody<'a> {
    username: &'a str,
    video_url: Option<&'a str>,
    title: &'a str,
}

//=========================================================================================
// `SessionApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn get_session_by_code(&self, code: &str) -> ApiResult<Option<Session>> {
        let data = self.get(&format!("/sessions/by-code/{}", code)).await?;
        match data {
            Some(data) => Ok(Some(decode::<SessionRecord>(data, "session")?.into_domain()?)),
            None => Ok(None),
        }
    }

    async fn create_session(&self, new_session: &NewSession) -> ApiResult<Session> {
        let body = CreateSessionBody {
            title: &new_session.title,
            admin_password: &new_session.admin_password,
            access_code: new_session.access_code.as_deref(),
        };
        let data = self.send(Method::POST, "/sessions", Some(&body)).await?;
        let record: SessionRecord = decode(require(data, "session")?, "session")?;
        record.into_domain()
    }

    async fn rename_session(&self, session_id: &SessionId, title: &str) -> ApiResult<()> {
        let body = RenameSessionBody { title };
        self.send(Method::PUT, &format!("/sessions/{}", session_id), Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_session(&self, session_id: &SessionId) -> ApiResult<()> {
        self.send::<()>(Method::DELETE, &format!("/sessions/{}", session_id), None)
            .await?;
        Ok(())
    }

    async fn list_items(&self, session_id: &SessionId) -> ApiResult<Vec<Item>> {
        let data = self.get(&format!("/sessions/{}/items", session_id)).await?;
        let records = match data {
            Some(data) => match decode::<ItemList>(data, "item list")? {
                ItemList::Bare(items) | ItemList::Wrapped { items } => items,
            },
            None => Vec::new(),
        };
        records.into_iter().map(ItemRecord::into_domain).collect()
    }

    async fn get_item(&self, session_id: &SessionId, item_id: &ItemId) -> ApiResult<Item> {
        let data = self
            .get(&format!("/sessions/{}/items/{}", session_id, item_id))
            .await?;
        let record: ItemRecord = decode(require(data, "item")?, "item")?;
        record.into_domain()
    }

    async fn create_item(&self, session_id: &SessionId, new_item: &NewItem) -> ApiResult<()> {
        let body = CreateItemBody {
            username: &new_item.username,
            title: &new_item.title,
            artist: new_item.artist.as_deref().unwrap_or(""),
        };
        self.send(Method::POST, &format!("/sessions/{}/items", session_id), Some(&body))
            .await?;
        Ok(())
    }

    async fn update_item(
        &self,
        session_id: &SessionId,
        item_id: &ItemId,
        update: &ItemUpdate,
    ) -> ApiResult<()> {
        let body = UpdateItemBody {
            username: &update.username,
            video_url: update.video_url.as_deref(),
            title: &update.title,
        };
        self.send(
            Method::PUT,
            &format!("/sessions/{}/items/{}", session_id, item_id),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete_item(&self, session_id: &SessionId, item_id: &ItemId) -> ApiResult<()> {
        self.send::<()>(
            Method::DELETE,
            &format!("/sessions/{}/items/{}", session_id, item_id),
            None,
        )
        .await?;
        Ok(())
    }

    async fn toggle_item(&self, session_id: &SessionId, item_id: &ItemId) -> ApiResult<()> {
        self.send::<()>(
            Method::PATCH,
            &format!("/sessions/{}/items/{}/toggle", session_id, item_id),
            None,
        )
        .await?;
        Ok(())
    }
}
