//! Exercises `HttpSessionApi` and a full `SessionView` against a stub
//! backend served by axum on a random local port.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use client_lib::adapters::{FileCapabilityStore, HttpSessionApi};
use karaoke_queue_core::{
    ApiError, Capabilities, EntryError, FailureKind, ItemId, NewSession, SessionApi, SessionId,
    SessionView,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorded {
    toggles: Arc<Mutex<Vec<String>>>,
    added: Arc<Mutex<Vec<Value>>>,
}

fn session_json() -> Value {
    json!({
        "_id": "s1",
        "access_code": "123456",
        "title": "Friday Night",
        "admin_password": "abcd",
        "created_at": "2024-05-01T20:00:00",
        "expires_at": "2024-05-02T20:00:00Z",
        "items": [
            {"_id": "i1", "username": "ana", "title": "Africa", "artist": "", "video_url": null, "is_completed": true},
            {"id": 2, "username": "bo", "title": "Dancing Queen", "artist": "ABBA", "is_completed": false}
        ]
    })
}

async fn by_code(Path(code): Path<String>) -> Response {
    match code.as_str() {
        "123456" => Json(json!({"success": true, "data": session_json()})).into_response(),
        "404404" => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Session not found"})),
        )
            .into_response(),
        "500500" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "111111" => Json(json!({"success": false, "error": "Database unavailable"})).into_response(),
        "222222" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        _ => Json(json!({"success": true, "data": null})).into_response(),
    }
}

async fn create_session(Json(body): Json<Value>) -> Response {
    if body["access_code"] == "123456" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Session with access code 123456 already exists"})),
        )
            .into_response();
    }
    let code = body["access_code"].as_str().unwrap_or("777777");
    Json(json!({
        "success": true,
        "data": {"id": 9, "access_code": code, "title": body["title"], "admin_password": body["admin_password"]}
    }))
    .into_response()
}

async fn list_items(Path(_session): Path<String>) -> Json<Value> {
    Json(json!({"success": true, "data": {"items": session_json()["items"]}}))
}

async fn add_item(
    State(recorded): State<Recorded>,
    Path(_session): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.added.lock().unwrap().push(body);
    Json(json!({"success": true, "data": null}))
}

async fn toggle(
    State(recorded): State<Recorded>,
    Path((session, item)): Path<(String, String)>,
) -> Json<Value> {
    recorded
        .toggles
        .lock()
        .unwrap()
        .push(format!("{}/{}", session, item));
    Json(json!({"success": true}))
}

async fn spawn_stub() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/by-code/{code}", get(by_code))
        .route("/api/sessions/{session}/items", get(list_items).post(add_item))
        .route("/api/sessions/{session}/items/{item}/toggle", patch(toggle))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api/", addr), recorded)
}

fn client(base_url: &str) -> HttpSessionApi {
    HttpSessionApi::new(base_url, Duration::from_secs(5)).unwrap()
}

async fn fetch_err(api: &HttpSessionApi, code: &str) -> ApiError {
    api.get_session_by_code(code).await.unwrap_err()
}

#[tokio::test]
async fn session_by_code_decodes_mixed_records() {
    let (base, _) = spawn_stub().await;
    let session = client(&base)
        .get_session_by_code("123456")
        .await
        .unwrap()
        .expect("session should be present");

    assert_eq!(session.id, SessionId("s1".to_string()));
    assert_eq!(session.title, "Friday Night");
    assert!(session.created_at.is_some());
    assert!(session.expires_at.is_some());
    assert_eq!(session.items.len(), 2);
    assert_eq!(session.items[0].artist, None);
    assert!(session.items[0].is_completed);
    assert_eq!(session.items[1].id, ItemId::from("2"));
    assert_eq!(session.items[1].artist.as_deref(), Some("ABBA"));
}

#[tokio::test]
async fn null_data_means_no_session() {
    let (base, _) = spawn_stub().await;
    assert!(client(&base).get_session_by_code("000000").await.unwrap().is_none());
}

#[tokio::test]
async fn failures_are_classified_by_layer() {
    let (base, _) = spawn_stub().await;
    let api = client(&base);

    let not_found = fetch_err(&api, "404404").await;
    assert_eq!(not_found.kind, FailureKind::Http);
    assert_eq!(not_found.status, Some(404));
    assert_eq!(not_found.message, "Session not found");

    let server = fetch_err(&api, "500500").await;
    assert_eq!(server.kind, FailureKind::Http);
    assert_eq!(server.message, "Internal Server Error");
    assert_eq!(server.server_message, None);

    let application = fetch_err(&api, "111111").await;
    assert_eq!(application.kind, FailureKind::Application);
    assert_eq!(application.message, "Database unavailable");

    let garbled = fetch_err(&api, "222222").await;
    assert_eq!(garbled.kind, FailureKind::Transport);
    assert_eq!(garbled.status, Some(200));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fetch_err(&client(&format!("http://{}/api", addr)), "123456").await;
    assert_eq!(err.kind, FailureKind::Transport);
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn toggle_uses_patch_on_the_item_path() {
    let (base, recorded) = spawn_stub().await;
    client(&base)
        .toggle_item(&SessionId("s1".to_string()), &ItemId::from("i1"))
        .await
        .unwrap();
    assert_eq!(*recorded.toggles.lock().unwrap(), vec!["s1/i1".to_string()]);
}

#[tokio::test]
async fn list_items_accepts_wrapped_form() {
    let (base, _) = spawn_stub().await;
    let items = client(&base)
        .list_items(&SessionId("s1".to_string()))
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn create_session_reports_taken_code() {
    let (base, _) = spawn_stub().await;
    let api = client(&base);

    let err = api
        .create_session(&NewSession {
            title: "Friday".to_string(),
            admin_password: "pw".to_string(),
            access_code: Some("123456".to_string()),
        })
        .await
        .unwrap_err();
    assert!(err.is_duplicate());

    let code = karaoke_queue_core::AccessCode::parse("123456").unwrap();
    let entry = karaoke_queue_core::entry::create_session(&api, "Friday", "pw", Some(&code)).await;
    assert!(matches!(entry, Err(EntryError::CodeTaken(c)) if c == "123456"));

    let created = karaoke_queue_core::entry::create_session(&api, "Friday", "pw", None)
        .await
        .unwrap();
    assert_eq!(created.access_code, "777777");
    assert_eq!(created.id, SessionId("9".to_string()));
}

#[tokio::test]
async fn session_view_end_to_end() {
    let (base, recorded) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let capabilities =
        Capabilities::new(Arc::new(FileCapabilityStore::new(dir.path().join("state.json"))));
    capabilities.set_display_name("Cleo").unwrap();
    let api: Arc<dyn SessionApi> = Arc::new(client(&base));

    let mut view = SessionView::enter_once("123456", api.clone(), capabilities.clone()).await;
    assert!(view.critical_error().await.is_none());
    assert_eq!(view.queue().await.next_to_play, Some(ItemId::from("2")));

    view.add_song("Vogue", "Madonna").await.unwrap();
    let added = recorded.added.lock().unwrap().clone();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0]["username"], "Cleo");
    assert_eq!(added[0]["title"], "Vogue");

    view.open_admin_login();
    view.admin_login(" abcd ").await.unwrap();
    view.toggle_completion(&ItemId::from("2")).await.unwrap();
    assert_eq!(*recorded.toggles.lock().unwrap(), vec!["s1/2".to_string()]);
    view.leave();

    // The admin grant outlives the view.
    let reopened = SessionView::enter_once("123456", api, capabilities).await;
    assert!(reopened.is_admin());
}
