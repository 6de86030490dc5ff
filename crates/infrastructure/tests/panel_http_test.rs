//! Panel adapter against an in-process fake panel.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use qrslot_application::{PanelError, PanelStore, SlotStore};
use qrslot_domain::{Credential, OwnerId, PanelConfig, SlotConfig};
use qrslot_infrastructure::HttpPanelClient;
use serde_json::{Value, json};

const CLIENT_ID: &str = "qrslot";
const CLIENT_SECRET: &str = "s3cr&t=?";
const TOKEN: &str = "fake-token";

#[derive(Default)]
struct PanelState {
    records: Vec<Value>,
    next_id: i64,
}

type Shared = Arc<Mutex<PanelState>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": 401, "message": "unauthorized"})),
    )
}

async fn token(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    if params.get("client_id").map(String::as_str) == Some(CLIENT_ID)
        && params.get("client_secret").map(String::as_str) == Some(CLIENT_SECRET)
    {
        Json(json!({"code": 200, "data": {"token": TOKEN, "token_type": "Bearer"}}))
    } else {
        Json(json!({"code": 400, "message": "client_id or client_secret mismatch"}))
    }
}

async fn list(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    let search = params.get("searchValue").cloned().unwrap_or_default();
    let items: Vec<Value> = state
        .lock()
        .unwrap()
        .records
        .iter()
        .filter(|r| r["name"].as_str().unwrap_or_default().contains(&search))
        // Older panels send names as byte arrays.
        .map(|r| {
            let mut r = r.clone();
            let name = r["name"].as_str().unwrap_or_default().as_bytes().to_vec();
            r["name"] = json!(name);
            r
        })
        .collect();
    let total = items.len();
    (
        StatusCode::OK,
        Json(json!({"code": 200, "data": {"items": items, "total": total}})),
    )
}

async fn create(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(records): Json<Vec<Value>>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    for mut record in records {
        state.next_id += 1;
        record["id"] = json!(state.next_id);
        state.records.push(record);
    }
    (StatusCode::OK, Json(json!({"code": 200, "data": []})))
}

async fn update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(record): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    match state.records.iter_mut().find(|r| r["id"] == record["id"]) {
        Some(existing) => {
            *existing = record;
            (StatusCode::OK, Json(json!({"code": 200, "data": existing.clone()})))
        }
        None => (
            StatusCode::OK,
            Json(json!({"code": 400, "message": "record not found"})),
        ),
    }
}

async fn delete(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(ids): Json<Vec<Value>>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    state
        .lock()
        .unwrap()
        .records
        .retain(|r| !ids.contains(&r["id"]));
    (StatusCode::OK, Json(json!({"code": 200})))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"code": 200, "data": {"token": TOKEN}}))
}

async fn spawn_panel() -> (SocketAddr, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/open/auth/token", get(token))
        .route("/open/envs", get(list).post(create).put(update).delete(delete))
        .route("/slow/open/auth/token", get(slow))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn config(base: String) -> PanelConfig {
    PanelConfig {
        url: base,
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        request_timeout_secs: 1,
    }
}

fn names(state: &Shared) -> Vec<(String, String)> {
    let mut names: Vec<(String, String)> = state
        .lock()
        .unwrap()
        .records
        .iter()
        .map(|r| {
            (
                r["name"].as_str().unwrap().to_string(),
                r["remarks"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_token_and_record_crud() {
    let (addr, state) = spawn_panel().await;
    let client = HttpPanelClient::new(&config(format!("http://{addr}/"))).unwrap();

    let token = client.acquire_token().await.unwrap();
    assert_eq!(token.as_str(), TOKEN);

    let store = SlotStore::new(client, &SlotConfig::default());
    for id in [11_u64, 22, 33] {
        let credential = Credential::from_pairs([("DedeUserID", id.to_string())]);
        store
            .upsert(&token, &OwnerId::from(id), &credential)
            .await
            .unwrap();
    }

    let outcome = store.remove(&token, &OwnerId::from(22)).await.unwrap();
    assert_eq!(outcome.remaining, Some(2));

    assert_eq!(
        names(&state),
        vec![
            ("Ray_BiliBiliCookies__0".to_string(), "owner-11".to_string()),
            ("Ray_BiliBiliCookies__1".to_string(), "owner-33".to_string()),
        ]
    );
    let slots = store.list_owned(&token).await.unwrap();
    assert_eq!(slots[1].record.value, "DedeUserID=33");
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let (addr, _) = spawn_panel().await;
    let mut config = config(format!("http://{addr}"));
    config.client_secret = "wrong".to_string();
    let client = HttpPanelClient::new(&config).unwrap();

    assert_eq!(
        client.acquire_token().await,
        Err(PanelError::Rejected(
            "client_id or client_secret mismatch".to_string()
        ))
    );
}

#[tokio::test]
async fn test_bad_token_is_rejected() {
    let (addr, _) = spawn_panel().await;
    let client = HttpPanelClient::new(&config(format!("http://{addr}"))).unwrap();

    let result = client
        .list_records(&qrslot_application::PanelToken::new("stale"), None)
        .await;

    assert!(matches!(result, Err(PanelError::Rejected(message)) if message.starts_with("HTTP 401")));
}

#[tokio::test]
async fn test_slow_panel_times_out() {
    let (addr, _) = spawn_panel().await;
    let client = HttpPanelClient::new(&config(format!("http://{addr}/slow"))).unwrap();

    assert_eq!(client.acquire_token().await, Err(PanelError::Timeout));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = HttpPanelClient::new(&config(format!("http://{addr}"))).unwrap();

    assert!(matches!(
        client.acquire_token().await,
        Err(PanelError::Unreachable(_))
    ));
}
