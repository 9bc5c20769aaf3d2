//! Mock store server and fixtures shared by the sync integration tests.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use caja_db::{Database, DbConfig};
use caja_sync::{SyncConfig, SyncMode};

pub const TERMINAL_ID: &str = "caja-01";

/// How the mock server answers. Mutable while the server runs.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub ping_status: u16,
    /// Park ping requests until [`MockServer::release_ping`] is called.
    pub hold_ping: bool,
    pub total_changes: i64,
    pub cursor: Option<String>,
    pub malformed_pull: bool,
    pub push_accepted: bool,
    pub push_message: Option<String>,
}

impl Default for Behaviour {
    fn default() -> Self {
        Behaviour {
            ping_status: 200,
            hold_ping: false,
            total_changes: 0,
            cursor: None,
            malformed_pull: false,
            push_accepted: true,
            push_message: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockState {
    pub pings: Arc<AtomicUsize>,
    pub pulls: Arc<AtomicUsize>,
    pub pushes: Arc<AtomicUsize>,
    pub last_pull: Arc<Mutex<Option<Value>>>,
    pub last_push: Arc<Mutex<Option<Value>>>,
    pub last_auth: Arc<Mutex<Option<String>>>,
    pub behaviour: Arc<Mutex<Behaviour>>,
    pub ping_gate: Arc<Notify>,
}

pub struct MockServer {
    pub port: u16,
    pub state: MockState,
}

impl MockServer {
    pub async fn spawn() -> Self {
        let state = MockState::default();

        let app = Router::new()
            .route("/api/sync/ping", get(ping))
            .route("/api/sync/cambios", post(pull))
            .route("/api/sync/recibir-cambios", post(push))
            .route("/api/sync/estadisticas", get(statistics))
            .route("/api/sync/health", get(health))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockServer { port, state }
    }

    pub fn set(&self, apply: impl FnOnce(&mut Behaviour)) {
        apply(&mut self.state.behaviour.lock().unwrap());
    }

    pub fn release_ping(&self) {
        self.state.ping_gate.notify_one();
    }

    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    pub fn pulls(&self) -> usize {
        self.state.pulls.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> usize {
        self.state.pushes.load(Ordering::SeqCst)
    }

    pub fn last_pull(&self) -> Option<Value> {
        self.state.last_pull.lock().unwrap().clone()
    }

    pub fn last_push(&self) -> Option<Value> {
        self.state.last_push.lock().unwrap().clone()
    }

    pub fn last_auth(&self) -> Option<String> {
        self.state.last_auth.lock().unwrap().clone()
    }

    /// Manual-mode config pointing at this server.
    pub fn config(&self) -> SyncConfig {
        let mut config = SyncConfig::default();
        config.terminal.id = TERMINAL_ID.to_string();
        config.server.ip = "127.0.0.1".to_string();
        config.server.port = self.port;
        config.sync.mode = SyncMode::Manual;
        config.sync.request_timeout_secs = 5;
        config.sync.requested_types = vec!["productos".to_string(), "precios".to_string()];
        config
    }
}

fn record_auth(state: &MockState, headers: &HeaderMap) {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *state.last_auth.lock().unwrap() = auth;
}

async fn ping(State(state): State<MockState>, headers: HeaderMap) -> StatusCode {
    state.pings.fetch_add(1, Ordering::SeqCst);
    record_auth(&state, &headers);

    let behaviour = state.behaviour.lock().unwrap().clone();
    if behaviour.hold_ping {
        state.ping_gate.notified().await;
    }

    StatusCode::from_u16(behaviour.ping_status).unwrap_or(StatusCode::OK)
}

async fn pull(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.pulls.fetch_add(1, Ordering::SeqCst);
    record_auth(&state, &headers);
    *state.last_pull.lock().unwrap() = Some(body);

    let behaviour = state.behaviour.lock().unwrap().clone();
    if behaviour.malformed_pull {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }

    let mut response = json!({
        "totalCambios": behaviour.total_changes,
        "productos": [],
        "precios": []
    });
    if let Some(cursor) = behaviour.cursor {
        response["cursor"] = Value::String(cursor);
    }
    Json(response).into_response()
}

async fn push(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.pushes.fetch_add(1, Ordering::SeqCst);
    *state.last_push.lock().unwrap() = Some(body);

    let behaviour = state.behaviour.lock().unwrap().clone();
    let mut response = json!({ "exitosa": behaviour.push_accepted });
    if let Some(message) = behaviour.push_message {
        response["mensaje"] = Value::String(message);
    }
    Json(response)
}

async fn statistics() -> Json<Value> {
    Json(json!({ "terminales": 3, "ventasHoy": 41 }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Polls `check` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
