#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use voyage_gateway::{
    AppConfig, AppState, SessionState, create_router,
    session::{Role, SessionUser},
};

/// One request as the fake backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct Recorder {
    hits: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Recorder {
    pub fn all(&self) -> Vec<RecordedRequest> {
        self.hits.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.all().iter().filter(|r| r.path == path).count()
    }

    pub fn last(&self) -> RecordedRequest {
        self.all().last().cloned().expect("backend was never called")
    }
}

fn header_string(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Fake marketplace backend. Unknown paths echo the request back.
async fn backend(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_string(&headers, header::AUTHORIZATION),
        request_id: header_string(&headers, "x-request-id"),
        content_type: header_string(&headers, header::CONTENT_TYPE),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    recorder.hits.lock().unwrap().push(recorded.clone());
    let seen = recorder.count(uri.path());

    match (method, uri.path()) {
        (_, "/auth/me") => match recorded.authorization.as_deref() {
            Some("Bearer finance-token") => Json(json!({
                "success": true,
                "data": { "user": { "id": 2, "email": "fin@voyage.test", "role": "finance" } }
            }))
            .into_response(),
            Some("Bearer traveller-token") => Json(json!({
                "success": true,
                "data": { "user": { "id": 3, "email": "ana@voyage.test", "role": "traveller" } }
            }))
            .into_response(),
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Invalid token" })),
            )
                .into_response(),
        },
        (_, "/stories/missing") => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Story not found" })),
        )
            .into_response(),
        (_, "/bookings/conflict") => (StatusCode::CONFLICT, "plain text failure").into_response(),
        (Method::DELETE, "/bookings/7") => StatusCode::NO_CONTENT.into_response(),
        (Method::GET, "/notifications/settings") => Json(json!({
            "success": true,
            "data": {
                "user_id": 3,
                "email_notifications": true,
                "push_notifications": false,
                "marketing_emails": false
            }
        }))
        .into_response(),
        (_, "/flaky") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "database unavailable" })),
        )
            .into_response(),
        (_, "/eventually") if seen < 2 => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        (_, "/eventually") => Json(json!({ "ok": true, "attempt": seen })).into_response(),
        (_, "/missing") => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no such thing" })),
        )
            .into_response(),
        (method, path) => Json(json!({
            "success": true,
            "echo": {
                "method": method.as_str(),
                "path": path,
                "query": recorded.query,
                "body": recorded.body,
            }
        }))
        .into_response(),
    }
}

/// Binds the fake backend on an ephemeral port; returns its base URL and recorder.
pub async fn spawn_backend() -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new().fallback(backend).with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), recorder)
}

/// A base URL nothing listens on.
pub async fn dead_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn gateway_state(api_url: &str, sessions: SessionState) -> AppState {
    let config = AppConfig {
        api_url: api_url.to_string(),
        ..AppConfig::default()
    };
    AppState::new(config, sessions).expect("client builds")
}

pub fn gateway(api_url: &str, sessions: SessionState) -> Router {
    create_router(gateway_state(api_url, sessions))
}

pub fn user(id: i64, role: Role) -> SessionUser {
    SessionUser {
        id,
        uuid: None,
        email: format!("user{id}@voyage.test"),
        role,
        first_name: None,
        last_name: None,
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
