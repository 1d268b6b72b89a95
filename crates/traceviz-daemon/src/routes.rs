//! HTTP and WebSocket surface.
//!
//! | Method | Path      | Purpose                                    |
//! |--------|-----------|--------------------------------------------|
//! | POST   | `/event`  | submit one hook payload                    |
//! | GET    | `/events` | full ordered history                       |
//! | GET    | `/stats`  | current session statistics                 |
//! | GET    | `/health` | liveness                                   |
//! | GET    | `/`       | WebSocket upgrade: snapshot then live feed |

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;
use traceviz_protocol::{SessionStats, TraceEvent};

use crate::coordinator::{Coordinator, Subscription};

#[derive(Clone)]
struct AppState {
    coordinator: Coordinator,
    web_dist: Option<Arc<PathBuf>>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(coordinator: Coordinator, web_dist: Option<PathBuf>) -> Router {
    let state = AppState {
        coordinator,
        web_dist: web_dist.clone().map(Arc::new),
    };

    let app = Router::new()
        .route("/", get(subscribe))
        // Tool output is embedded in the payload and has no size bound.
        .route("/event", post(submit_event).layer(DefaultBodyLimit::disable()))
        .route("/events", get(list_events))
        .route("/stats", get(session_stats))
        .route("/health", get(health));

    let app = match web_dist {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.fallback(not_found),
    };

    app.with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

async fn submit_event(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    let payload: Value = serde_json::from_slice(&body).map_err(|error| {
        debug!(%error, bytes = body.len(), "rejecting malformed submission body");
        ApiError::bad_request("invalid json")
    })?;
    state.coordinator.submit(&payload);
    Ok("ok")
}

async fn list_events(State(state): State<AppState>) -> Json<Vec<TraceEvent>> {
    Json(state.coordinator.events())
}

async fn session_stats(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.coordinator.stats())
}

async fn subscribe(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => {
            let coordinator = state.coordinator.clone();
            ws.on_upgrade(move |socket| serve_subscriber(coordinator, socket))
        }
        Err(_) => match &state.web_dist {
            Some(dir) => match tokio::fs::read_to_string(dir.join("index.html")).await {
                Ok(index) => Html(index).into_response(),
                Err(_) => not_found().await.into_response(),
            },
            None => not_found().await.into_response(),
        },
    }
}

async fn serve_subscriber(coordinator: Coordinator, socket: WebSocket) {
    let Subscription { id, mut feed } = coordinator.subscribe();
    let (mut sink, mut incoming) = socket.split();

    loop {
        tokio::select! {
            message = feed.recv() => {
                let Some(text) = message else {
                    break;
                };
                if sink.send(Message::Text(text.as_ref().into())).await.is_err() {
                    break;
                }
            }
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sink.close().await;
    coordinator.unsubscribe(id);
}
