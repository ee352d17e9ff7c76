use axum::{
    Json, Router,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::auth;
use super::protocol::{ChatRequest, ChatResponse, ClientFrame, ServerFrame};
use crate::config::LilyConfig;
use crate::sessions::SessionRegistry;

/// Stands in for speech-to-text output until a real integration lands.
const SIMULATED_TRANSCRIPT: &str = "I heard your voice! Real speech-to-text integration coming soon.";

pub struct AppState {
    pub token: Option<String>,
    pub registry: RwLock<SessionRegistry>,
}

pub async fn run(config: LilyConfig, token: Option<String>) -> anyhow::Result<()> {
    let is_loopback = config.gateway.bind == "127.0.0.1" || config.gateway.bind == "::1";

    if !is_loopback && token.is_none() {
        anyhow::bail!(
            "Auth token required when binding to non-loopback address. \
             Set --token or LILYROSE_TOKEN env var."
        );
    }

    let addr = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let sweep_interval = Duration::from_secs(config.sessions.sweep_interval_secs);

    let state = Arc::new(AppState {
        token,
        registry: RwLock::new(SessionRegistry::new(config)),
    });

    // Idle-session sweeper; without it the registry grows for the life of
    // the process.
    let sweeper = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // first tick fires immediately, skip it
        loop {
            ticker.tick().await;
            let removed = sweeper.registry.write().await.sweep_expired().await;
            if removed > 0 {
                info!(removed, "swept idle sessions");
            }
        }
    });

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/chat/{session_id}", post(chat_handler))
        .route("/api/history/{session_id}", get(history_handler))
        .route("/ws/voice/{session_id}", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("lilyrose gateway listening on {addr}");
    if is_loopback {
        info!("bound to loopback — local access only");
    } else {
        warn!("bound to {addr} — ensure auth token is set");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

/// Resolve a session with a read-lock fast path. Only a miss takes the
/// registry write lock, so creating one session (which may load remote
/// memory) does not stall turns on existing sessions.
async fn lookup_session(
    state: &AppState,
    session_id: &str,
) -> anyhow::Result<Arc<crate::sessions::SessionHandle>> {
    if let Some(session) = state.registry.read().await.get(session_id) {
        session.touch().await;
        return Ok(session);
    }
    let mut registry = state.registry.write().await;
    registry.get_or_create(session_id).await
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Lily Rose AI Assistant API",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
    }))
}

async fn chat_handler(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> impl IntoResponse {
    if body.text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "No text provided"})),
        )
            .into_response();
    }

    let session = match lookup_session(&state, &session_id).await {
        Ok(s) => s,
        Err(e) => {
            warn!(session = %session_id, "session setup failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": format!("session error: {e}")})),
            )
                .into_response();
        }
    };

    // The brain mutex serializes turns within the session.
    let ai_response = {
        let mut brain = session.brain.lock().await;
        brain.chat(&body.text).await
    };

    Json(ChatResponse {
        session_id,
        user_input: body.text,
        ai_response,
        timestamp: chrono::Utc::now(),
    })
    .into_response()
}

async fn history_handler(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match lookup_session(&state, &session_id).await {
        Ok(session) => {
            let brain = session.brain.lock().await;
            let history = brain.memory.get_conversation_history().to_vec();
            Json(json!({ "history": history })).into_response()
        }
        Err(e) => {
            warn!(session = %session_id, "session setup failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": format!("session error: {e}")})),
            )
                .into_response()
        }
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_voice(socket, session_id, state))
}

async fn handle_voice(mut socket: WebSocket, session_id: String, state: Arc<AppState>) {
    if state.token.is_some() {
        // First message must be auth when token auth is enabled.
        let authed = match socket.recv().await {
            Some(Ok(Message::Text(msg))) => auth::verify_connect(&msg, &state.token),
            _ => false,
        };

        if !authed {
            let _ = socket
                .send(Message::Text(
                    r#"{"error":"auth_failed","code":4001}"#.into(),
                ))
                .await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }

    let session = match lookup_session(&state, &session_id).await {
        Ok(s) => s,
        Err(e) => {
            let frame = ServerFrame::Error {
                message: format!("session error: {e}"),
            };
            let _ = socket.send(Message::Text(frame.to_json().into())).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    info!(session = %session_id, "voice client connected");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let frame = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        let reply = ServerFrame::Error {
                            message: format!("malformed frame: {e}"),
                        };
                        if socket
                            .send(Message::Text(reply.to_json().into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                        continue;
                    }
                };

                let reply = match frame {
                    ClientFrame::StartListening => ServerFrame::listening(),
                    ClientFrame::AudioData { .. } => {
                        session.touch().await;
                        let mut brain = session.brain.lock().await;
                        let response = brain.chat(SIMULATED_TRANSCRIPT).await;
                        ServerFrame::completed(response)
                    }
                };

                if socket
                    .send(Message::Text(reply.to_json().into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(session = %session_id, "voice client disconnected");
}
