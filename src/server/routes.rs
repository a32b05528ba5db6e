//! API endpoints
//!
//! - GET  /health
//! - GET  /api/status
//! - GET  /api/agents
//! - POST /api/agents/reload
//! - POST /api/chat
//! - POST /api/chat/stream (SSE)
//! - POST /api/chat/cancel
//! - GET/DELETE /api/history

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use lidco_core::{
    AgentInfo, AgentResponse, ChatRequest, ConversationTurn, RunFailure, Session, SessionStatus,
    ToolCallRecord,
};
use lidco_llm::TokenUsage;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::warn;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// The project session
    pub session: Arc<Session>,
}

/// Envelope for JSON responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Body of a successful `POST /api/chat`
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub agent: String,
    pub model_used: Option<String>,
    pub iterations: u32,
    pub tool_calls: Vec<ToolCallRecord>,
    pub usage: TokenUsage,
    pub elapsed_ms: u64,
    pub incomplete: bool,
    pub error: Option<RunFailure>,
}

impl From<AgentResponse> for ChatResponse {
    fn from(response: AgentResponse) -> Self {
        Self {
            content: response.content,
            agent: response.agent_name,
            model_used: response.model_used,
            iterations: response.iterations,
            tool_calls: response.tool_calls,
            usage: response.usage,
            elapsed_ms: response.elapsed_ms,
            incomplete: response.incomplete,
            error: response.error,
        }
    }
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(message)))
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub generation: u64,
    pub agents: usize,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: usize,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn status(State(state): State<AppState>) -> Json<ApiResponse<SessionStatus>> {
    Json(ApiResponse::success(state.session.status()))
}

async fn list_agents(State(state): State<AppState>) -> Json<ApiResponse<Vec<AgentInfo>>> {
    Json(ApiResponse::success(state.session.agents()))
}

async fn reload_agents(State(state): State<AppState>) -> Json<ApiResponse<ReloadResponse>> {
    let generation = state.session.reload_agents();
    Json(ApiResponse::success(ReloadResponse {
        generation,
        agents: state.session.agents().len(),
    }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }
    match state.session.handle_chat(request).await {
        Ok(response) => Ok(Json(response.into())),
        Err(e) if e.is_configuration() => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            warn!(error = %e, "Chat failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Stream one turn as server-sent events. Dropping the connection cancels
/// the turn.
async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let chat = state.session.handle_chat_stream(request);
    let guard = chat.cancel.clone().drop_guard();

    let events = stream::unfold((chat.events, guard), |(mut events, guard)| async move {
        let event = events.recv().await?;
        let sse = Event::default()
            .event(event.name())
            .data(event.data().to_string());
        Some((Ok(sse), (events, guard)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn cancel(State(state): State<AppState>) -> Json<ApiResponse<CancelResponse>> {
    let cancelled = state.session.cancel();
    Json(ApiResponse::success(CancelResponse { cancelled }))
}

async fn history(State(state): State<AppState>) -> Json<ApiResponse<Vec<ConversationTurn>>> {
    Json(ApiResponse::success(state.session.history()))
}

async fn clear_history(State(state): State<AppState>) -> Json<ApiResponse<bool>> {
    state.session.clear_history();
    Json(ApiResponse::success(true))
}

/// Create the API router
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/reload", post(reload_agents))
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .route("/api/chat/cancel", post(cancel))
        .route("/api/history", get(history).delete(clear_history))
        .with_state(state)
}
