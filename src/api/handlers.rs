//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ActionRequest, ErrorResponse};
use super::AppState;
use crate::commands::{Command, Invocation};
use crate::runtime::DispatchError;
use crate::view::Reply;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Slash commands
        .route("/api/commands/:name", post(run_command))
        // Button presses on session messages
        .route("/api/sessions/:id/actions", post(session_action))
        // Live session views
        .route("/api/sessions/:id/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Commands
// ============================================================

async fn run_command(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(invocation): Json<Invocation>,
) -> Result<Json<Reply>, AppError> {
    let command = Command::parse(&name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown command: {name}")))?;
    if invocation.actor_id.trim().is_empty() {
        return Err(AppError::BadRequest("actor_id is required".to_string()));
    }

    tracing::debug!(command = command.name(), user_id = %invocation.actor_id, "Command invoked");
    Ok(Json(state.commands.run(command, &invocation).await))
}

// ============================================================
// Sessions
// ============================================================

async fn session_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<Reply>, AppError> {
    match state
        .commands
        .sessions()
        .dispatch(&id, &req.actor_id, &req.action)
        .await
    {
        Ok(reply) => Ok(Json(reply)),
        Err(DispatchError::UnknownAction(action)) => {
            Err(AppError::BadRequest(format!("Unknown action: {action}")))
        }
        // Denials, rejections and closed sessions are answered privately
        Err(e) => Ok(Json(Reply::ephemeral(e.to_string()))),
    }
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rx = state
        .commands
        .sessions()
        .subscribe(&id)
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;
    Ok(sse_stream(rx))
}

async fn get_version() -> &'static str {
    concat!("forgelegion ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
