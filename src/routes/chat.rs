use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::db::models::{Feedback, Role};
use crate::db::queries::{
    create_message, find_or_create_conversation, get_conversation_by_session,
    list_messages_by_conversation, list_session_summaries, update_message_feedback,
};
use crate::errors::{AppError, AppResult};
use crate::utils::config::AppState;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: Option<i64>,
    pub feedback: Option<String>,
    pub comment: Option<String>,
}

// Save an incoming chat message, creating or resuming its session
pub async fn post_message_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<Json<Value>> {
    let content = payload.message.unwrap_or_default();
    if content.is_empty() {
        return Err(AppError::Validation("Message is required".to_string()));
    }

    let role = match payload.role.as_deref() {
        Some(role) => role.parse::<Role>().map_err(AppError::Validation)?,
        None => Role::User,
    };

    let source = payload.source.unwrap_or_else(|| {
        match role {
            Role::User => "user_input",
            Role::Assistant => "unknown",
        }
        .to_string()
    });

    let session_id = payload
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::info!("Saving {} message for session: {}", role, session_id);

    let conversation =
        find_or_create_conversation(&app_state.db, &session_id, payload.user_id.as_deref())
            .await?;
    let message =
        create_message(&app_state.db, conversation.id, role, &content, Some(&source)).await?;

    tracing::info!("✅ Message {} saved for session {}", message.id, session_id);

    Ok(Json(json!({
        "success": true,
        "session_id": session_id,
        "message_id": message.id,
        "message": "Message saved successfully",
        "timestamp": message.timestamp.to_rfc3339()
    })))
}

// Get conversation history for a session
pub async fn get_history_handler(
    State(app_state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<Value>> {
    tracing::info!("Getting history for session: {}", session_id);

    let conversation = get_conversation_by_session(&app_state.db, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let messages = list_messages_by_conversation(&app_state.db, conversation.id).await?;
    let message_responses: Vec<Value> = messages
        .into_iter()
        .map(|msg| {
            json!({
                "id": msg.id,
                "role": msg.role,
                "content": msg.content,
                "timestamp": msg.timestamp.to_rfc3339(),
                "source": msg.source,
                "feedback": msg.feedback
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "session_id": session_id,
        "messages": message_responses,
        "message_count": message_responses.len()
    })))
}

// Submit feedback for a message
pub async fn submit_feedback_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<FeedbackRequest>,
) -> AppResult<Json<Value>> {
    let (message_id, feedback) = match (payload.message_id, payload.feedback) {
        (Some(message_id), Some(feedback)) => (message_id, feedback),
        _ => {
            return Err(AppError::Validation(
                "message_id and feedback are required".to_string(),
            ));
        }
    };

    let feedback = feedback.parse::<Feedback>().map_err(AppError::Validation)?;

    tracing::info!("Recording {} feedback for message: {}", feedback, message_id);

    update_message_feedback(&app_state.db, message_id, feedback, payload.comment.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Feedback recorded successfully"
    })))
}

// List all conversation sessions, most recently active first
pub async fn list_sessions_handler(
    State(app_state): State<AppState>,
) -> AppResult<Json<Value>> {
    let sessions = list_session_summaries(&app_state.db).await?;

    tracing::info!("✅ Retrieved {} sessions", sessions.len());

    Ok(Json(json!({
        "success": true,
        "total": sessions.len(),
        "sessions": sessions
    })))
}

// Create the router for chat routes
pub fn create_chat_router() -> Router<AppState> {
    Router::new()
        .route("/message", post(post_message_handler))
        .route("/history/{session_id}", get(get_history_handler))
        .route("/feedback", post(submit_feedback_handler))
        .route("/sessions", get(list_sessions_handler))
}
