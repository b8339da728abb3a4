use axum::{Router, extract::State, response::Json, routing::get};
use serde_json::{Value, json};

use crate::db::models::Feedback;
use crate::db::queries::{
    count_conversations, count_distinct_users, count_documents, count_messages,
    count_messages_with_feedback, list_feedback_messages, list_recent_sessions,
};
use crate::errors::AppResult;
use crate::utils::config::AppState;

const PREVIEW_LENGTH: usize = 100;
const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// Truncate message content for feedback listings. Character based, so
/// multi-byte content never gets split mid-codepoint.
fn message_preview(content: &str) -> String {
    let mut chars = content.chars();
    let preview: String = chars.by_ref().take(PREVIEW_LENGTH).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

// Get overall system statistics
pub async fn get_stats_handler(State(app_state): State<AppState>) -> AppResult<Json<Value>> {
    tracing::info!("Computing system statistics");

    let total_conversations = count_conversations(&app_state.db).await?;
    let total_messages = count_messages(&app_state.db).await?;
    let total_users = count_distinct_users(&app_state.db).await?;
    let total_documents = count_documents(&app_state.db).await?;

    let positive_feedback =
        count_messages_with_feedback(&app_state.db, Feedback::Positive).await?;
    let negative_feedback =
        count_messages_with_feedback(&app_state.db, Feedback::Negative).await?;

    let recent_sessions = list_recent_sessions(&app_state.db, RECENT_ACTIVITY_LIMIT).await?;
    let recent_activity: Vec<Value> = recent_sessions
        .into_iter()
        .map(|session| {
            json!({
                "session_id": session.session_id,
                "updated_at": session.updated_at.to_rfc3339(),
                "message_count": session.message_count
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "statistics": {
            "conversations": total_conversations,
            "messages": total_messages,
            "users": total_users,
            "training_documents": total_documents,
            "feedback": {
                "positive": positive_feedback,
                "negative": negative_feedback,
                "total": positive_feedback + negative_feedback
            }
        },
        "recent_activity": recent_activity
    })))
}

// Get detailed feedback summary
pub async fn feedback_summary_handler(
    State(app_state): State<AppState>,
) -> AppResult<Json<Value>> {
    let messages = list_feedback_messages(&app_state.db).await?;

    let feedback_entries: Vec<Value> = messages
        .into_iter()
        .map(|msg| {
            json!({
                "id": msg.id,
                "feedback": msg.feedback,
                "comment": msg.feedback_comment,
                "message_preview": message_preview(&msg.content),
                "timestamp": msg.timestamp.to_rfc3339(),
                "source": msg.source
            })
        })
        .collect();

    tracing::info!("✅ Retrieved {} feedback entries", feedback_entries.len());

    Ok(Json(json!({
        "success": true,
        "total": feedback_entries.len(),
        "feedback_entries": feedback_entries
    })))
}

// Create the router for admin routes
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats_handler))
        .route("/feedback/summary", get(feedback_summary_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::db::queries::{
        create_message, find_or_create_conversation, update_message_feedback,
    };
    use crate::db::run_migrations;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        AppState { db: Arc::new(pool) }
    }

    #[test]
    fn test_message_preview_at_the_boundary() {
        let exactly_100 = "a".repeat(100);
        assert_eq!(message_preview(&exactly_100), exactly_100);

        let just_over = "a".repeat(101);
        let preview = message_preview(&just_over);
        assert_eq!(preview.len(), 103);
        assert!(preview.ends_with("..."));
        assert_eq!(&preview[..100], &just_over[..100]);

        assert_eq!(message_preview("short"), "short");
        assert_eq!(message_preview(""), "");
    }

    #[test]
    fn test_message_preview_counts_characters_not_bytes() {
        let content = "é".repeat(101);
        let preview = message_preview(&content);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let state = test_state().await;

        let Json(body) = get_stats_handler(State(state)).await.unwrap();
        assert_eq!(body["success"], true);
        let stats = &body["statistics"];
        assert_eq!(stats["conversations"], 0);
        assert_eq!(stats["messages"], 0);
        assert_eq!(stats["users"], 0);
        assert_eq!(stats["training_documents"], 0);
        assert_eq!(stats["feedback"]["positive"], 0);
        assert_eq!(stats["feedback"]["negative"], 0);
        assert_eq!(stats["feedback"]["total"], 0);
        assert!(body["recent_activity"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_and_feedback_summary_after_activity() {
        let state = test_state().await;

        let conversation = find_or_create_conversation(&state.db, "s1", Some("alice"))
            .await
            .unwrap();
        let first = create_message(&state.db, conversation.id, Role::User, "hi", Some("user_input"))
            .await
            .unwrap();
        let second = create_message(
            &state.db,
            conversation.id,
            Role::Assistant,
            "hello",
            Some("unknown"),
        )
        .await
        .unwrap();
        create_message(&state.db, conversation.id, Role::User, "thanks", Some("user_input"))
            .await
            .unwrap();

        update_message_feedback(&state.db, first.id, Feedback::Positive, Some("nice"))
            .await
            .unwrap();
        update_message_feedback(&state.db, second.id, Feedback::Negative, None)
            .await
            .unwrap();

        let Json(stats_body) = get_stats_handler(State(state.clone())).await.unwrap();
        let stats = &stats_body["statistics"];
        assert_eq!(stats["conversations"], 1);
        assert_eq!(stats["messages"], 3);
        assert_eq!(stats["users"], 1);
        assert_eq!(stats["feedback"]["positive"], 1);
        assert_eq!(stats["feedback"]["negative"], 1);
        assert_eq!(stats["feedback"]["total"], 2);

        let recent = stats_body["recent_activity"].as_array().unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0]["session_id"], "s1");
        assert_eq!(recent[0]["message_count"], 3);

        let Json(summary) = feedback_summary_handler(State(state)).await.unwrap();
        assert_eq!(summary["total"], 2);
        let entries = summary["feedback_entries"].as_array().unwrap();
        assert_eq!(entries[0]["feedback"], "positive");
        assert_eq!(entries[0]["comment"], "nice");
        assert_eq!(entries[0]["message_preview"], "hi");
        assert_eq!(entries[1]["feedback"], "negative");
        assert_eq!(entries[1]["comment"], Value::Null);
    }
}
