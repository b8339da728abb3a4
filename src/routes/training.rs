use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::db::queries::{count_documents, count_processed_documents, list_documents};
use crate::errors::{AppError, AppResult};
use crate::utils::config::AppState;

// Get training system status
pub async fn training_status_handler(
    State(app_state): State<AppState>,
) -> AppResult<Json<Value>> {
    let total_documents = count_documents(&app_state.db).await?;
    let processed_documents = count_processed_documents(&app_state.db).await?;

    Ok(Json(json!({
        "success": true,
        "total_documents": total_documents,
        "processed_documents": processed_documents,
        "pending_documents": total_documents - processed_documents,
        "status": "ready"
    })))
}

// List all training documents
pub async fn list_documents_handler(
    State(app_state): State<AppState>,
) -> AppResult<Json<Value>> {
    let documents = list_documents(&app_state.db).await?;

    let document_responses: Vec<Value> = documents
        .into_iter()
        .map(|doc| {
            json!({
                "id": doc.id,
                "title": doc.title,
                "file_type": doc.file_type,
                "category": doc.category,
                "processed": doc.processed,
                "chunk_count": doc.chunk_count,
                "uploaded_at": doc.uploaded_at.to_rfc3339()
            })
        })
        .collect();

    tracing::info!("✅ Retrieved {} training documents", document_responses.len());

    Ok(Json(json!({
        "success": true,
        "total": document_responses.len(),
        "documents": document_responses
    })))
}

// Upload a training document. The ingestion pipeline is deferred, so this
// always reports not-implemented rather than failing or pretending to succeed.
pub async fn upload_document_handler() -> AppResult<Json<Value>> {
    Err(AppError::NotImplemented(
        "Document upload is not implemented yet".to_string(),
    ))
}

// Create the router for training routes
pub fn create_training_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(training_status_handler))
        .route("/documents", get(list_documents_handler))
        .route("/upload", post(upload_document_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::{create_document, mark_document_processed};
    use crate::db::run_migrations;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
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

    #[tokio::test]
    async fn test_upload_is_a_distinct_not_implemented_signal() {
        let error = upload_document_handler().await.unwrap_err();
        assert!(matches!(error, AppError::NotImplemented(_)));
        assert_eq!(
            error.into_response().status(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[tokio::test]
    async fn test_status_pending_is_total_minus_processed() {
        let state = test_state().await;

        let doc = create_document(
            &state.db,
            "FAQ",
            "text",
            Some("txt"),
            None,
            None,
            Vec::new(),
        )
        .await
        .unwrap();
        create_document(&state.db, "Manual", "text", Some("pdf"), None, None, Vec::new())
            .await
            .unwrap();
        mark_document_processed(&state.db, doc.id, 4).await.unwrap();

        let Json(body) = training_status_handler(State(state)).await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["total_documents"], 2);
        assert_eq!(body["processed_documents"], 1);
        assert_eq!(body["pending_documents"], 1);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_documents_listing_shape() {
        let state = test_state().await;

        create_document(
            &state.db,
            "FAQ",
            "text",
            Some("txt"),
            None,
            Some("support"),
            vec!["faq".to_string()],
        )
        .await
        .unwrap();

        let Json(body) = list_documents_handler(State(state)).await.unwrap();
        assert_eq!(body["total"], 1);
        let doc = &body["documents"].as_array().unwrap()[0];
        assert_eq!(doc["title"], "FAQ");
        assert_eq!(doc["file_type"], "txt");
        assert_eq!(doc["category"], "support");
        assert_eq!(doc["processed"], false);
        assert_eq!(doc["chunk_count"], 0);
    }
}
