use crate::db::models::*;
use crate::errors::AppResult;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;

// Conversation queries

/// Look up a conversation by session id, creating it if absent.
///
/// A single upsert keeps find-or-create atomic: two concurrent calls with the
/// same fresh session id produce exactly one row. A resumed conversation keeps
/// its original user_id; only updated_at is bumped.
pub async fn find_or_create_conversation(
    pool: &SqlitePool,
    session_id: &str,
    user_id: Option<&str>,
) -> AppResult<Conversation> {
    let now = Utc::now();
    let conversation = sqlx::query_as::<_, Conversation>(
        "INSERT INTO conversations (session_id, user_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?3) \
         ON CONFLICT(session_id) DO UPDATE SET updated_at = excluded.updated_at \
         RETURNING *",
    )
    .bind(session_id)
    .bind(user_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(conversation)
}

pub async fn get_conversation_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> AppResult<Option<Conversation>> {
    let conversation = sqlx::query_as::<_, Conversation>(
        "SELECT * FROM conversations WHERE session_id = ?1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(conversation)
}

/// List all conversations with their message counts, most recently active first.
pub async fn list_session_summaries(pool: &SqlitePool) -> AppResult<Vec<SessionSummary>> {
    let summaries = sqlx::query_as::<_, SessionSummary>(
        "SELECT c.session_id, c.user_id, c.created_at, c.updated_at, COUNT(m.id) AS message_count \
         FROM conversations c \
         LEFT JOIN messages m ON m.conversation_id = c.id \
         GROUP BY c.id \
         ORDER BY c.updated_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(summaries)
}

pub async fn list_recent_sessions(
    pool: &SqlitePool,
    limit: i64,
) -> AppResult<Vec<SessionSummary>> {
    let summaries = sqlx::query_as::<_, SessionSummary>(
        "SELECT c.session_id, c.user_id, c.created_at, c.updated_at, COUNT(m.id) AS message_count \
         FROM conversations c \
         LEFT JOIN messages m ON m.conversation_id = c.id \
         GROUP BY c.id \
         ORDER BY c.updated_at DESC \
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(summaries)
}

// Message queries

/// Append a message and bump the parent conversation's updated_at in one transaction.
pub async fn create_message(
    pool: &SqlitePool,
    conversation_id: i64,
    role: Role,
    content: &str,
    source: Option<&str>,
) -> AppResult<Message> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO messages (conversation_id, role, content, timestamp, source) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         RETURNING *",
    )
    .bind(conversation_id)
    .bind(role)
    .bind(content)
    .bind(now)
    .bind(source)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(conversation_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(message)
}

/// Messages of a conversation in insertion order.
pub async fn list_messages_by_conversation(
    pool: &SqlitePool,
    conversation_id: i64,
) -> AppResult<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Overwrite the feedback fields of a message. Returns None if no such message.
pub async fn update_message_feedback(
    pool: &SqlitePool,
    message_id: i64,
    feedback: Feedback,
    comment: Option<&str>,
) -> AppResult<Option<Message>> {
    let message = sqlx::query_as::<_, Message>(
        "UPDATE messages SET feedback = ?1, feedback_comment = ?2 WHERE id = ?3 RETURNING *",
    )
    .bind(feedback)
    .bind(comment)
    .bind(message_id)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}

pub async fn list_feedback_messages(pool: &SqlitePool) -> AppResult<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE feedback IS NOT NULL ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

// Aggregate count queries

pub async fn count_conversations(pool: &SqlitePool) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_messages(pool: &SqlitePool) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Distinct non-null user ids across conversations.
pub async fn count_distinct_users(pool: &SqlitePool) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM conversations")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_messages_with_feedback(
    pool: &SqlitePool,
    feedback: Feedback,
) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE feedback = ?1")
        .bind(feedback)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// Training document queries

pub async fn create_document(
    pool: &SqlitePool,
    title: &str,
    content: &str,
    file_type: Option<&str>,
    file_path: Option<&str>,
    category: Option<&str>,
    tags: Vec<String>,
) -> AppResult<TrainingDocument> {
    let now = Utc::now();
    let document = sqlx::query_as::<_, TrainingDocument>(
        "INSERT INTO training_documents (title, content, file_type, file_path, uploaded_at, category, tags) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         RETURNING *",
    )
    .bind(title)
    .bind(content)
    .bind(file_type)
    .bind(file_path)
    .bind(now)
    .bind(category)
    .bind(Json(tags))
    .fetch_one(pool)
    .await?;

    Ok(document)
}

pub async fn list_documents(pool: &SqlitePool) -> AppResult<Vec<TrainingDocument>> {
    let documents = sqlx::query_as::<_, TrainingDocument>(
        "SELECT * FROM training_documents ORDER BY uploaded_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(documents)
}

/// Flip the processed flag once the ingestion pipeline has chunked a document.
pub async fn mark_document_processed(
    pool: &SqlitePool,
    document_id: i64,
    chunk_count: i64,
) -> AppResult<Option<TrainingDocument>> {
    let document = sqlx::query_as::<_, TrainingDocument>(
        "UPDATE training_documents SET processed = 1, chunk_count = ?1 WHERE id = ?2 RETURNING *",
    )
    .bind(chunk_count)
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(document)
}

pub async fn count_documents(pool: &SqlitePool) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM training_documents")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_processed_documents(pool: &SqlitePool) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM training_documents WHERE processed = 1")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// User preference queries

pub async fn get_user_preference(
    pool: &SqlitePool,
    user_id: &str,
) -> AppResult<Option<UserPreference>> {
    let preference = sqlx::query_as::<_, UserPreference>(
        "SELECT * FROM user_preferences WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(preference)
}

pub async fn upsert_user_preference(
    pool: &SqlitePool,
    user_id: &str,
    preferred_name: Option<&str>,
    language: &str,
    tone_preference: Option<&str>,
    interests: Vec<String>,
    conversation_summary: Option<&str>,
) -> AppResult<UserPreference> {
    let now = Utc::now();
    let preference = sqlx::query_as::<_, UserPreference>(
        "INSERT INTO user_preferences \
         (user_id, preferred_name, language, tone_preference, interests, conversation_summary, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
         ON CONFLICT(user_id) DO UPDATE SET \
             preferred_name = excluded.preferred_name, \
             language = excluded.language, \
             tone_preference = excluded.tone_preference, \
             interests = excluded.interests, \
             conversation_summary = excluded.conversation_summary, \
             updated_at = excluded.updated_at \
         RETURNING *",
    )
    .bind(user_id)
    .bind(preferred_name)
    .bind(language)
    .bind(tone_preference)
    .bind(Json(interests))
    .bind(conversation_summary)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(preference)
}
