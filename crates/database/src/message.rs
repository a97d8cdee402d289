//! Message queries.
//!
//! Messages are only ever written by the conversation ledger; this module
//! reads them back for the admin API.

use sqlx::SqlitePool;

use crate::models::Message;
use crate::Result;

/// List the messages of a conversation in chronological order.
pub async fn list_messages(
    pool: &SqlitePool,
    project_id: &str,
    conversation_id: &str,
    limit: i64,
) -> Result<Vec<Message>> {
    let rows = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, conversation_id, project_id, whatsapp_message_id, from_phone, to_phone,
               message_type, content, media_url, timestamp, direction, status, created_at
        FROM messages
        WHERE project_id = ? AND conversation_id = ?
        ORDER BY timestamp ASC, created_at ASC
        LIMIT ?
        "#,
    )
    .bind(project_id)
    .bind(conversation_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Look up a message by its provider-assigned id.
pub async fn get_by_whatsapp_id(
    pool: &SqlitePool,
    project_id: &str,
    whatsapp_message_id: &str,
) -> Result<Option<Message>> {
    let record = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, conversation_id, project_id, whatsapp_message_id, from_phone, to_phone,
               message_type, content, media_url, timestamp, direction, status, created_at
        FROM messages
        WHERE project_id = ? AND whatsapp_message_id = ?
        "#,
    )
    .bind(project_id)
    .bind(whatsapp_message_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Count the messages stored for a project.
pub async fn count_messages(pool: &SqlitePool, project_id: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM messages
        WHERE project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
