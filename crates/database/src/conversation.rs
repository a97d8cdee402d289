//! Conversation ledger.
//!
//! Every inbound message goes through [`record_inbound_message`], which owns
//! the create-or-update of the conversation row and the append of the
//! message row. Both happen in one transaction that starts with a write, so
//! concurrent deliveries for the same customer serialize on SQLite's write
//! lock instead of racing on a read-modify-write.

use base64::Engine;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{Conversation, LedgerOutcome, MessageDirection, MessageStatus, NewMessage};

/// Fold one inbound message into the ledger.
///
/// Creates the conversation for `(project_id, from_phone)` with an unread
/// count of 1, or bumps the existing one by exactly 1 and refreshes its last
/// message. The message is appended under a fresh id. If the provider message
/// id is already stored for the project the whole unit is rolled back and
/// [`LedgerOutcome::Duplicate`] is returned.
pub async fn record_inbound_message(
    pool: &SqlitePool,
    message: &NewMessage,
) -> Result<LedgerOutcome> {
    let now = Utc::now();
    let candidate_id = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    let (conversation_id, unread_count): (String, i64) = sqlx::query_as(
        r#"
        INSERT INTO conversations (
            id, project_id, customer_phone, customer_name, last_message,
            last_message_at, unread_count, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 1, 'active', ?, ?)
        ON CONFLICT(project_id, customer_phone) DO UPDATE SET
            customer_name = COALESCE(excluded.customer_name, conversations.customer_name),
            last_message = excluded.last_message,
            last_message_at = excluded.last_message_at,
            unread_count = conversations.unread_count + 1,
            updated_at = excluded.updated_at
        RETURNING id, unread_count
        "#,
    )
    .bind(&candidate_id)
    .bind(&message.project_id)
    .bind(&message.from_phone)
    .bind(&message.customer_name)
    .bind(&message.content)
    .bind(message.timestamp)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let message_id = Uuid::new_v4().to_string();
    let inserted = sqlx::query(
        r#"
        INSERT INTO messages (
            id, conversation_id, project_id, whatsapp_message_id, from_phone, to_phone,
            message_type, content, media_url, timestamp, direction, status, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(project_id, whatsapp_message_id) DO NOTHING
        "#,
    )
    .bind(&message_id)
    .bind(&conversation_id)
    .bind(&message.project_id)
    .bind(&message.whatsapp_message_id)
    .bind(&message.from_phone)
    .bind(&message.to_phone)
    .bind(message.message_type)
    .bind(&message.content)
    .bind(&message.media_url)
    .bind(message.timestamp)
    .bind(MessageDirection::Incoming)
    .bind(MessageStatus::Delivered)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        tx.rollback().await?;

        let existing: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT conversation_id
            FROM messages
            WHERE project_id = ? AND whatsapp_message_id = ?
            "#,
        )
        .bind(&message.project_id)
        .bind(&message.whatsapp_message_id)
        .fetch_optional(pool)
        .await?;

        tracing::info!(
            project_id = %message.project_id,
            whatsapp_message_id = %message.whatsapp_message_id,
            "Skipping already recorded message"
        );

        return Ok(LedgerOutcome::Duplicate {
            conversation_id: existing.map(|(id,)| id).unwrap_or(conversation_id),
        });
    }

    tx.commit().await?;

    tracing::debug!(
        project_id = %message.project_id,
        conversation_id = %conversation_id,
        unread_count,
        "Recorded inbound message"
    );

    Ok(LedgerOutcome::Recorded {
        conversation_id,
        message_id,
    })
}

/// Get a conversation by id within a project.
pub async fn get_conversation(
    pool: &SqlitePool,
    project_id: &str,
    conversation_id: &str,
) -> Result<Conversation> {
    sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, project_id, customer_phone, customer_name, last_message, last_message_at,
               unread_count, status, created_at, updated_at
        FROM conversations
        WHERE project_id = ? AND id = ?
        "#,
    )
    .bind(project_id)
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: conversation_id.to_string(),
    })
}

/// Find the conversation for a customer phone number.
///
/// The schema allows at most one; should imported data ever break that, the
/// most recently updated row wins.
pub async fn find_by_customer_phone(
    pool: &SqlitePool,
    project_id: &str,
    customer_phone: &str,
) -> Result<Option<Conversation>> {
    let record = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, project_id, customer_phone, customer_name, last_message, last_message_at,
               unread_count, status, created_at, updated_at
        FROM conversations
        WHERE project_id = ? AND customer_phone = ?
        ORDER BY updated_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(project_id)
    .bind(customer_phone)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Position in the conversation list, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationCursor {
    pub last_message_at: DateTime<Utc>,
    pub id: String,
}

impl ConversationCursor {
    /// Cursor pointing just past `conversation`.
    pub fn after(conversation: &Conversation) -> Self {
        Self {
            last_message_at: conversation.last_message_at,
            id: conversation.id.clone(),
        }
    }

    /// Opaque, URL-safe token.
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", self.last_message_at.to_rfc3339(), self.id);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw)
    }

    /// Parse a token produced by [`ConversationCursor::encode`].
    pub fn decode(token: &str) -> Option<Self> {
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .ok()?;
        let raw = String::from_utf8(raw).ok()?;
        let (timestamp, id) = raw.split_once('|')?;
        let last_message_at = DateTime::parse_from_rfc3339(timestamp)
            .ok()?
            .with_timezone(&Utc);
        if id.is_empty() {
            return None;
        }
        Some(Self {
            last_message_at,
            id: id.to_string(),
        })
    }
}

/// List conversations of a project, most recent message first.
///
/// Pagination is keyset based: pass the cursor built from the last row of
/// the previous page.
pub async fn list_conversations(
    pool: &SqlitePool,
    project_id: &str,
    limit: i64,
    after: Option<&ConversationCursor>,
) -> Result<Vec<Conversation>> {
    let rows = match after {
        None => {
            sqlx::query_as::<_, Conversation>(
                r#"
                SELECT id, project_id, customer_phone, customer_name, last_message, last_message_at,
                       unread_count, status, created_at, updated_at
                FROM conversations
                WHERE project_id = ?
                ORDER BY last_message_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(project_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        Some(cursor) => {
            sqlx::query_as::<_, Conversation>(
                r#"
                SELECT id, project_id, customer_phone, customer_name, last_message, last_message_at,
                       unread_count, status, created_at, updated_at
                FROM conversations
                WHERE project_id = ?
                  AND (last_message_at < ? OR (last_message_at = ? AND id < ?))
                ORDER BY last_message_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(project_id)
            .bind(cursor.last_message_at)
            .bind(cursor.last_message_at)
            .bind(&cursor.id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationStatus, MessageType};
    use crate::Database;
    use chrono::TimeZone;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn inbound(wamid: &str, from: &str, content: &str, secs: i64) -> NewMessage {
        NewMessage {
            project_id: "p1".to_string(),
            whatsapp_message_id: wamid.to_string(),
            from_phone: from.to_string(),
            to_phone: "999".to_string(),
            customer_name: None,
            message_type: MessageType::Text,
            content: content.to_string(),
            media_url: None,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_first_message_creates_conversation() {
        let db = test_db().await;

        let outcome = record_inbound_message(db.pool(), &inbound("wamid.1", "155", "Hi", 1_700_000_000))
            .await
            .unwrap();
        assert!(matches!(outcome, LedgerOutcome::Recorded { .. }));

        let conversation = find_by_customer_phone(db.pool(), "p1", "155")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.id, outcome.conversation_id());
        assert_eq!(conversation.unread_count, 1);
        assert_eq!(conversation.last_message, "Hi");
        assert_eq!(conversation.status, ConversationStatus::Active);
        assert_eq!(
            conversation.last_message_at.timestamp_millis(),
            1_700_000_000_000
        );
    }

    #[tokio::test]
    async fn test_sequential_messages_share_conversation() {
        let db = test_db().await;

        let mut ids = Vec::new();
        for n in 1..=5 {
            let outcome = record_inbound_message(
                db.pool(),
                &inbound(&format!("wamid.{n}"), "155", &format!("message {n}"), 1_700_000_000 + n),
            )
            .await
            .unwrap();
            ids.push(outcome.conversation_id().to_string());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let conversation = get_conversation(db.pool(), "p1", &ids[0]).await.unwrap();
        assert_eq!(conversation.unread_count, 5);
        assert_eq!(conversation.last_message, "message 5");
    }

    #[tokio::test]
    async fn test_duplicate_message_is_skipped() {
        let db = test_db().await;
        let message = inbound("wamid.dup", "155", "Hi", 1_700_000_000);

        let first = record_inbound_message(db.pool(), &message).await.unwrap();
        let second = record_inbound_message(db.pool(), &message).await.unwrap();

        assert_eq!(
            second,
            LedgerOutcome::Duplicate {
                conversation_id: first.conversation_id().to_string()
            }
        );

        let conversation = get_conversation(db.pool(), "p1", first.conversation_id())
            .await
            .unwrap();
        assert_eq!(conversation.unread_count, 1);
    }

    #[tokio::test]
    async fn test_customer_name_kept_when_absent() {
        let db = test_db().await;

        let mut named = inbound("wamid.1", "155", "Hi", 1_700_000_000);
        named.customer_name = Some("Ada".to_string());
        record_inbound_message(db.pool(), &named).await.unwrap();
        record_inbound_message(db.pool(), &inbound("wamid.2", "155", "Again", 1_700_000_001))
            .await
            .unwrap();

        let conversation = find_by_customer_phone(db.pool(), "p1", "155")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.customer_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_projects_are_partitioned() {
        let db = test_db().await;

        let mut other = inbound("wamid.1", "155", "Hi", 1_700_000_000);
        other.project_id = "p2".to_string();
        record_inbound_message(db.pool(), &inbound("wamid.1", "155", "Hi", 1_700_000_000))
            .await
            .unwrap();
        let outcome = record_inbound_message(db.pool(), &other).await.unwrap();
        assert!(matches!(outcome, LedgerOutcome::Recorded { .. }));

        assert_eq!(list_conversations(db.pool(), "p1", 10, None).await.unwrap().len(), 1);
        assert_eq!(list_conversations(db.pool(), "p2", 10, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_conversation_not_found() {
        let db = test_db().await;
        let result = get_conversation(db.pool(), "p1", "nope").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_conversations_pages_with_cursor() {
        let db = test_db().await;

        for n in 0..5 {
            record_inbound_message(
                db.pool(),
                &inbound(&format!("wamid.{n}"), &format!("phone-{n}"), "Hi", 1_700_000_000 + n),
            )
            .await
            .unwrap();
        }

        let first_page = list_conversations(db.pool(), "p1", 2, None).await.unwrap();
        let phones: Vec<_> = first_page.iter().map(|c| c.customer_phone.as_str()).collect();
        assert_eq!(phones, vec!["phone-4", "phone-3"]);

        let cursor = ConversationCursor::after(first_page.last().unwrap());
        let token = cursor.encode();
        let decoded = ConversationCursor::decode(&token).unwrap();
        assert_eq!(decoded, cursor);

        let second_page = list_conversations(db.pool(), "p1", 2, Some(&decoded))
            .await
            .unwrap();
        let phones: Vec<_> = second_page.iter().map(|c| c.customer_phone.as_str()).collect();
        assert_eq!(phones, vec!["phone-2", "phone-1"]);
    }

    #[test]
    fn test_cursor_decode_rejects_garbage() {
        assert!(ConversationCursor::decode("not a cursor").is_none());
        let no_id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("2023-11-14T22:13:20+00:00|");
        assert!(ConversationCursor::decode(&no_id).is_none());
    }
}
