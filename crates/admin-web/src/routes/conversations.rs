//! Conversation and message browsing routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use database::models::{Conversation, Message};
use database::{conversation, message, ConversationCursor};
use serde::{Deserialize, Serialize};

use crate::error::{AdminError, Result};
use crate::state::AppState;

const DEFAULT_CONVERSATION_LIMIT: i64 = 20;
const MAX_CONVERSATION_LIMIT: i64 = 100;
const DEFAULT_MESSAGE_LIMIT: i64 = 100;
const MAX_MESSAGE_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct ListConversationsParams {
    pub limit: Option<i64>,
    /// Token from `nextCursor` of the previous page.
    pub cursor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    /// Number of conversations in this page.
    pub total: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Deserialize)]
pub struct ListMessagesParams {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub total: usize,
}

/// List conversations of a project, most recent first.
pub async fn list_conversations_api(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(params): Query<ListConversationsParams>,
) -> Result<Json<ConversationPage>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_CONVERSATION_LIMIT)
        .clamp(1, MAX_CONVERSATION_LIMIT);

    let cursor = match params.cursor.as_deref() {
        Some(token) => Some(
            ConversationCursor::decode(token)
                .ok_or_else(|| AdminError::BadRequest("Invalid cursor".to_string()))?,
        ),
        None => None,
    };

    // One extra row tells whether another page exists.
    let mut conversations =
        conversation::list_conversations(state.db.pool(), &project_id, limit + 1, cursor.as_ref())
            .await?;

    let has_more = conversations.len() as i64 > limit;
    conversations.truncate(limit as usize);

    let next_cursor = if has_more {
        conversations
            .last()
            .map(|last| ConversationCursor::after(last).encode())
    } else {
        None
    };

    Ok(Json(ConversationPage {
        total: conversations.len(),
        conversations,
        has_more,
        next_cursor,
    }))
}

/// List the messages of one conversation, oldest first.
pub async fn list_messages_api(
    State(state): State<AppState>,
    Path((project_id, conversation_id)): Path<(String, String)>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<MessageList>> {
    let pool = state.db.pool();
    let limit = params
        .limit
        .unwrap_or(DEFAULT_MESSAGE_LIMIT)
        .clamp(1, MAX_MESSAGE_LIMIT);

    // 404 unless the conversation belongs to the project.
    conversation::get_conversation(pool, &project_id, &conversation_id).await?;

    let messages = message::list_messages(pool, &project_id, &conversation_id, limit).await?;

    Ok(Json(MessageList {
        total: messages.len(),
        messages,
    }))
}
