//! End-to-end tests for the webhook pipeline against SQLite.
//!
//! Run with:
//!   cargo test -p whatsapp-webhook --test webhook_flow

use std::collections::HashMap;

use database::{
    conversation, message, whatsapp_config, Database, MessageDirection, MessageStatus,
    MessageType, SecretBoxCodec, WhatsAppConfigInput,
};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use whatsapp_webhook::signature::sign;
use whatsapp_webhook::{Dispatcher, ResponseBody, SqliteStore, WebhookResponse, SIGNATURE_HEADER};

const PROJECT: &str = "p1";
const SECRET: &str = "app-secret";
const VERIFY_TOKEN: &str = "verify-token";
const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

async fn setup_db(url: &str, pool_size: u32) -> Database {
    let db = Database::connect_with_pool_size(url, pool_size)
        .await
        .unwrap();
    db.migrate().await.unwrap();
    db
}

async fn configured_dispatcher(db: Database) -> Dispatcher<SqliteStore> {
    let codec = SecretBoxCodec::from_key_str(KEY_HEX).unwrap();
    let input = WhatsAppConfigInput {
        access_token: SECRET.to_string(),
        webhook_verify_token: VERIFY_TOKEN.to_string(),
        business_account_id: "biz-1".to_string(),
        phone_number_id: "999".to_string(),
    };
    whatsapp_config::save_config(db.pool(), &codec, PROJECT, &input)
        .await
        .unwrap();
    Dispatcher::new(SqliteStore::new(db, codec))
}

fn text_delivery(id: &str, from: &str, timestamp: &str, body: &str) -> Vec<u8> {
    format!(
        r#"{{"object":"whatsapp_business_account","entry":[{{"id":"biz-1","changes":[{{"field":"messages","value":{{"messaging_product":"whatsapp","metadata":{{"phone_number_id":"999"}},"contacts":[{{"wa_id":"{from}","profile":{{"name":"Ada"}}}}],"messages":[{{"id":"{id}","from":"{from}","timestamp":"{timestamp}","type":"text","text":{{"body":"{body}"}}}}]}}}}]}}]}}"#
    )
    .into_bytes()
}

fn signed(body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&sign(body, SECRET).unwrap()).unwrap(),
    );
    headers
}

async fn post(dispatcher: &Dispatcher<SqliteStore>, body: &[u8]) -> WebhookResponse {
    dispatcher
        .handle(PROJECT, &Method::POST, &signed(body), body, &HashMap::new())
        .await
}

fn handshake(token: &str) -> HashMap<String, String> {
    let mut query = HashMap::new();
    query.insert("hub.mode".to_string(), "subscribe".to_string());
    query.insert("hub.verify_token".to_string(), token.to_string());
    query.insert("hub.challenge".to_string(), "1158201444".to_string());
    query
}

// ============================================================================
// Ledger flow
// ============================================================================

#[tokio::test]
async fn test_first_text_message_creates_conversation() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;
    let body = text_delivery("wamid.A", "15551234567", "1700000000", "Hi");

    let response = post(&dispatcher, &body).await;
    assert_eq!(response, WebhookResponse::success());

    let pool = dispatcher.store().database().pool();
    let conv = conversation::find_by_customer_phone(pool, PROJECT, "15551234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conv.customer_name.as_deref(), Some("Ada"));
    assert_eq!(conv.last_message, "Hi");
    assert_eq!(conv.unread_count, 1);
    assert_eq!(conv.last_message_at.timestamp_millis(), 1_700_000_000_000);

    let messages = message::list_messages(pool, PROJECT, &conv.id, 100)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    let stored = &messages[0];
    assert_eq!(stored.whatsapp_message_id, "wamid.A");
    assert_eq!(stored.from_phone, "15551234567");
    assert_eq!(stored.to_phone, "999");
    assert_eq!(stored.message_type, MessageType::Text);
    assert_eq!(stored.content, "Hi");
    assert_eq!(stored.direction, MessageDirection::Incoming);
    assert_eq!(stored.status, MessageStatus::Delivered);
    assert_eq!(stored.timestamp.timestamp_millis(), 1_700_000_000_000);
}

#[tokio::test]
async fn test_sequential_messages_share_one_conversation() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;

    for i in 0..5 {
        let body = text_delivery(
            &format!("wamid.{i}"),
            "15551234567",
            &(1_700_000_000 + i).to_string(),
            &format!("message {i}"),
        );
        assert_eq!(post(&dispatcher, &body).await.status, StatusCode::OK);
    }

    let pool = dispatcher.store().database().pool();
    let conversations = conversation::list_conversations(pool, PROJECT, 100, None)
        .await
        .unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].unread_count, 5);
    assert_eq!(conversations[0].last_message, "message 4");

    let messages = message::list_messages(pool, PROJECT, &conversations[0].id, 100)
        .await
        .unwrap();
    let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["message 0", "message 1", "message 2", "message 3", "message 4"]
    );
}

#[tokio::test]
async fn test_concurrent_deliveries_for_same_customer() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("ledger.db").display());
    let dispatcher = configured_dispatcher(setup_db(&url, 8).await).await;

    const M: usize = 12;
    let bodies: Vec<Vec<u8>> = (0..M)
        .map(|i| {
            text_delivery(
                &format!("wamid.c{i}"),
                "15557654321",
                "1700000000",
                &format!("burst {i}"),
            )
        })
        .collect();

    let responses =
        futures::future::join_all(bodies.iter().map(|body| post(&dispatcher, body))).await;
    assert!(responses.iter().all(|r| r.status == StatusCode::OK));

    let pool = dispatcher.store().database().pool();
    let conversations = conversation::list_conversations(pool, PROJECT, 100, None)
        .await
        .unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].unread_count, M as i64);
    assert_eq!(message::count_messages(pool, PROJECT).await.unwrap(), M as i64);
}

#[tokio::test]
async fn test_redelivery_is_not_double_counted() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;
    let body = text_delivery("wamid.A", "15551234567", "1700000000", "Hi");

    assert_eq!(post(&dispatcher, &body).await.status, StatusCode::OK);
    assert_eq!(post(&dispatcher, &body).await.status, StatusCode::OK);

    let pool = dispatcher.store().database().pool();
    let conv = conversation::find_by_customer_phone(pool, PROJECT, "15551234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conv.unread_count, 1);
    assert_eq!(message::count_messages(pool, PROJECT).await.unwrap(), 1);
}

#[tokio::test]
async fn test_media_message_stores_media_reference() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;
    let body = br#"{"object":"whatsapp_business_account","entry":[{"changes":[{"field":"messages","value":{
        "metadata":{"phone_number_id":"999"},
        "messages":[{"id":"wamid.doc","from":"155","timestamp":"1700000000","type":"document",
                     "document":{"id":"media-9","filename":"invoice.pdf"}}]}}]}]}"#;

    assert_eq!(post(&dispatcher, body).await.status, StatusCode::OK);

    let pool = dispatcher.store().database().pool();
    let stored = message::get_by_whatsapp_id(pool, PROJECT, "wamid.doc")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.message_type, MessageType::Document);
    assert_eq!(stored.content, "invoice.pdf");
    assert_eq!(stored.media_url.as_deref(), Some("media-9"));
}

#[tokio::test]
async fn test_ill_typed_message_keeps_valid_sibling() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;
    let body = br#"{"object":"whatsapp_business_account","entry":[{"changes":[{"field":"messages","value":{
        "metadata":{"phone_number_id":"999"},
        "contacts":[{"wa_id":155},{"wa_id":"155","profile":{"name":"Ada"}}],
        "messages":[{"id":"wamid.1","from":"155","timestamp":"1700000000","type":"text","text":{"body":"Hi"}},
                    {"id":"wamid.2","from":"155","timestamp":1700000001,"type":"text","text":{"body":"late"}},
                    {"id":"wamid.3","from":"155","timestamp":"1700000002","type":"image","image":{"id":7}}],
        "statuses":[{"id":42}]}}]}]}"#;

    assert_eq!(post(&dispatcher, body).await, WebhookResponse::success());

    let pool = dispatcher.store().database().pool();
    assert_eq!(message::count_messages(pool, PROJECT).await.unwrap(), 1);
    let conv = conversation::find_by_customer_phone(pool, PROJECT, "155")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conv.last_message, "Hi");
    assert_eq!(conv.customer_name.as_deref(), Some("Ada"));
    assert_eq!(conv.unread_count, 1);
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_unconfigured_project_is_rejected() {
    let db = setup_db("sqlite::memory:", 1).await;
    let codec = SecretBoxCodec::from_key_str(KEY_HEX).unwrap();
    let dispatcher = Dispatcher::new(SqliteStore::new(db, codec));
    let body = text_delivery("wamid.A", "155", "1700000000", "Hi");

    let response = post(&dispatcher, &body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        ResponseBody::Json(serde_json::json!({ "error": "Project not configured" }))
    );

    let response = dispatcher
        .handle(PROJECT, &Method::GET, &HeaderMap::new(), b"", &handshake(VERIFY_TOKEN))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let pool = dispatcher.store().database().pool();
    assert_eq!(message::count_messages(pool, PROJECT).await.unwrap(), 0);
}

#[tokio::test]
async fn test_disabled_project_is_rejected() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;
    let pool = dispatcher.store().database().pool();
    assert!(whatsapp_config::disable_config(pool, PROJECT).await.unwrap());

    let body = text_delivery("wamid.A", "155", "1700000000", "Hi");
    assert_eq!(post(&dispatcher, &body).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signature_from_other_secret_is_rejected() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;
    let body = text_delivery("wamid.A", "155", "1700000000", "Hi");

    let mut headers = HeaderMap::new();
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&sign(&body, "another-secret").unwrap()).unwrap(),
    );
    let response = dispatcher
        .handle(PROJECT, &Method::POST, &headers, &body, &HashMap::new())
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let pool = dispatcher.store().database().pool();
    assert_eq!(message::count_messages(pool, PROJECT).await.unwrap(), 0);
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_handshake_echoes_challenge() {
    let dispatcher = configured_dispatcher(setup_db("sqlite::memory:", 1).await).await;

    let response = dispatcher
        .handle(PROJECT, &Method::GET, &HeaderMap::new(), b"", &handshake(VERIFY_TOKEN))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, ResponseBody::Text("1158201444".to_string()));

    let response = dispatcher
        .handle(PROJECT, &Method::GET, &HeaderMap::new(), b"", &handshake("wrong"))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
