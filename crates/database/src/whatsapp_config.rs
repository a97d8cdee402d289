//! Per-project WhatsApp configuration persistence.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::crypto::SecretBoxCodec;
use crate::models::WhatsAppConfig;
use crate::validation::WhatsAppConfigInput;
use crate::Result;

#[derive(FromRow)]
struct ConfigRow {
    project_id: String,
    access_token: String,
    webhook_verify_token: String,
    business_account_id: String,
    phone_number_id: String,
    is_configured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Create or replace the configuration for a project and mark it configured.
///
/// The access token is sealed before it reaches the database. Callers are
/// expected to pass input that went through [`WhatsAppConfigInput::validated`].
pub async fn save_config(
    pool: &SqlitePool,
    codec: &SecretBoxCodec,
    project_id: &str,
    input: &WhatsAppConfigInput,
) -> Result<()> {
    let sealed = codec.seal(&input.access_token)?;
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO whatsapp_configs (
            project_id, access_token, webhook_verify_token, business_account_id,
            phone_number_id, is_configured, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, 1, ?, ?)
        ON CONFLICT(project_id) DO UPDATE SET
            access_token = excluded.access_token,
            webhook_verify_token = excluded.webhook_verify_token,
            business_account_id = excluded.business_account_id,
            phone_number_id = excluded.phone_number_id,
            is_configured = 1,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(project_id)
    .bind(&sealed)
    .bind(&input.webhook_verify_token)
    .bind(&input.business_account_id)
    .bind(&input.phone_number_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!(project_id, "Saved WhatsApp configuration");
    Ok(())
}

/// Load the configuration for a project, opening the access token.
pub async fn get_config(
    pool: &SqlitePool,
    codec: &SecretBoxCodec,
    project_id: &str,
) -> Result<Option<WhatsAppConfig>> {
    let row = sqlx::query_as::<_, ConfigRow>(
        r#"
        SELECT project_id, access_token, webhook_verify_token, business_account_id,
               phone_number_id, is_configured, created_at, updated_at
        FROM whatsapp_configs
        WHERE project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(WhatsAppConfig {
        access_token: codec.open(&row.access_token)?,
        project_id: row.project_id,
        webhook_verify_token: row.webhook_verify_token,
        business_account_id: row.business_account_id,
        phone_number_id: row.phone_number_id,
        is_configured: row.is_configured,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

/// Mark a project as not configured without discarding its values.
///
/// Webhook deliveries for the project are rejected until the configuration
/// is saved again. Returns whether a configuration existed.
pub async fn disable_config(pool: &SqlitePool, project_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE whatsapp_configs
        SET is_configured = 0, updated_at = ?
        WHERE project_id = ?
        "#,
    )
    .bind(Utc::now())
    .bind(project_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
