//! Per-project WhatsApp configuration routes.

use axum::extract::{Path, State};
use axum::Json;
use database::{whatsapp_config, WhatsAppConfigInput};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AdminError, Result};
use crate::state::AppState;

/// Current configuration, with the access token masked.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub is_configured: bool,
    pub config: Option<ConfigView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    /// `****` followed by the last four characters.
    pub access_token: String,
    pub webhook_verify_token: String,
    pub business_account_id: String,
    pub phone_number_id: String,
}

/// Settings form submission. Missing fields are reported by validation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub webhook_verify_token: String,
    #[serde(default)]
    pub business_account_id: String,
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Serialize)]
pub struct SaveConfigResponse {
    pub success: bool,
    pub message: String,
}

/// Get the configuration of a project.
pub async fn get_config_api(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ConfigResponse>> {
    let config = whatsapp_config::get_config(state.db.pool(), &state.codec, &project_id).await?;

    let response = match config {
        Some(config) => ConfigResponse {
            is_configured: config.is_configured,
            config: Some(ConfigView {
                access_token: config.masked_access_token(),
                webhook_verify_token: config.webhook_verify_token,
                business_account_id: config.business_account_id,
                phone_number_id: config.phone_number_id,
            }),
        },
        None => ConfigResponse {
            is_configured: false,
            config: None,
        },
    };

    Ok(Json(response))
}

/// Save the configuration of a project and mark it configured.
pub async fn save_config_api(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<SaveConfigRequest>,
) -> Result<Json<SaveConfigResponse>> {
    let input = WhatsAppConfigInput {
        access_token: req.access_token,
        webhook_verify_token: req.webhook_verify_token,
        business_account_id: req.business_account_id,
        phone_number_id: req.phone_number_id,
    }
    .validated()?;

    whatsapp_config::save_config(state.db.pool(), &state.codec, &project_id, &input).await?;
    info!(project_id = %project_id, "WhatsApp configuration updated");

    Ok(Json(SaveConfigResponse {
        success: true,
        message: "WhatsApp configuration saved successfully".to_string(),
    }))
}

/// Stop accepting webhooks for a project.
pub async fn disable_config_api(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    if !whatsapp_config::disable_config(state.db.pool(), &project_id).await? {
        return Err(AdminError::NotFound("WhatsApp configuration"));
    }
    info!(project_id = %project_id, "WhatsApp configuration disabled");

    Ok(Json(serde_json::json!({ "success": true })))
}
