//! Per-request orchestration of the webhook pipeline.

use std::collections::HashMap;

use database::{LedgerOutcome, NewMessage};
use http::{HeaderMap, Method};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::challenge::{self, CHALLENGE_PARAM, MODE_PARAM, VERIFY_TOKEN_PARAM};
use crate::error::{ProcessingError, WebhookError};
use crate::normalize::{normalize, parse_timestamp};
use crate::payload::{
    ChangeValue, RawMessage, StatusUpdate, WebhookPayload, MESSAGES_FIELD,
    WHATSAPP_BUSINESS_OBJECT,
};
use crate::response::WebhookResponse;
use crate::signature::{verify_signature, SIGNATURE_HEADER};
use crate::store::{ConversationLedger, TenantConfig, TenantConfigSource};

/// Counters for one verified delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages appended to the ledger.
    pub recorded: usize,
    /// Messages whose provider id was already stored.
    pub duplicates: usize,
    /// Messages that could not be decoded, normalized or stored.
    pub failed: usize,
    /// Status updates observed (not persisted).
    pub statuses: usize,
    /// Changes with a field other than "messages".
    pub ignored_changes: usize,
}

/// Routes webhook requests for every tenant.
pub struct Dispatcher<S> {
    store: S,
}

impl<S> Dispatcher<S>
where
    S: TenantConfigSource + ConversationLedger,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one inbound request.
    ///
    /// `raw_body` must be the body exactly as received; it is what the
    /// signature covers.
    pub async fn handle(
        &self,
        project_id: &str,
        method: &Method,
        headers: &HeaderMap,
        raw_body: &[u8],
        query: &HashMap<String, String>,
    ) -> WebhookResponse {
        match self.try_handle(project_id, method, headers, raw_body, query).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    WebhookError::Store(_) | WebhookError::AllMessagesFailed { .. } => {
                        error!(project_id, error = %err, "Webhook processing failed")
                    }
                    WebhookError::NotConfigured { .. } => {
                        error!(project_id, "WhatsApp config not found or not configured")
                    }
                    _ => warn!(project_id, error = %err, "Rejected webhook request"),
                }
                err.to_response()
            }
        }
    }

    async fn try_handle(
        &self,
        project_id: &str,
        method: &Method,
        headers: &HeaderMap,
        raw_body: &[u8],
        query: &HashMap<String, String>,
    ) -> Result<WebhookResponse, WebhookError> {
        if method != Method::GET && method != Method::POST {
            return Err(WebhookError::MethodNotAllowed(method.clone()));
        }

        let config = self.load_configured(project_id).await?;

        if method == Method::GET {
            let param = |name: &str| query.get(name).map(String::as_str).unwrap_or("");
            let response = challenge::respond(
                param(MODE_PARAM),
                param(VERIFY_TOKEN_PARAM),
                param(CHALLENGE_PARAM),
                &config.webhook_verify_token,
            )?;
            info!(project_id, "Webhook verified");
            return Ok(response);
        }

        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        if !verify_signature(raw_body, signature, &config.access_token) {
            return Err(WebhookError::InvalidSignature);
        }

        let report = self.process_delivery(project_id, raw_body).await?;
        info!(
            project_id,
            recorded = report.recorded,
            duplicates = report.duplicates,
            failed = report.failed,
            statuses = report.statuses,
            "Webhook delivery processed"
        );

        Ok(WebhookResponse::success())
    }

    async fn load_configured(&self, project_id: &str) -> Result<TenantConfig, WebhookError> {
        match self.store.load_tenant_config(project_id).await? {
            Some(config) if config.is_configured => Ok(config),
            _ => Err(WebhookError::NotConfigured {
                project_id: project_id.to_string(),
            }),
        }
    }

    /// Fold a verified delivery body into the ledger.
    ///
    /// Bodies that are not JSON or not WhatsApp Business deliveries are
    /// ignored. Messages are applied in array order and independently of
    /// each other; the delivery only fails when every attempted message
    /// failed.
    pub async fn process_delivery(
        &self,
        project_id: &str,
        raw_body: &[u8],
    ) -> Result<DeliveryReport, WebhookError> {
        let mut report = DeliveryReport::default();

        let payload: WebhookPayload = match serde_json::from_slice(raw_body) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(project_id, error = %err, "Ignoring malformed webhook body");
                return Ok(report);
            }
        };

        if payload.object != WHATSAPP_BUSINESS_OBJECT {
            info!(project_id, object = %payload.object, "Ignoring webhook for other object type");
            return Ok(report);
        }

        for entry in &payload.entry {
            for change in &entry.changes {
                if change.field != MESSAGES_FIELD {
                    report.ignored_changes += 1;
                    continue;
                }
                self.process_change(project_id, &change.value, &mut report)
                    .await;
            }
        }

        if report.failed > 0 && report.recorded + report.duplicates == 0 {
            return Err(WebhookError::AllMessagesFailed {
                failed: report.failed,
            });
        }

        Ok(report)
    }

    async fn process_change(&self, project_id: &str, value: &ChangeValue, report: &mut DeliveryReport) {
        for message in &value.messages {
            match self.process_message(project_id, value, message).await {
                Ok(LedgerOutcome::Recorded { .. }) => report.recorded += 1,
                Ok(LedgerOutcome::Duplicate { conversation_id }) => {
                    report.duplicates += 1;
                    debug!(
                        project_id,
                        conversation_id = %conversation_id,
                        whatsapp_message_id = RawMessage::id_of(message),
                        "Duplicate delivery"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        project_id,
                        whatsapp_message_id = RawMessage::id_of(message),
                        error = %err,
                        "Failed to process message"
                    );
                }
            }
        }

        // Status receipts are not persisted yet.
        for status in &value.statuses {
            report.statuses += 1;
            match StatusUpdate::from_value(status) {
                Ok(status) => debug!(
                    project_id,
                    whatsapp_message_id = %status.id,
                    status = %status.status,
                    recipient = %status.recipient_id,
                    "Status update received"
                ),
                Err(err) => debug!(project_id, error = %err, "Undecodable status update"),
            }
        }
    }

    async fn process_message(
        &self,
        project_id: &str,
        value: &ChangeValue,
        message: &Value,
    ) -> Result<LedgerOutcome, ProcessingError> {
        let message = RawMessage::from_value(message)?;
        if message.id.is_empty() {
            return Err(ProcessingError::MissingField("id"));
        }
        if message.from.is_empty() {
            return Err(ProcessingError::MissingField("from"));
        }

        let timestamp = parse_timestamp(&message.timestamp)?;
        let normalized = normalize(&message);

        let new_message = NewMessage {
            project_id: project_id.to_string(),
            whatsapp_message_id: message.id.clone(),
            from_phone: message.from.clone(),
            to_phone: value.metadata.phone_number_id.clone(),
            customer_name: value.contact_name(&message.from),
            message_type: normalized.message_type,
            content: normalized.content,
            media_url: normalized.media_url,
            timestamp,
        };

        let outcome = self.store.record_inbound(&new_message).await?;
        if let LedgerOutcome::Recorded { conversation_id, .. } = &outcome {
            info!(
                project_id,
                conversation_id = %conversation_id,
                message_type = new_message.message_type.as_str(),
                "Message saved"
            );
        }
        Ok(outcome)
    }
}
