//! Subscription handshake.
//!
//! When a webhook URL is registered the provider sends
//! `GET ?hub.mode=subscribe&hub.verify_token=T&hub.challenge=C` and expects
//! `C` back verbatim.

use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::WebhookError;
use crate::response::WebhookResponse;

pub const MODE_PARAM: &str = "hub.mode";
pub const VERIFY_TOKEN_PARAM: &str = "hub.verify_token";
pub const CHALLENGE_PARAM: &str = "hub.challenge";

const SUBSCRIBE_MODE: &str = "subscribe";

/// Answer a handshake request.
pub fn respond(
    mode: &str,
    token: &str,
    challenge: &str,
    expected_token: &str,
) -> Result<WebhookResponse, WebhookError> {
    if mode != SUBSCRIBE_MODE {
        warn!(mode, "Rejecting handshake with unexpected mode");
        return Err(WebhookError::InvalidMode(mode.to_string()));
    }

    let matches: bool = token.as_bytes().ct_eq(expected_token.as_bytes()).into();
    if !matches {
        return Err(WebhookError::InvalidVerifyToken);
    }

    Ok(WebhookResponse::text(challenge))
}
