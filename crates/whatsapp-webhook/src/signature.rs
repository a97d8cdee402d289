//! `X-Hub-Signature-256` verification.
//!
//! The provider signs every delivery with HMAC-SHA256 over the raw request
//! body, keyed by the app secret, and sends `sha256=<hex>`. The MAC must be
//! computed over the bytes exactly as received.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Check a delivery signature against the raw body.
///
/// Returns `false` when the header is absent, lacks the `sha256=` prefix or
/// is not hex. The digest comparison is constant time.
pub fn verify_signature(raw_body: &[u8], signature_header: Option<&str>, secret: &str) -> bool {
    let Some(header) = signature_header else {
        return false;
    };

    let Some(signature_hex) = header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        warn!("Signature header missing sha256= prefix");
        return false;
    };

    let received = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "Signature header is not valid hex");
            return false;
        }
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(&received).into()
}

/// Compute the header value the provider would send for `raw_body`.
pub fn sign(raw_body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(raw_body);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}
