//! Webhook signature verification.
//!
//! Requests are authenticated with an HMAC-SHA256 over the exact request
//! body bytes, sent as `X-Hub-Signature-256: sha256=<hex>`. Verification
//! is opt-in: without a configured secret every request passes.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::BridgeError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the header value a sender with `secret` would attach to `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, BridgeError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| BridgeError::Internal(e.to_string().into()))?;
    mac.update(body);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Decide whether a request may proceed to the publish path.
///
/// `signature` is `None` when the header is absent or not a valid string;
/// `body` is `None` when the raw bytes are not available.
pub fn validate(
    secret: Option<&[u8]>,
    signature: Option<&str>,
    body: Option<&[u8]>,
) -> Result<(), BridgeError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    let signature = signature.ok_or(BridgeError::MissingSignature)?;
    let body = body.ok_or(BridgeError::MissingBody)?;

    let expected = sign(secret, body)?;
    if signatures_match(signature.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(BridgeError::InvalidSignature)
    }
}

fn signatures_match(provided: &[u8], expected: &[u8]) -> bool {
    // Length first: ct_eq on unequal lengths returns early.
    provided.len() == expected.len() && bool::from(provided.ct_eq(expected))
}
