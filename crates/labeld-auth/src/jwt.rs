//! Inter-service JWT verification.
//!
//! atproto service tokens are compact JWTs signed by the caller's repo
//! signing key (ES256K or ES256). Verification resolves the issuer's DID
//! document rather than trusting a shared secret, and retries once with a
//! forced refresh to survive key rotation.

use serde::Deserialize;

use labeld_core::PublicKey;

use crate::error::{AuthError, Result};
use crate::resolver::KeyResolver;

/// Verified claims of a service JWT.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtPayload {
    /// Caller DID.
    pub iss: String,
    /// Audience DID (this labeler).
    pub aud: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: f64,
    /// Lexicon method the token is scoped to.
    #[serde(default)]
    pub lxm: Option<String>,
    /// Replay-protection nonce. Carried through, not enforced here.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Verify a compact JWT against the expected audience and lexicon method.
///
/// Steps: shape check, claim checks (expiry, audience, method), then
/// signature verification against the issuer's resolved signing key. On a
/// signature mismatch the issuer is re-resolved with a forced refresh and,
/// if the key changed, verification is retried exactly once.
pub async fn verify_service_jwt(
    token: &str,
    expected_aud: Option<&str>,
    expected_lxm: Option<&str>,
    resolver: &dyn KeyResolver,
) -> Result<JwtPayload> {
    let (message, payload_b64, sig_b64) = split_token(token)?;

    let payload_bytes = decode_b64url(payload_b64)?;
    let payload: JwtPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| AuthError::BadJwt(format!("bad payload: {e}")))?;

    if now_secs() > payload.exp {
        return Err(AuthError::JwtExpired);
    }

    if let Some(aud) = expected_aud {
        if payload.aud != aud {
            return Err(AuthError::BadJwtAudience);
        }
    }

    if let Some(lxm) = expected_lxm {
        if payload.lxm.as_deref() != Some(lxm) {
            return Err(AuthError::BadJwtLexiconMethod);
        }
    }

    let sig = decode_b64url(sig_b64)?;

    let initial = resolver.resolve_signing_key(&payload.iss, false).await;
    if let Ok(key) = &initial {
        if verify_with_did_key(key, message.as_bytes(), &sig) {
            return Ok(payload);
        }
    }

    // The issuer may have rotated keys since we cached them (or the first
    // resolve failed outright). One forced refresh, one retry.
    let refreshed = resolver
        .resolve_signing_key(&payload.iss, true)
        .await
        .map_err(|e| {
            tracing::debug!(iss = %payload.iss, error = %e, "forced DID re-resolution failed");
            AuthError::BadJwtSignature
        })?;

    let key_changed = initial.as_deref().ok() != Some(refreshed.as_str());
    if key_changed && verify_with_did_key(&refreshed, message.as_bytes(), &sig) {
        return Ok(payload);
    }

    Err(AuthError::BadJwtSignature)
}

/// Split a compact JWT into (signed message, payload part, signature part).
fn split_token(token: &str) -> Result<(&str, &str, &str)> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::BadJwt("expected three dot-separated parts".into()));
    };
    if header.is_empty() || payload.is_empty() || sig.is_empty() {
        return Err(AuthError::BadJwt("empty JWT segment".into()));
    }

    // The signed message is everything before the final dot.
    let message_len = header.len() + 1 + payload.len();
    Ok((&token[..message_len], payload, sig))
}

fn decode_b64url(part: &str) -> Result<Vec<u8>> {
    use base64::Engine as _;
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| AuthError::BadJwt(format!("bad base64url: {e}")))
}

fn verify_with_did_key(did_key: &str, message: &[u8], sig: &[u8]) -> bool {
    match PublicKey::from_did_key(did_key) {
        Ok(key) => key.verify(message, sig).is_ok(),
        Err(e) => {
            tracing::debug!(key = %did_key, error = %e, "unusable issuer signing key");
            false
        }
    }
}

fn now_secs() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
