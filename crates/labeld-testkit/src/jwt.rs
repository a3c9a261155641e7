//! Service-JWT forging and a static key resolver for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine as _;

use labeld_auth::{AuthError, KeyResolver};
use labeld_core::SigningKey;

/// Mint a compact ES256K service token the way a PDS would.
///
/// `exp_offset_secs` is relative to now; pass a negative value to mint an
/// already-expired token.
pub fn mint_service_jwt(
    key: &SigningKey,
    iss: &str,
    aud: &str,
    exp_offset_secs: i64,
    lxm: Option<&str>,
) -> String {
    let b64 =
        |bytes: &[u8]| base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

    let header = b64(br#"{"typ":"JWT","alg":"ES256K"}"#);

    let exp = now_secs() + exp_offset_secs;
    let mut claims = serde_json::json!({ "iss": iss, "aud": aud, "exp": exp });
    if let Some(lxm) = lxm {
        claims["lxm"] = serde_json::Value::String(lxm.to_string());
    }
    let payload = b64(claims.to_string().as_bytes());

    let message = format!("{header}.{payload}");
    let sig = key.sign(message.as_bytes());
    format!("{message}.{}", b64(sig.as_bytes()))
}

/// Resolver backed by a fixed DID → signing-key table.
pub struct StaticResolver {
    keys: HashMap<String, String>,
}

impl StaticResolver {
    /// A resolver that knows no DIDs at all.
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Register `did` as controlled by `key`.
    pub fn with_key(mut self, did: &str, key: &SigningKey) -> Self {
        self.keys.insert(did.to_string(), key.did_key());
        self
    }
}

#[async_trait]
impl KeyResolver for StaticResolver {
    async fn resolve_signing_key(
        &self,
        did: &str,
        _force_refresh: bool,
    ) -> Result<String, AuthError> {
        self.keys
            .get(did)
            .cloned()
            .ok_or_else(|| AuthError::Resolution(format!("unknown DID: {did}")))
    }
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
