//! DID-document resolution.
//!
//! Resolves an issuer DID to its atproto signing key, expressed as a
//! `did:key` string. Positive results are cached for an hour; a forced
//! refresh bypasses the cached entry and replaces it on success.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use labeld_core::did_key_from_multibase;

use crate::error::{AuthError, Result};

/// Default PLC directory endpoint.
pub const DEFAULT_PLC_URL: &str = "https://plc.directory";

/// How long positive resolutions stay cached.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Timeout for a single DID-document fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves a DID to its atproto signing key (`did:key:z…`).
///
/// Behind a trait so tests and embedders can substitute a static table.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Resolve `did` to a signing key. `force_refresh` bypasses any cache.
    async fn resolve_signing_key(&self, did: &str, force_refresh: bool) -> Result<String>;
}

struct CachedKey {
    did_key: String,
    fetched_at: Instant,
}

/// HTTP resolver for `did:plc` and `did:web`.
pub struct HttpDidResolver {
    client: reqwest::Client,
    plc_url: String,
    cache: Mutex<HashMap<String, CachedKey>>,
}

impl HttpDidResolver {
    /// Create a resolver against the default PLC directory.
    pub fn new() -> Self {
        Self::with_plc_url(DEFAULT_PLC_URL)
    }

    /// Create a resolver against a specific PLC directory endpoint.
    pub fn with_plc_url(plc_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("default reqwest client");
        Self {
            client,
            plc_url: plc_url.into().trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_get(&self, did: &str) -> Option<String> {
        let cache = self.cache.lock().ok()?;
        let entry = cache.get(did)?;
        (entry.fetched_at.elapsed() < CACHE_TTL).then(|| entry.did_key.clone())
    }

    fn cache_put(&self, did: &str, did_key: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                did.to_string(),
                CachedKey {
                    did_key,
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}

impl Default for HttpDidResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyResolver for HttpDidResolver {
    async fn resolve_signing_key(&self, did: &str, force_refresh: bool) -> Result<String> {
        if !force_refresh {
            if let Some(hit) = self.cache_get(did) {
                return Ok(hit);
            }
        }

        let url = document_url(did, &self.plc_url)?;
        tracing::debug!(did = %did, url = %url, force = force_refresh, "fetching DID document");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::Resolution(format!("fetch {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(AuthError::Resolution(format!(
                "fetch {url}: status {}",
                response.status()
            )));
        }

        let document: DidDocument = response
            .json()
            .await
            .map_err(|e| AuthError::Resolution(format!("parse DID document: {e}")))?;

        let did_key = signing_key_from_document(&document, did)?;
        self.cache_put(did, did_key.clone());
        Ok(did_key)
    }
}

/// Build the fetch URL for a DID.
///
/// `did:plc:<id>` resolves through the PLC directory; `did:web:<host>`
/// through the host's well-known document.
pub fn document_url(did: &str, plc_url: &str) -> Result<String> {
    if did.starts_with("did:plc:") {
        return Ok(format!("{plc_url}/{did}"));
    }
    if let Some(host) = did.strip_prefix("did:web:") {
        if host.is_empty() || host.contains('/') || host.contains(':') {
            return Err(AuthError::Resolution(format!("unsupported did:web form: {did}")));
        }
        return Ok(format!("https://{host}/.well-known/did.json"));
    }
    Err(AuthError::Resolution(format!("unsupported DID method: {did}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidDocument {
    #[serde(default)]
    verification_method: Vec<VerificationMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationMethod {
    id: String,
    #[serde(default)]
    public_key_multibase: Option<String>,
}

/// Select the `#atproto` verification method and normalize its key to a
/// `did:key` string.
fn signing_key_from_document(document: &DidDocument, did: &str) -> Result<String> {
    let absolute = format!("{did}#atproto");
    let method = document
        .verification_method
        .iter()
        .find(|m| m.id == absolute || m.id == "#atproto")
        .ok_or_else(|| AuthError::Resolution(format!("no #atproto verification method for {did}")))?;

    let multibase = method
        .public_key_multibase
        .as_deref()
        .ok_or_else(|| AuthError::Resolution(format!("verification method for {did} has no publicKeyMultibase")))?;

    did_key_from_multibase(multibase)
        .map_err(|e| AuthError::Resolution(format!("bad signing key for {did}: {e}")))
}
