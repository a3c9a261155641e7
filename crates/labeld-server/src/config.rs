//! Construction-time configuration for the labeler.

use thiserror::Error;

use labeld_core::{CoreError, SigningKey};

/// Configuration errors, surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("labeler DID must be did:plc:… or did:web:…, got {0:?}")]
    BadDid(String),

    #[error(transparent)]
    Key(#[from] CoreError),
}

/// The labeler's identity: its DID and signing key.
#[derive(Clone)]
pub struct LabelerConfig {
    /// The labeler's own DID; default `src` for emitted labels and the
    /// expected JWT audience.
    pub did: String,
    /// The secp256k1 key every stored label is signed with.
    pub signing_key: SigningKey,
}

impl LabelerConfig {
    pub fn new(did: impl Into<String>, signing_key: SigningKey) -> Result<Self, ConfigError> {
        let did = did.into();
        if !did.starts_with("did:plc:") && !did.starts_with("did:web:") {
            return Err(ConfigError::BadDid(did));
        }
        Ok(Self { did, signing_key })
    }

    /// Build from raw strings: the DID and the key as hex or base64.
    pub fn from_strings(did: &str, signing_key: &str) -> Result<Self, ConfigError> {
        Self::new(did, SigningKey::from_config_str(signing_key)?)
    }
}

impl std::fmt::Debug for LabelerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelerConfig")
            .field("did", &self.did)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}
