//! Error types for the labeld core.

use thiserror::Error;

/// Core errors that can occur while encoding, signing, or verifying labels.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("signing key is a did:key — that encodes a public key, supply the 32-byte private key as hex or base64")]
    SigningKeyIsPublic,

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("malformed did:key: {0}")]
    MalformedDidKey(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("invalid label: {0}")]
    InvalidLabel(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
