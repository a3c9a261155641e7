//! Cryptographic primitives for the labeler.
//!
//! The labeler signs with secp256k1 (ECDSA over SHA-256, low-S, compact
//! 64-byte signatures). Issuer keys found in DID documents may be either
//! secp256k1 or P-256; both are handled behind [`PublicKey`].

use k256::ecdsa::signature::{Signer, Verifier};
use std::fmt;

use crate::error::{CoreError, Result};

/// Multicodec prefix for a compressed secp256k1 public key.
pub const MULTICODEC_SECP256K1: [u8; 2] = [0xe7, 0x01];

/// Multicodec prefix for a compressed P-256 public key.
pub const MULTICODEC_P256: [u8; 2] = [0x80, 0x24];

/// A 64-byte compact ECDSA signature (r || s).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Sig(pub [u8; 64]);

impl Sig {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from an arbitrary byte slice (must be exactly 64 bytes).
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CoreError::Decoding(format!("signature must be 64 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sig {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The labeler's secp256k1 signing key.
///
/// Owned by the sequencer; never serialized back out.
#[derive(Clone)]
pub struct SigningKey {
    inner: k256::ecdsa::SigningKey,
}

impl SigningKey {
    /// Create from 32 raw secret-key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = k256::ecdsa::SigningKey::from_bytes(bytes.into())
            .map_err(|e| CoreError::InvalidSigningKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parse the configured key string: 64 hex chars or base64 of 32 bytes.
    ///
    /// A `did:key:` string is a *public* key and is rejected outright so a
    /// misconfigured deployment fails at startup with a clear message.
    pub fn from_config_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with("did:key:") {
            return Err(CoreError::SigningKeyIsPublic);
        }

        let bytes = if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            hex::decode(s).map_err(|e| CoreError::InvalidSigningKey(e.to_string()))?
        } else {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|_| {
                    CoreError::InvalidSigningKey("expected 32 bytes as hex or base64".into())
                })?
        };

        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::InvalidSigningKey(format!("key must be 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_bytes(&arr)
    }

    /// Sign a message: ECDSA over SHA-256 with low-S normalization.
    pub fn sign(&self, message: &[u8]) -> Sig {
        let sig: k256::ecdsa::Signature = self.inner.sign(message);
        let sig = sig.normalize_s().unwrap_or(sig);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&sig.to_bytes());
        Sig(bytes)
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::Secp256k1(*self.inner.verifying_key())
    }

    /// The public key as a `did:key:z…` identifier.
    pub fn did_key(&self) -> String {
        self.public_key().to_did_key()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey({})", self.did_key())
    }
}

/// A verification key from either supported curve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Secp256k1(k256::ecdsa::VerifyingKey),
    P256(p256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Parse a `did:key:z…` identifier.
    pub fn from_did_key(did: &str) -> Result<Self> {
        let multibase = did
            .strip_prefix("did:key:")
            .ok_or_else(|| CoreError::MalformedDidKey(format!("missing did:key prefix: {did}")))?;
        Self::from_multibase(multibase)
    }

    /// Parse a multibase-encoded multicodec public key (`z…`, base58btc).
    pub fn from_multibase(multibase: &str) -> Result<Self> {
        let encoded = multibase
            .strip_prefix('z')
            .ok_or_else(|| CoreError::MalformedDidKey("expected base58btc ('z') multibase".into()))?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CoreError::MalformedDidKey(e.to_string()))?;
        if bytes.len() < 2 {
            return Err(CoreError::MalformedDidKey("truncated multicodec key".into()));
        }

        let (prefix, point) = bytes.split_at(2);
        match [prefix[0], prefix[1]] {
            MULTICODEC_SECP256K1 => {
                let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                    .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;
                Ok(Self::Secp256k1(key))
            }
            MULTICODEC_P256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                    .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;
                Ok(Self::P256(key))
            }
            other => Err(CoreError::UnsupportedKeyType(format!(
                "unknown multicodec prefix 0x{}",
                hex::encode(other)
            ))),
        }
    }

    /// Encode as a `did:key:z…` identifier (compressed point).
    pub fn to_did_key(&self) -> String {
        let (prefix, point): ([u8; 2], Vec<u8>) = match self {
            Self::Secp256k1(key) => (MULTICODEC_SECP256K1, key.to_sec1_bytes().to_vec()),
            Self::P256(key) => (MULTICODEC_P256, key.to_sec1_bytes().to_vec()),
        };
        let mut bytes = Vec::with_capacity(2 + point.len());
        bytes.extend_from_slice(&prefix);
        bytes.extend_from_slice(&point);
        format!("did:key:z{}", bs58::encode(bytes).into_string())
    }

    /// Verify an ECDSA-SHA256 signature over `message`.
    ///
    /// Accepts both low-S and high-S encodings for interop: the signature is
    /// normalized before verification.
    pub fn verify(&self, message: &[u8], sig: &[u8]) -> Result<()> {
        match self {
            Self::Secp256k1(key) => {
                let sig = k256::ecdsa::Signature::from_slice(sig)
                    .map_err(|_| CoreError::InvalidSignature)?;
                let sig = sig.normalize_s().unwrap_or(sig);
                key.verify(message, &sig).map_err(|_| CoreError::InvalidSignature)
            }
            Self::P256(key) => {
                let sig = p256::ecdsa::Signature::from_slice(sig)
                    .map_err(|_| CoreError::InvalidSignature)?;
                let sig = sig.normalize_s().unwrap_or(sig);
                key.verify(message, &sig).map_err(|_| CoreError::InvalidSignature)
            }
        }
    }
}

/// Validate a `publicKeyMultibase` value and re-emit it as a `did:key`.
///
/// Used by the DID-document resolver, which receives bare multibase strings.
pub fn did_key_from_multibase(multibase: &str) -> Result<String> {
    Ok(PublicKey::from_multibase(multibase)?.to_did_key())
}
