//! Label: the atomic unit of the moderation log.
//!
//! A label is an immutable, signed assertion that a source DID attaches a
//! value to a subject URI. Once stored it is never edited; a retraction is
//! a new label with `neg = true`.

use ciborium::value::Value;
use serde::Deserialize;

use crate::canonical::{self, encode_value};
use crate::crypto::{PublicKey, Sig, SigningKey};
use crate::error::{CoreError, Result};

/// The current label schema version.
pub const LABEL_VERSION: i64 = 1;

/// Maximum length of a label value in bytes.
pub const MAX_VAL_LEN: usize = 128;

/// A signed moderation label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Schema version (always 1).
    pub ver: i64,

    /// DID of the issuer.
    pub src: String,

    /// The subject: an account DID or a record URI.
    pub uri: String,

    /// Optional content hash pinning a specific version of `uri`.
    pub cid: Option<String>,

    /// The label vocabulary identifier (short ASCII).
    pub val: String,

    /// True when this label retracts a prior `(src, uri, val)` assertion.
    pub neg: bool,

    /// ISO-8601 UTC creation timestamp.
    pub cts: String,

    /// Optional ISO-8601 UTC expiry.
    pub exp: Option<String>,

    /// Compact secp256k1 signature over the signable encoding.
    pub sig: Option<Sig>,
}

/// A label plus its position in the append-only log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLabel {
    /// Strictly increasing log id (positive).
    pub id: i64,
    pub label: Label,
}

impl Label {
    /// The signable form: a canonical CBOR map of exactly the populated
    /// non-signature fields. Absent optionals are omitted, never null, and
    /// `neg` appears only when true.
    pub fn signable_bytes(&self) -> Result<Vec<u8>> {
        let mut entries: Vec<(&str, Value)> = vec![
            ("ver", Value::Integer(self.ver.into())),
            ("src", Value::Text(self.src.clone())),
            ("uri", Value::Text(self.uri.clone())),
            ("val", Value::Text(self.val.clone())),
            ("cts", Value::Text(self.cts.clone())),
        ];
        if let Some(cid) = &self.cid {
            entries.push(("cid", Value::Text(cid.clone())));
        }
        if self.neg {
            entries.push(("neg", Value::Bool(true)));
        }
        if let Some(exp) = &self.exp {
            entries.push(("exp", Value::Text(exp.clone())));
        }
        encode_value(&canonical::map(entries))
    }

    /// Sign the label in place with the labeler key.
    pub fn sign(&mut self, key: &SigningKey) -> Result<()> {
        let bytes = self.signable_bytes()?;
        self.sig = Some(key.sign(&bytes));
        Ok(())
    }

    /// Verify the attached signature against `key`.
    pub fn verify(&self, key: &PublicKey) -> Result<()> {
        let sig = self.sig.as_ref().ok_or(CoreError::InvalidSignature)?;
        let bytes = self.signable_bytes()?;
        key.verify(&bytes, sig.as_bytes())
    }

    /// The wire/display form as a CBOR value: all populated fields plus
    /// `sig` as a `{"$bytes": "<base64>"}` wrapper. `neg` is always present
    /// as a boolean here, unlike in the signable form.
    pub fn to_cbor_value(&self) -> Value {
        use base64::Engine as _;

        let mut entries: Vec<(&str, Value)> = vec![
            ("ver", Value::Integer(self.ver.into())),
            ("src", Value::Text(self.src.clone())),
            ("uri", Value::Text(self.uri.clone())),
            ("val", Value::Text(self.val.clone())),
            ("neg", Value::Bool(self.neg)),
            ("cts", Value::Text(self.cts.clone())),
        ];
        if let Some(cid) = &self.cid {
            entries.push(("cid", Value::Text(cid.clone())));
        }
        if let Some(exp) = &self.exp {
            entries.push(("exp", Value::Text(exp.clone())));
        }
        if let Some(sig) = &self.sig {
            let b64 = base64::engine::general_purpose::STANDARD.encode(sig.as_bytes());
            entries.push((
                "sig",
                canonical::map(vec![("$bytes", Value::Text(b64))]),
            ));
        }
        canonical::map(entries)
    }

    /// The wire/display form as JSON, for HTTP responses.
    pub fn to_json(&self) -> serde_json::Value {
        use base64::Engine as _;

        let mut map = serde_json::Map::new();
        map.insert("ver".into(), self.ver.into());
        map.insert("src".into(), self.src.clone().into());
        map.insert("uri".into(), self.uri.clone().into());
        map.insert("val".into(), self.val.clone().into());
        map.insert("neg".into(), self.neg.into());
        map.insert("cts".into(), self.cts.clone().into());
        if let Some(cid) = &self.cid {
            map.insert("cid".into(), cid.clone().into());
        }
        if let Some(exp) = &self.exp {
            map.insert("exp".into(), exp.clone().into());
        }
        if let Some(sig) = &self.sig {
            let b64 = base64::engine::general_purpose::STANDARD.encode(sig.as_bytes());
            map.insert("sig".into(), serde_json::json!({ "$bytes": b64 }));
        }
        serde_json::Value::Object(map)
    }
}

/// An unsigned label as supplied by a caller.
///
/// `src`, `cts`, and the signature are filled in by the sequencer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelDraft {
    pub uri: String,
    pub val: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub neg: Option<bool>,
    #[serde(default)]
    pub cts: Option<String>,
    #[serde(default)]
    pub exp: Option<String>,
}

impl LabelDraft {
    /// Minimal draft for a subject/value pair.
    pub fn new(uri: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            val: val.into(),
            ..Self::default()
        }
    }

    /// Resolve the draft into an unsigned [`Label`], defaulting `src` to the
    /// labeler DID and `cts` to now. Nullish fields are stripped.
    pub fn into_label(self, default_src: &str) -> Label {
        Label {
            ver: LABEL_VERSION,
            src: self.src.unwrap_or_else(|| default_src.to_string()),
            uri: self.uri,
            cid: self.cid.filter(|c| !c.is_empty()),
            val: self.val,
            neg: self.neg.unwrap_or(false),
            cts: self.cts.unwrap_or_else(now_iso8601),
            exp: self.exp.filter(|e| !e.is_empty()),
            sig: None,
        }
    }
}

/// Current time as an ISO-8601 UTC string with millisecond precision.
pub fn now_iso8601() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Validate a label vocabulary value: non-empty ASCII without whitespace,
/// bounded length.
pub fn validate_val(val: &str) -> Result<()> {
    if val.is_empty() {
        return Err(CoreError::InvalidLabel("empty label value".into()));
    }
    if val.len() > MAX_VAL_LEN {
        return Err(CoreError::InvalidLabel(format!(
            "label value exceeds {MAX_VAL_LEN} bytes"
        )));
    }
    if !val.is_ascii() || val.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(CoreError::InvalidLabel(format!(
            "label value must be ASCII without whitespace: {val:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningKey;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[0x11; 32]).unwrap()
    }

    fn minimal_label() -> Label {
        LabelDraft {
            uri: "did:plc:bbb".into(),
            val: "spam".into(),
            cts: Some("1970-01-01T00:00:00.000Z".into()),
            ..LabelDraft::default()
        }
        .into_label("did:plc:aaa")
    }

    #[test]
    fn signable_bytes_deterministic() {
        let label = minimal_label();
        assert_eq!(
            label.signable_bytes().unwrap(),
            label.signable_bytes().unwrap()
        );
    }

    #[test]
    fn signable_bytes_known_prefix() {
        let label = minimal_label();
        let bytes = label.signable_bytes().unwrap();

        // Five populated fields; first canonical key is "cts".
        assert_eq!(bytes[0], 0xa5);
        assert_eq!(&bytes[1..5], &[0x63, b'c', b't', b's']);
    }

    #[test]
    fn neg_false_omitted_from_signable_form() {
        let mut label = minimal_label();
        label.neg = false;
        let without = label.signable_bytes().unwrap();

        label.neg = true;
        let with = label.signable_bytes().unwrap();

        // The negating form gains exactly one map entry.
        assert_eq!(without[0], 0xa5);
        assert_eq!(with[0], 0xa6);
        assert!(!contains_key(&without, b"neg"));
        assert!(contains_key(&with, b"neg"));
    }

    #[test]
    fn absent_optionals_are_omitted_not_null() {
        let label = minimal_label();
        let bytes = label.signable_bytes().unwrap();
        assert!(!contains_key(&bytes, b"cid"));
        assert!(!contains_key(&bytes, b"exp"));
        assert!(!bytes.contains(&0xf6), "no CBOR null expected");
    }

    #[test]
    fn sign_then_verify() {
        let key = test_key();
        let mut label = minimal_label();
        label.sign(&key).unwrap();
        label.verify(&key.public_key()).unwrap();
    }

    #[test]
    fn verify_rejects_tampered_field() {
        let key = test_key();
        let mut label = minimal_label();
        label.sign(&key).unwrap();
        label.val = "not-spam".into();
        assert!(label.verify(&key.public_key()).is_err());
    }

    #[test]
    fn resigning_reproduces_signed_bytes() {
        // Re-encoding a signed label must yield the identical byte string
        // used at signing time.
        let key = test_key();
        let mut label = minimal_label();
        let before = label.signable_bytes().unwrap();
        label.sign(&key).unwrap();
        let after = label.signable_bytes().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn draft_defaults() {
        let label = LabelDraft::new("did:plc:x", "rude").into_label("did:plc:me");
        assert_eq!(label.ver, LABEL_VERSION);
        assert_eq!(label.src, "did:plc:me");
        assert!(!label.neg);
        assert!(label.cts.ends_with('Z'));
        assert!(label.sig.is_none());
    }

    #[test]
    fn draft_src_override_kept() {
        let draft = LabelDraft {
            src: Some("did:plc:other".into()),
            ..LabelDraft::new("did:plc:x", "rude")
        };
        assert_eq!(draft.into_label("did:plc:me").src, "did:plc:other");
    }

    #[test]
    fn json_form_wraps_sig_bytes() {
        let key = test_key();
        let mut label = minimal_label();
        label.sign(&key).unwrap();

        let json = label.to_json();
        assert_eq!(json["ver"], 1);
        assert_eq!(json["neg"], false);
        assert!(json["sig"]["$bytes"].is_string());
        assert!(json.get("cid").is_none());
    }

    #[test]
    fn validate_val_rules() {
        assert!(validate_val("spam").is_ok());
        assert!(validate_val("!hide").is_ok());
        assert!(validate_val("").is_err());
        assert!(validate_val("has space").is_err());
        assert!(validate_val(&"x".repeat(MAX_VAL_LEN + 1)).is_err());
    }

    /// Scan encoded bytes for a 3-byte text key (all label keys are 3 chars).
    fn contains_key(bytes: &[u8], key: &[u8]) -> bool {
        let mut needle = vec![0x63];
        needle.extend_from_slice(key);
        bytes.windows(needle.len()).any(|w| w == needle)
    }
}
