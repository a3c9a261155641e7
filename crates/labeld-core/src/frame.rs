//! Wire framing for the label subscription stream.
//!
//! A frame is the concatenation of two canonically encoded CBOR objects:
//! a header and a body. The header carries `op` (1 = message, -1 = error)
//! and, for messages, the message type tag `t`.

use ciborium::value::Value;

use crate::canonical::{self, decode_prefix, encode_value};
use crate::error::{CoreError, Result};
use crate::label::{Label, StoredLabel};

/// Message type tag for label messages.
pub const LABELS_TYPE: &str = "#labels";

/// A decoded stream frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `{op: 1, t: <type>}` header followed by a payload body.
    Message { t: String, body: Value },
    /// `{op: -1}` header followed by `{error, message}`.
    Error { error: String, message: String },
}

impl Frame {
    /// Build a `#labels` message frame carrying one sequenced label.
    pub fn labels(seq: i64, labels: &[Label]) -> Self {
        let body = canonical::map(vec![
            ("seq", Value::Integer(seq.into())),
            (
                "labels",
                Value::Array(labels.iter().map(Label::to_cbor_value).collect()),
            ),
        ]);
        Frame::Message {
            t: LABELS_TYPE.to_string(),
            body,
        }
    }

    /// Build a `#labels` frame from a stored label.
    pub fn from_stored(stored: &StoredLabel) -> Self {
        Self::labels(stored.id, std::slice::from_ref(&stored.label))
    }

    /// Build an error frame.
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Frame::Error {
            error: kind.to_string(),
            message: message.into(),
        }
    }

    /// Encode as header ++ body bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (header, body) = match self {
            Frame::Message { t, body } => (
                canonical::map(vec![
                    ("op", Value::Integer(1.into())),
                    ("t", Value::Text(t.clone())),
                ]),
                body.clone(),
            ),
            Frame::Error { error, message } => (
                canonical::map(vec![("op", Value::Integer((-1).into()))]),
                canonical::map(vec![
                    ("error", Value::Text(error.clone())),
                    ("message", Value::Text(message.clone())),
                ]),
            ),
        };

        let mut buf = encode_value(&header)?;
        buf.extend_from_slice(&encode_value(&body)?);
        Ok(buf)
    }

    /// Decode a frame from wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        let (header, header_len) = decode_prefix(bytes)?;
        let (body, _) = decode_prefix(&bytes[header_len..])?;

        let op = map_get(&header, "op")
            .and_then(as_i64)
            .ok_or_else(|| CoreError::MalformedFrame("header missing op".into()))?;

        match op {
            1 => {
                let t = map_get(&header, "t")
                    .and_then(as_text)
                    .ok_or_else(|| CoreError::MalformedFrame("message header missing t".into()))?;
                Ok(Frame::Message { t, body })
            }
            -1 => {
                let error = map_get(&body, "error").and_then(as_text).unwrap_or_default();
                let message = map_get(&body, "message").and_then(as_text).unwrap_or_default();
                Ok(Frame::Error { error, message })
            }
            other => Err(CoreError::MalformedFrame(format!("unknown op {other}"))),
        }
    }
}

fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Text(t) if t == key))
            .map(|(_, v)| v),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => i64::try_from(i128::from(*i)).ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(t) => Some(t.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelDraft;

    fn stored() -> StoredLabel {
        let mut label = LabelDraft::new("did:plc:bbb", "spam").into_label("did:plc:aaa");
        let key = crate::crypto::SigningKey::from_bytes(&[0x11; 32]).unwrap();
        label.sign(&key).unwrap();
        StoredLabel { id: 1, label }
    }

    #[test]
    fn labels_frame_roundtrip() {
        let frame = Frame::from_stored(&stored());
        let bytes = frame.encode().unwrap();
        let decoded = Frame::decode(&bytes).unwrap();

        match decoded {
            Frame::Message { t, body } => {
                assert_eq!(t, LABELS_TYPE);
                assert_eq!(map_get(&body, "seq").and_then(as_i64), Some(1));
                let labels = map_get(&body, "labels").unwrap();
                assert!(matches!(labels, Value::Array(a) if a.len() == 1));
            }
            other => panic!("expected message frame, got {other:?}"),
        }
    }

    #[test]
    fn error_frame_roundtrip() {
        let frame = Frame::error("FutureCursor", "cursor 99 is ahead of the log");
        let bytes = frame.encode().unwrap();
        assert_eq!(
            Frame::decode(&bytes).unwrap(),
            Frame::Error {
                error: "FutureCursor".into(),
                message: "cursor 99 is ahead of the log".into(),
            }
        );
    }

    #[test]
    fn message_header_bytes() {
        let frame = Frame::labels(1, &[]);
        let bytes = frame.encode().unwrap();

        // {op: 1, t: "#labels"} — "t" (0x61 …) sorts before "op" (0x62 …)
        // under encoded-byte key ordering.
        assert_eq!(bytes[0], 0xa2);
        assert_eq!(&bytes[1..3], &[0x61, b't']);
        assert_eq!(&bytes[3..11], &[0x67, b'#', b'l', b'a', b'b', b'e', b'l', b's']);
        assert_eq!(&bytes[11..14], &[0x62, b'o', b'p']);
        assert_eq!(bytes[14], 0x01);
    }

    #[test]
    fn truncated_frame_rejected() {
        let frame = Frame::from_stored(&stored());
        let bytes = frame.encode().unwrap();
        assert!(Frame::decode(&bytes[..3]).is_err());
    }
}
