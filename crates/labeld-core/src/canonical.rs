//! Canonical CBOR encoding for deterministic serialization.
//!
//! Implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! The canonical encoding is critical: the bytes a label was signed over
//! must be reproducible exactly from its stored fields, on any platform.

use ciborium::value::Value;

use crate::error::{CoreError, Result};

/// Encode a CBOR Value to canonical bytes.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Decode a single CBOR item from the front of `bytes`.
///
/// Returns the value and the number of bytes it occupied. The length is
/// recovered by canonically re-encoding the parsed value, which is exact
/// for anything this crate produced.
pub fn decode_prefix(bytes: &[u8]) -> Result<(Value, usize)> {
    let value: Value = ciborium::from_reader(std::io::Cursor::new(bytes))
        .map_err(|e| CoreError::Decoding(e.to_string()))?;
    let len = encode_value(&value)?.len();
    Ok((value, len))
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => {
            encode_integer(buf, *i);
            Ok(())
        }
        Value::Bytes(b) => {
            encode_bytes(buf, b);
            Ok(())
        }
        Value::Text(s) => {
            encode_text(buf, s);
            Ok(())
        }
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => {
            buf.push(if *b { 0xf5 } else { 0xf4 });
            Ok(())
        }
        Value::Null => {
            buf.push(0xf6);
            Ok(())
        }
        Value::Float(_) => Err(CoreError::Encoding(
            "floats are not allowed in canonical encoding".into(),
        )),
        other => Err(CoreError::Encoding(format!(
            "unsupported CBOR value: {other:?}"
        ))),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type, smallest form.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    // Lexicographic order over encoded key bytes.
    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

/// Convenience: build a map Value from text-keyed entries.
pub fn map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::Text(k.to_string()), v))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_encoding_smallest_form() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 65536);
        assert_eq!(buf, vec![0x1a, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn negative_integer_encoding() {
        let bytes = encode_value(&Value::Integer((-1).into())).unwrap();
        assert_eq!(bytes, vec![0x20]);

        let bytes = encode_value(&Value::Integer((-25).into())).unwrap();
        assert_eq!(bytes, vec![0x38, 24]);
    }

    #[test]
    fn map_keys_sorted_by_encoded_bytes() {
        let value = map(vec![
            ("uri", Value::Integer(2.into())),
            ("cts", Value::Integer(1.into())),
            ("ver", Value::Integer(3.into())),
        ]);
        let bytes = encode_value(&value).unwrap();

        // a3 (map of 3), then keys in order: "cts", "uri", "ver"
        assert_eq!(bytes[0], 0xa3);
        assert_eq!(&bytes[1..5], &[0x63, b'c', b't', b's']);
        assert_eq!(&bytes[6..10], &[0x63, b'u', b'r', b'i']);
        assert_eq!(&bytes[11..15], &[0x63, b'v', b'e', b'r']);
    }

    #[test]
    fn encoding_is_deterministic() {
        let value = map(vec![
            ("val", Value::Text("spam".into())),
            ("neg", Value::Bool(true)),
            ("src", Value::Text("did:plc:aaa".into())),
        ]);
        let b1 = encode_value(&value).unwrap();
        let b2 = encode_value(&value).unwrap();
        assert_eq!(b1, b2);
    }

    #[test]
    fn floats_rejected() {
        assert!(matches!(
            encode_value(&Value::Float(1.5)),
            Err(CoreError::Encoding(_))
        ));
    }

    #[test]
    fn decode_prefix_recovers_length() {
        let header = map(vec![
            ("op", Value::Integer(1.into())),
            ("t", Value::Text("#labels".into())),
        ]);
        let body = map(vec![("seq", Value::Integer(7.into()))]);

        let mut wire = encode_value(&header).unwrap();
        let header_len = wire.len();
        wire.extend_from_slice(&encode_value(&body).unwrap());

        let (decoded, len) = decode_prefix(&wire).unwrap();
        assert_eq!(len, header_len);
        assert_eq!(encode_value(&decoded).unwrap(), wire[..header_len]);
    }
}
