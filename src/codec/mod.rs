//! Value Codec
//!
//! The storage engine treats every value as an opaque byte sequence.
//! This module is the boundary where typed application values become
//! those bytes and back again.
//!
//! ## Wire Format
//!
//! An encoded value is a single tag byte followed by the payload:
//!
//! ```text
//! ┌─────┬──────────────────────────┐
//! │ tag │         payload          │
//! └─────┴──────────────────────────┘
//!   't'   UTF-8 text
//!   'i'   64-bit big-endian integer
//!   'b'   raw bytes
//! ```
//!
//! The engine itself never inspects the tag - it stores and returns the
//! full encoded sequence. Only callers that want a typed view decode.
//!
//! ## Transport Encoding
//!
//! Transport layers that cannot carry raw bytes (JSON bodies, URLs)
//! represent values as base64 text. [`to_base64`] and [`from_base64`]
//! provide that fixed text-safe representation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Tag bytes identifying the payload type of an encoded value.
pub mod tag {
    /// UTF-8 text payload
    pub const TEXT: u8 = b't';
    /// 64-bit big-endian signed integer payload
    pub const INTEGER: u8 = b'i';
    /// Raw binary payload
    pub const BINARY: u8 = b'b';
}

/// Errors that can occur while decoding a value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// The encoded sequence is empty (missing tag byte)
    #[error("empty encoded value")]
    Empty,

    /// Unknown tag byte
    #[error("unknown value tag: {0:#04x}")]
    UnknownTag(u8),

    /// Text payload is not valid UTF-8
    #[error("invalid UTF-8 in text value: {0}")]
    InvalidUtf8(String),

    /// Integer payload is not exactly 8 bytes
    #[error("invalid integer payload length: {0} bytes (expected 8)")]
    InvalidIntegerLength(usize),

    /// Transport representation is not valid base64
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
}

/// A typed application value at the codec boundary.
///
/// The engine never sees this type - callers encode an `AppValue` into
/// opaque bytes before `set` and decode after `get` if they want the
/// typed view back.
#[derive(Debug, Clone, PartialEq)]
pub enum AppValue {
    /// UTF-8 text
    Text(String),
    /// 64-bit signed integer
    Integer(i64),
    /// Arbitrary bytes (serialized payloads, blobs)
    Binary(Bytes),
}

impl AppValue {
    /// Encodes this value into the tagged opaque byte sequence.
    pub fn encode(&self) -> Bytes {
        match self {
            AppValue::Text(s) => {
                let mut buf = BytesMut::with_capacity(1 + s.len());
                buf.put_u8(tag::TEXT);
                buf.put_slice(s.as_bytes());
                buf.freeze()
            }
            AppValue::Integer(n) => {
                let mut buf = BytesMut::with_capacity(9);
                buf.put_u8(tag::INTEGER);
                buf.put_i64(*n);
                buf.freeze()
            }
            AppValue::Binary(b) => {
                let mut buf = BytesMut::with_capacity(1 + b.len());
                buf.put_u8(tag::BINARY);
                buf.put_slice(b);
                buf.freeze()
            }
        }
    }

    /// Decodes a tagged byte sequence back into a typed value.
    pub fn decode(encoded: &[u8]) -> Result<Self, CodecError> {
        let (&tag_byte, payload) = encoded.split_first().ok_or(CodecError::Empty)?;

        match tag_byte {
            tag::TEXT => {
                let text = std::str::from_utf8(payload)
                    .map_err(|e| CodecError::InvalidUtf8(e.to_string()))?;
                Ok(AppValue::Text(text.to_string()))
            }
            tag::INTEGER => {
                let bytes: [u8; 8] = payload
                    .try_into()
                    .map_err(|_| CodecError::InvalidIntegerLength(payload.len()))?;
                Ok(AppValue::Integer(i64::from_be_bytes(bytes)))
            }
            tag::BINARY => Ok(AppValue::Binary(Bytes::copy_from_slice(payload))),
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

/// Encodes raw value bytes as base64 for text-safe transports.
pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decodes a base64 transport representation back into value bytes.
pub fn from_base64(text: &str) -> Result<Bytes, CodecError> {
    BASE64
        .decode(text)
        .map(Bytes::from)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_text() {
        let value = AppValue::Text("hello world".to_string());
        let encoded = value.encode();

        assert_eq!(encoded[0], tag::TEXT);
        assert_eq!(AppValue::decode(&encoded), Ok(value));
    }

    #[test]
    fn test_encode_decode_integer() {
        let value = AppValue::Integer(-42);
        let encoded = value.encode();

        assert_eq!(encoded.len(), 9);
        assert_eq!(encoded[0], tag::INTEGER);
        assert_eq!(AppValue::decode(&encoded), Ok(value));
    }

    #[test]
    fn test_encode_decode_binary() {
        let value = AppValue::Binary(Bytes::from_static(&[0x00, 0xff, 0x7f]));
        let encoded = value.encode();

        assert_eq!(encoded[0], tag::BINARY);
        assert_eq!(AppValue::decode(&encoded), Ok(value));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(AppValue::decode(&[]), Err(CodecError::Empty));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(
            AppValue::decode(&[b'x', 1, 2]),
            Err(CodecError::UnknownTag(b'x'))
        );
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let encoded = [tag::TEXT, 0xff, 0xfe];
        assert!(matches!(
            AppValue::decode(&encoded),
            Err(CodecError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_decode_truncated_integer() {
        let encoded = [tag::INTEGER, 0, 0, 1];
        assert_eq!(
            AppValue::decode(&encoded),
            Err(CodecError::InvalidIntegerLength(3))
        );
    }

    #[test]
    fn test_base64_transport() {
        let raw = b"\x00binary\xffpayload";
        let text = to_base64(raw);
        assert_eq!(from_base64(&text).unwrap(), Bytes::copy_from_slice(raw));
    }

    #[test]
    fn test_base64_invalid() {
        assert!(matches!(
            from_base64("not!!base64??"),
            Err(CodecError::InvalidBase64(_))
        ));
    }
}
