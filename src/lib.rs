// ABOUTME: Streaming MessagePack encoder/decoder for Rust.
// ABOUTME: Provides a pull-based token decoder, a compact encoder, and serde integration.

//! # serde_msgpack
//!
//! A streaming MessagePack decoder and encoder.
//!
//! The decoder reads one token at a time from a [`ByteSource`] and tracks open
//! arrays and maps on an explicit stack, so nesting depth never grows the call
//! stack. It offers typed reads, peeking, skipping whole subtrees, and building
//! a generic [`Value`] tree. Partial input is supported: over a [`FeedSource`],
//! a read that runs out of bytes returns [`Error::WouldBlock`] and can be
//! repeated after more input arrives.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_msgpack::{to_vec, from_slice};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Sample {
//!     sensor: String,
//!     readings: Vec<i16>,
//! }
//!
//! let sample = Sample {
//!     sensor: "t0".to_string(),
//!     readings: vec![21, -3, 400],
//! };
//!
//! let bytes = to_vec(&sample).unwrap();
//! assert_eq!(bytes[0], 0x82); // fixmap with two entries
//! let back: Sample = from_slice(&bytes).unwrap();
//! assert_eq!(back, sample);
//! ```
//!
//! ## Streaming reads
//!
//! ```rust
//! use serde_msgpack::Decoder;
//!
//! // {"a": [1, 2]}
//! let bytes = [0x81, 0xa1, b'a', 0x92, 0x01, 0x02];
//! let mut decoder = Decoder::from_slice(&bytes);
//!
//! assert_eq!(decoder.read_map_begin().unwrap(), 1);
//! assert_eq!(decoder.read_string().unwrap(), "a");
//! assert_eq!(decoder.read_array_begin().unwrap(), 2);
//! assert_eq!(decoder.read_int().unwrap(), 1);
//! // Lenient end skips the unread element
//! decoder.read_array_end(false).unwrap();
//! decoder.read_map_end(true).unwrap();
//! decoder.finish().unwrap();
//! ```
//!
//! ## Working with Dynamic Values
//!
//! ```rust
//! use serde_msgpack::{msgpack, encode_value, decode_value};
//!
//! let value = msgpack!({
//!     "name": "test",
//!     "values": [1, 2, 3],
//!     "active": true
//! });
//!
//! let bytes = encode_value(&value).unwrap();
//! assert_eq!(decode_value(&bytes).unwrap(), value);
//! ```
//!
//! ## Resource Limits
//!
//! By default only the format itself bounds the input: lengths and counts up
//! to 2^31 - 1 and unbounded nesting. Lower the limits in [`DecoderConfig`]
//! when decoding untrusted input.

pub mod builder;
pub mod de;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod io;
pub mod reader;
pub mod ser;
pub mod stack;
pub mod template;
pub mod types;
pub mod value;
pub mod visitor;

// Re-export commonly used items at the crate root
pub use builder::ValueBuilder;
pub use de::{from_reader, from_slice, from_slice_with_config, Deserializer};
pub use decoder::{Decoder, DecoderConfig};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use io::{ByteSource, FeedSource, ReaderSource, SliceSource};
pub use reader::ValueReader;
pub use ser::Serializer;
pub use template::Template;
pub use types::{limits, tag, Token, TokenKind};
pub use value::Value;
pub use visitor::{IgnoreVisitor, TokenVisitor};

// The msgpack! macro is automatically exported at crate root via #[macro_export]

use serde::{Deserialize, Serialize};
use std::io::Write;

/// Serialize a value to a MessagePack byte vector.
///
/// # Example
///
/// ```rust
/// use serde_msgpack::to_vec;
///
/// let bytes = to_vec(&42i32).unwrap();
/// assert_eq!(bytes, vec![0x2a]); // positive fixint 42
/// ```
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    to_writer(&mut buf, value)?;
    Ok(buf)
}

/// Serialize a value to a writer.
///
/// # Example
///
/// ```rust
/// use serde_msgpack::to_writer;
///
/// let mut buf = Vec::new();
/// to_writer(&mut buf, &"hello").unwrap();
/// assert_eq!(buf[0], 0xa5);
/// ```
pub fn to_writer<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    let mut encoder = Encoder::new(writer);
    {
        let mut serializer = Serializer::new(&mut encoder);
        value.serialize(&mut serializer)?;
    }
    encoder.finish()?.flush()?;
    Ok(())
}

/// Decode exactly one MessagePack value into a `Value`.
///
/// # Example
///
/// ```rust
/// use serde_msgpack::{decode_value, Value};
///
/// let value = decode_value(&[0x93, 0x01, 0x02, 0x03]).unwrap();
/// assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
/// ```
pub fn decode_value(data: &[u8]) -> Result<Value> {
    decode_value_with_config(data, DecoderConfig::default())
}

/// Decode exactly one MessagePack value into a `Value` with custom configuration.
pub fn decode_value_with_config(data: &[u8], config: DecoderConfig) -> Result<Value> {
    let mut decoder = Decoder::with_config(SliceSource::new(data), config);
    let value = decoder.read_value()?;
    decoder.finish()?;
    Ok(value)
}

/// Encode a `Value` to a byte vector.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to_writer(&mut buf, value)?;
    Ok(buf)
}

/// Encode a `Value` to a writer.
pub fn encode_value_to_writer<W: Write>(writer: W, value: &Value) -> Result<()> {
    let mut encoder = Encoder::new(writer);
    encoder.write_value(value)?;
    encoder.finish()?.flush()?;
    Ok(())
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float32(f) => serializer.serialize_f32(*f),
            Value::Float64(f) => serializer.serialize_f64(*f),
            // Text reads better in other formats; msgpack output is identical either way
            Value::Raw(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => serializer.serialize_str(s),
                Err(_) => serializer.serialize_bytes(bytes),
            },
            Value::Array(arr) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for item in arr {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                use serde::ser::SerializeMap;
                let mut m = serializer.serialize_map(Some(entries.len()))?;
                for (key, val) in entries {
                    m.serialize_entry(key, val)?;
                }
                m.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> serde::de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "any valid MessagePack value")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
                Ok(Value::Int(v))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E> {
                Ok(Value::UInt(v))
            }

            fn visit_f32<E>(self, v: f32) -> std::result::Result<Value, E> {
                Ok(Value::Float32(v))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float64(v))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
                Ok(Value::Raw(v.as_bytes().to_vec()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
                Ok(Value::Raw(v.into_bytes()))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::Raw(v.to_vec()))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::Raw(v))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Nil)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Nil)
            }

            fn visit_some<D: serde::Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Value, D::Error> {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut arr = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
                while let Some(elem) = seq.next_element()? {
                    arr.push(elem);
                }
                Ok(Value::Array(arr))
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0).min(1024));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Value::Map(entries))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_use_compact_forms() {
        assert_eq!(to_vec(&42i32).unwrap(), vec![0x2a]);
        assert_eq!(to_vec(&-1i64).unwrap(), vec![0xff]);
        assert_eq!(to_vec(&300u16).unwrap(), vec![0xcd, 0x01, 0x2c]);
        assert_eq!(to_vec("hi").unwrap(), vec![0xa2, b'h', b'i']);
        assert_eq!(to_vec(&()).unwrap(), vec![0xc0]);

        assert_eq!(from_slice::<i32>(&[0x2a]).unwrap(), 42);
        assert_eq!(from_slice::<String>(&[0xa2, b'h', b'i']).unwrap(), "hi");
        assert!(from_slice::<bool>(&[0xc3]).unwrap());
        assert_eq!(from_slice::<f64>(&to_vec(&-1.5f64).unwrap()).unwrap(), -1.5);
    }

    #[test]
    fn test_nested_sequences() {
        let original = vec![vec![1u8, 2], vec![], vec![3]];
        let bytes = to_vec(&original).unwrap();
        assert_eq!(bytes, vec![0x93, 0x92, 0x01, 0x02, 0x90, 0x91, 0x03]);
        let decoded: Vec<Vec<u8>> = from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_struct_is_a_map() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Entry {
            key: String,
            hits: u32,
            stale: bool,
            alias: Option<String>,
        }

        let entry = Entry {
            key: "k1".to_string(),
            hits: 7,
            stale: false,
            alias: None,
        };

        let bytes = to_vec(&entry).unwrap();
        assert_eq!(bytes[0], 0x84);
        let decoded: Entry = from_slice(&bytes).unwrap();
        assert_eq!(decoded, entry);

        let tree = decode_value(&bytes).unwrap();
        assert_eq!(tree.get_key("hits"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_value_roundtrip() {
        let value = msgpack!({
            "name": "test",
            "values": [1, (-200), 70000],
            "nested": {
                "flag": true,
                "nothing": nil
            }
        });

        let bytes = encode_value(&value).unwrap();
        assert_eq!(decode_value(&bytes).unwrap(), value);
    }

    #[test]
    fn test_value_through_serde() {
        let value = msgpack!([1, "two", { "three": 3.5 }]);
        let bytes = to_vec(&value).unwrap();
        assert_eq!(bytes, encode_value(&value).unwrap());
        let decoded: Value = from_slice(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_value_to_json() {
        let value = msgpack!({ "k": [true, nil] });
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"k":[true,null]}"#);
    }

    #[test]
    fn test_decode_value_rejects_trailing() {
        assert_eq!(decode_value(&[0x01, 0x02]), Err(Error::TrailingBytes));
    }
}
