// ABOUTME: Type-mapping contract between Rust types and the encoder/decoder engines.
// ABOUTME: Handles the nil-for-absent convention so implementors only map present values.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::io::ByteSource;
use std::collections::BTreeMap;
use std::io::Write;

/// Maps a Rust type to and from its wire form, without going through serde.
///
/// Absent values are written as nil. A `required` value that is absent is an
/// error on write; a value that is not `required` reads back as `None` when
/// the next token is nil or its container has no children left.
pub trait Template: Sized {
    /// Write a present value.
    fn encode_into<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()>;

    /// Read a present value. `target` may be reused as storage.
    fn decode_from<S: ByteSource>(decoder: &mut Decoder<S>, target: Option<Self>) -> Result<Self>;

    fn write_to<W: Write>(value: Option<&Self>, encoder: &mut Encoder<W>, required: bool) -> Result<()> {
        match value {
            Some(v) => v.encode_into(encoder),
            None if required => Err(Error::TypeMismatch),
            None => encoder.write_nil(),
        }
    }

    fn read_from<S: ByteSource>(
        decoder: &mut Decoder<S>,
        target: Option<Self>,
        required: bool,
    ) -> Result<Option<Self>> {
        if !required && decoder.try_skip_nil()? {
            return Ok(None);
        }
        Self::decode_from(decoder, target).map(Some)
    }
}

impl Template for bool {
    fn encode_into<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_bool(*self)
    }

    fn decode_from<S: ByteSource>(decoder: &mut Decoder<S>, _target: Option<Self>) -> Result<Self> {
        decoder.read_boolean()
    }
}

macro_rules! impl_template_scalar {
    ($($t:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Template for $t {
                fn encode_into<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
                    encoder.$write(*self)
                }

                fn decode_from<S: ByteSource>(decoder: &mut Decoder<S>, _target: Option<Self>) -> Result<Self> {
                    decoder.$read()
                }
            }
        )*
    };
}

impl_template_scalar! {
    i8 => write_i8, read_byte;
    i16 => write_i16, read_short;
    i32 => write_i32, read_int;
    i64 => write_i64, read_long;
    u8 => write_u8, read_u8;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    i128 => write_big_int, read_big_int;
    f32 => write_f32, read_float;
    f64 => write_f64, read_double;
}

/// Characters travel as their integer code point.
///
/// This differs from the serde layer, which writes a `char` as a one-character
/// string. Bytes written by one layer must be read back by the same layer.
impl Template for char {
    fn encode_into<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_u32(u32::from(*self))
    }

    fn decode_from<S: ByteSource>(decoder: &mut Decoder<S>, _target: Option<Self>) -> Result<Self> {
        let code = decoder.read_u32()?;
        char::from_u32(code).ok_or_else(|| Error::Custom(format!("invalid code point: {code:#x}")))
    }
}

impl Template for String {
    fn encode_into<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_str(self)
    }

    fn decode_from<S: ByteSource>(decoder: &mut Decoder<S>, _target: Option<Self>) -> Result<Self> {
        decoder.read_string()
    }
}

impl<T: Template> Template for Vec<T> {
    fn encode_into<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_array_header(self.len())?;
        for item in self {
            item.encode_into(encoder)?;
        }
        Ok(())
    }

    fn decode_from<S: ByteSource>(decoder: &mut Decoder<S>, target: Option<Self>) -> Result<Self> {
        let count = decoder.read_array_begin()?;
        let mut out = target.unwrap_or_default();
        out.clear();
        out.reserve((count as usize).min(1024));
        for _ in 0..count {
            out.push(T::decode_from(decoder, None)?);
        }
        decoder.read_array_end(true)?;
        Ok(out)
    }
}

impl<K: Template + Ord, V: Template> Template for BTreeMap<K, V> {
    fn encode_into<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_map_header(self.len())?;
        for (key, value) in self {
            key.encode_into(encoder)?;
            value.encode_into(encoder)?;
        }
        Ok(())
    }

    fn decode_from<S: ByteSource>(decoder: &mut Decoder<S>, target: Option<Self>) -> Result<Self> {
        let count = decoder.read_map_begin()?;
        let mut out = target.unwrap_or_default();
        out.clear();
        for _ in 0..count {
            let key = K::decode_from(decoder, None)?;
            let value = V::decode_from(decoder, None)?;
            out.insert(key, value);
        }
        decoder.read_map_end(true)?;
        Ok(out)
    }
}
