// ABOUTME: Serde Deserializer implementation for MessagePack decoding.
// ABOUTME: Allows MessagePack bytes to be decoded into any serde-deserializable Rust type.

use crate::decoder::{Decoder, DecoderConfig};
use crate::error::{Error, Result};
use crate::io::{ByteSource, ReaderSource, SliceSource};
use crate::types::TokenKind;
use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use std::io::Read;

/// A serde Deserializer that reads MessagePack from any [`ByteSource`].
///
/// Blobs are copied out of the source, so decoded types never borrow from the
/// input; strings and bytes arrive through `visit_string` and `visit_byte_buf`.
pub struct Deserializer<S: ByteSource> {
    decoder: Decoder<S>,
}

impl<S: ByteSource> Deserializer<S> {
    /// Wrap an existing decoder.
    pub fn new(decoder: Decoder<S>) -> Self {
        Self { decoder }
    }

    /// Check that the input held exactly one complete value.
    pub fn end(&mut self) -> Result<()> {
        self.decoder.finish()
    }

    /// Get the underlying decoder (consumes self).
    pub fn into_decoder(self) -> Decoder<S> {
        self.decoder
    }
}

impl<'a> Deserializer<SliceSource<'a>> {
    /// Create a new Deserializer from a byte slice.
    #[must_use]
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(Decoder::from_slice(data))
    }

    /// Create a new Deserializer with custom configuration.
    #[must_use]
    pub fn from_slice_with_config(data: &'a [u8], config: DecoderConfig) -> Self {
        Self::new(Decoder::with_config(SliceSource::new(data), config))
    }
}

impl<R: Read> Deserializer<ReaderSource<R>> {
    /// Create a new Deserializer from a blocking reader.
    pub fn from_reader(reader: R) -> Self {
        Self::new(Decoder::from_reader(reader))
    }
}

/// Deserialize a value from a MessagePack byte slice.
///
/// # Errors
///
/// Returns an error if:
/// - The data is malformed or truncated
/// - The data doesn't match the expected type `T`
/// - There are trailing bytes after the value
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let mut de = Deserializer::from_slice(data);
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// Deserialize a value from a MessagePack byte slice with custom configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The data exceeds configured limits
/// - The data is malformed or truncated
/// - The data doesn't match the expected type `T`
/// - There are trailing bytes (unless `allow_trailing_bytes` is set)
pub fn from_slice_with_config<T: DeserializeOwned>(data: &[u8], config: DecoderConfig) -> Result<T> {
    let mut de = Deserializer::from_slice_with_config(data, config);
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// Deserialize one value from a reader, requiring the reader to end after it.
///
/// # Errors
///
/// Returns an error if the reader fails, or for any reason [`from_slice`] would.
pub fn from_reader<R: Read, T: DeserializeOwned>(reader: R) -> Result<T> {
    let mut de = Deserializer::from_reader(reader);
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

impl<S: ByteSource> Deserializer<S> {
    fn visit_array<'de, V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value> {
        let count = self.decoder.read_array_begin()?;
        let value = visitor.visit_seq(SeqDeserializer::new(self, count))?;
        self.decoder.read_array_end(true)?;
        Ok(value)
    }

    fn visit_map<'de, V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value> {
        let count = self.decoder.read_map_begin()?;
        let value = visitor.visit_map(MapDeserializer::new(self, count))?;
        self.decoder.read_map_end(true)?;
        Ok(value)
    }
}

impl<'de, S: ByteSource> de::Deserializer<'de> for &mut Deserializer<S> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decoder.next_kind()? {
            TokenKind::Nil => {
                self.decoder.read_nil()?;
                visitor.visit_unit()
            }
            TokenKind::Bool => visitor.visit_bool(self.decoder.read_boolean()?),
            TokenKind::Int => visitor.visit_i64(self.decoder.read_long()?),
            TokenKind::UInt => visitor.visit_u64(self.decoder.read_u64()?),
            TokenKind::Float32 => visitor.visit_f32(self.decoder.read_float()?),
            TokenKind::Float64 => visitor.visit_f64(self.decoder.read_double()?),
            // Blobs holding UTF-8 are offered as strings, anything else as bytes
            TokenKind::Raw => match String::from_utf8(self.decoder.read_byte_string()?) {
                Ok(s) => visitor.visit_string(s),
                Err(e) => visitor.visit_byte_buf(e.into_bytes()),
            },
            TokenKind::Array => self.visit_array(visitor),
            TokenKind::Map => self.visit_map(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(self.decoder.read_boolean()?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i8(self.decoder.read_byte()?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i16(self.decoder.read_short()?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.decoder.read_int()?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.decoder.read_long()?)
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i128(self.decoder.read_big_int()?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u8(self.decoder.read_u8()?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u16(self.decoder.read_u16()?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.decoder.read_u32()?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.decoder.read_u64()?)
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let n = self.decoder.read_big_int()?;
        visitor.visit_u128(u128::try_from(n).map_err(|_| Error::Overflow)?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.decoder.read_float()?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.decoder.read_double()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.decoder.read_string()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(Error::Custom("expected single character".into())),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_string(self.decoder.read_string()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_string(self.decoder.read_string()?)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_byte_buf(self.decoder.read_byte_string()?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_byte_buf(self.decoder.read_byte_string()?)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.decoder.try_read_nil()? {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.decoder.read_nil()?;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_array(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.visit_array(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.visit_array(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_map(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.visit_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.decoder.next_kind()? {
            // Unit variant: just the name
            TokenKind::Raw => visitor.visit_enum(UnitVariantDeserializer::new(self)),
            // Other variants: a single-pair map from name to payload
            TokenKind::Map => {
                if self.decoder.read_map_begin()? != 1 {
                    return Err(Error::Custom("expected single-entry map for enum".into()));
                }
                let value = visitor.visit_enum(EnumDeserializer::new(self))?;
                self.decoder.read_map_end(true)?;
                Ok(value)
            }
            _ => Err(Error::Custom("expected string or map for enum".into())),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_string(self.decoder.read_string()?)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.decoder.skip()?;
        visitor.visit_unit()
    }
}

struct SeqDeserializer<'a, S: ByteSource> {
    de: &'a mut Deserializer<S>,
    remaining: u32,
}

impl<'a, S: ByteSource> SeqDeserializer<'a, S> {
    fn new(de: &'a mut Deserializer<S>, count: u32) -> Self {
        SeqDeserializer { de, remaining: count }
    }
}

impl<'de, S: ByteSource> SeqAccess<'de> for SeqDeserializer<'_, S> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining as usize)
    }
}

struct MapDeserializer<'a, S: ByteSource> {
    de: &'a mut Deserializer<S>,
    remaining: u32,
}

impl<'a, S: ByteSource> MapDeserializer<'a, S> {
    fn new(de: &'a mut Deserializer<S>, pair_count: u32) -> Self {
        MapDeserializer {
            de,
            remaining: pair_count,
        }
    }
}

impl<'de, S: ByteSource> MapAccess<'de> for MapDeserializer<'_, S> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining as usize)
    }
}

struct UnitVariantDeserializer<'a, S: ByteSource> {
    de: &'a mut Deserializer<S>,
}

impl<'a, S: ByteSource> UnitVariantDeserializer<'a, S> {
    fn new(de: &'a mut Deserializer<S>) -> Self {
        UnitVariantDeserializer { de }
    }
}

impl<'de, S: ByteSource> de::EnumAccess<'de> for UnitVariantDeserializer<'_, S> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'de, S: ByteSource> de::VariantAccess<'de> for UnitVariantDeserializer<'_, S> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }
}

struct EnumDeserializer<'a, S: ByteSource> {
    de: &'a mut Deserializer<S>,
}

impl<'a, S: ByteSource> EnumDeserializer<'a, S> {
    fn new(de: &'a mut Deserializer<S>) -> Self {
        EnumDeserializer { de }
    }
}

impl<'de, S: ByteSource> de::EnumAccess<'de> for EnumDeserializer<'_, S> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'de, S: ByteSource> de::VariantAccess<'de> for EnumDeserializer<'_, S> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        // Tolerate {"Name": nil} for unit variants
        self.de.decoder.read_nil()
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.de.visit_array(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.de.visit_map(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    enum Shape {
        Empty,
        Circle(u8),
        Line(u8, u8),
        Rect { w: u8 },
    }

    #[test]
    fn test_struct_from_map() {
        let bytes = [0x82, 0xa1, b'x', 0x01, 0xa1, b'y', 0xff];
        assert_eq!(from_slice::<Point>(&bytes).unwrap(), Point { x: 1, y: -1 });
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let bytes = [
            0x83, 0xa1, b'x', 0x01, 0xa1, b'z', 0x92, 0x90, 0x80, 0xa1, b'y', 0x02,
        ];
        assert_eq!(from_slice::<Point>(&bytes).unwrap(), Point { x: 1, y: 2 });
    }

    #[test]
    fn test_enum_forms() {
        assert_eq!(from_slice::<Shape>(&[0xa5, b'E', b'm', b'p', b't', b'y']).unwrap(), Shape::Empty);
        assert_eq!(
            from_slice::<Shape>(&[0x81, 0xa6, b'C', b'i', b'r', b'c', b'l', b'e', 0x03]).unwrap(),
            Shape::Circle(3)
        );
        assert_eq!(
            from_slice::<Shape>(&[0x81, 0xa4, b'L', b'i', b'n', b'e', 0x92, 0x01, 0x02]).unwrap(),
            Shape::Line(1, 2)
        );
        assert_eq!(
            from_slice::<Shape>(&[0x81, 0xa4, b'R', b'e', b'c', b't', 0x81, 0xa1, b'w', 0x04]).unwrap(),
            Shape::Rect { w: 4 }
        );
    }

    #[test]
    fn test_option() {
        assert_eq!(from_slice::<Option<u8>>(&[0xc0]).unwrap(), None);
        assert_eq!(from_slice::<Option<u8>>(&[0x07]).unwrap(), Some(7));
    }

    #[test]
    fn test_integer_range_checked() {
        assert_eq!(from_slice::<u8>(&[0xcd, 0x01, 0x00]), Err(Error::Overflow));
        assert_eq!(from_slice::<i8>(&[0xd0, 0x80]).unwrap(), -128);
        assert_eq!(from_slice::<u64>(&[0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(), u64::MAX);
    }

    #[test]
    fn test_tuple_length_must_match() {
        assert_eq!(
            from_slice::<(u8, u8)>(&[0x93, 0x01, 0x02, 0x03]),
            Err(Error::IncompleteContainer)
        );
    }

    #[test]
    fn test_map_with_int_keys() {
        let map: HashMap<u8, bool> = from_slice(&[0x82, 0x01, 0xc3, 0x02, 0xc2]).unwrap();
        assert_eq!(map.get(&1), Some(&true));
        assert_eq!(map.get(&2), Some(&false));
    }

    #[test]
    fn test_from_reader() {
        let bytes: &[u8] = &[0x92, 0xa2, b'h', b'i', 0xa0];
        let v: Vec<String> = from_reader(bytes).unwrap();
        assert_eq!(v, vec!["hi".to_string(), String::new()]);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert_eq!(from_slice::<u8>(&[0x01, 0x02]), Err(Error::TrailingBytes));

        let config = DecoderConfig {
            allow_trailing_bytes: true,
            ..DecoderConfig::default()
        };
        assert_eq!(from_slice_with_config::<u8>(&[0x01, 0x02], config).unwrap(), 1);
    }
}
