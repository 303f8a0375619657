// ABOUTME: MessagePack encoder writing the smallest tag family that fits each value.
// ABOUTME: Optionally validates that every header is followed by its declared children.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::stack::ContainerStack;
use crate::types::{limits, tag};
use crate::value::Value;
use std::io::Write;
use tracing::debug;

/// A MessagePack encoder that writes to any [`std::io::Write`].
///
/// Container headers carry their child count up front. By default the caller
/// is trusted to follow each header with exactly that many children (keys and
/// values counted separately for maps). [`Encoder::validating`] creates an
/// encoder that checks this and reports violations.
pub struct Encoder<W: Write> {
    writer: W,
    /// Child accounting, present only in validating mode
    stack: Option<ContainerStack>,
}

impl<W: Write> Encoder<W> {
    /// Create a new encoder that writes to the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer, stack: None }
    }

    /// Create an encoder that checks child counts against container headers.
    pub fn validating(writer: W) -> Self {
        Self {
            writer,
            stack: Some(ContainerStack::new()),
        }
    }

    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.stack.is_some()
    }

    /// Open containers still expecting children (always 0 when not validating).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.as_ref().map_or(0, ContainerStack::depth)
    }

    /// Consume the encoder and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Finish encoding. A validating encoder fails with `IncompleteContainer`
    /// if any header has not received all of its children.
    pub fn finish(self) -> Result<W> {
        if let Some(stack) = &self.stack {
            if !stack.is_empty() {
                debug!(
                    depth = stack.depth(),
                    remaining = stack.top_remaining(),
                    "encoder finished with open containers"
                );
                return Err(Error::IncompleteContainer);
            }
        }
        Ok(self.writer)
    }

    // -------------------------------------------------------------------------
    // Child accounting
    // -------------------------------------------------------------------------

    /// Reject a value that would exceed the innermost header's count.
    #[inline]
    fn check_slot(&self) -> Result<()> {
        match &self.stack {
            Some(stack) => stack.check_count(),
            None => Ok(()),
        }
    }

    /// Count one complete value and close every container it completes.
    #[inline]
    fn complete_value(&mut self) -> Result<()> {
        if let Some(stack) = self.stack.as_mut() {
            stack.reduce_count();
            while !stack.is_empty() && stack.top_remaining() == 0 {
                stack.pop()?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Raw output
    // -------------------------------------------------------------------------

    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.writer.write_all(&[byte])?;
        Ok(())
    }

    #[inline]
    fn write_tagged<const N: usize>(&mut self, tag: u8, payload: [u8; N]) -> Result<()> {
        self.writer.write_all(&[tag])?;
        self.writer.write_all(&payload)?;
        Ok(())
    }

    /// Write a fix / 16-bit / 32-bit header for a length or count.
    fn write_sized_header(&mut self, len: usize, fix: u8, fix_max: usize, tag16: u8, tag32: u8) -> Result<()> {
        if len > limits::FORMAT_MAX_LEN {
            return Err(Error::SizeError);
        }
        if len <= fix_max {
            self.write_byte(fix | len as u8)
        } else if len <= usize::from(u16::MAX) {
            self.write_tagged(tag16, (len as u16).to_be_bytes())
        } else {
            self.write_tagged(tag32, (len as u32).to_be_bytes())
        }
    }

    fn write_unsigned(&mut self, value: u64) -> Result<()> {
        if value <= u64::from(tag::POSITIVE_FIXINT_MAX) {
            self.write_byte(value as u8)
        } else if value <= u64::from(u8::MAX) {
            self.write_tagged(tag::UINT8, [value as u8])
        } else if value <= u64::from(u16::MAX) {
            self.write_tagged(tag::UINT16, (value as u16).to_be_bytes())
        } else if value <= u64::from(u32::MAX) {
            self.write_tagged(tag::UINT32, (value as u32).to_be_bytes())
        } else {
            self.write_tagged(tag::UINT64, value.to_be_bytes())
        }
    }

    fn write_signed(&mut self, value: i64) -> Result<()> {
        if value >= 0 {
            return self.write_unsigned(value as u64);
        }
        if value >= -32 {
            // Negative fixint: the two's complement byte is the tag itself
            self.write_byte(value as u8)
        } else if value >= i64::from(i8::MIN) {
            self.write_tagged(tag::INT8, (value as i8).to_be_bytes())
        } else if value >= i64::from(i16::MIN) {
            self.write_tagged(tag::INT16, (value as i16).to_be_bytes())
        } else if value >= i64::from(i32::MIN) {
            self.write_tagged(tag::INT32, (value as i32).to_be_bytes())
        } else {
            self.write_tagged(tag::INT64, value.to_be_bytes())
        }
    }

    // -------------------------------------------------------------------------
    // Scalars
    // -------------------------------------------------------------------------

    pub fn write_nil(&mut self) -> Result<()> {
        self.check_slot()?;
        self.write_byte(tag::NIL)?;
        self.complete_value()
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.check_slot()?;
        self.write_byte(if value { tag::TRUE } else { tag::FALSE })?;
        self.complete_value()
    }

    /// Encode a signed integer in the smallest form that holds it.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.check_slot()?;
        self.write_signed(value)?;
        self.complete_value()
    }

    /// Encode an unsigned integer in the smallest form that holds it.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.check_slot()?;
        self.write_unsigned(value)?;
        self.complete_value()
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_i64(i64::from(value))
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_u64(u64::from(value))
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_u64(u64::from(value))
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u64(u64::from(value))
    }

    /// Encode an arbitrary-width integer. Values outside `i64::MIN..=u64::MAX`
    /// have no wire form and fail with `Overflow`.
    pub fn write_big_int(&mut self, value: i128) -> Result<()> {
        if value >= 0 {
            self.write_u64(u64::try_from(value).map_err(|_| Error::Overflow)?)
        } else {
            self.write_i64(i64::try_from(value).map_err(|_| Error::Overflow)?)
        }
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.check_slot()?;
        self.write_tagged(tag::FLOAT32, value.to_be_bytes())?;
        self.complete_value()
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.check_slot()?;
        self.write_tagged(tag::FLOAT64, value.to_be_bytes())?;
        self.complete_value()
    }

    /// Encode a blob: fixraw up to 31 bytes, then raw16, then raw32.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.check_slot()?;
        self.write_sized_header(value.len(), tag::FIXRAW, tag::FIXRAW_MAX_LEN, tag::RAW16, tag::RAW32)?;
        self.writer.write_all(value)?;
        self.complete_value()
    }

    /// Encode a string as a blob of its UTF-8 bytes.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    // -------------------------------------------------------------------------
    // Containers
    // -------------------------------------------------------------------------

    /// Write an array header. Exactly `count` values must follow.
    pub fn write_array_header(&mut self, count: usize) -> Result<()> {
        self.check_slot()?;
        self.write_sized_header(count, tag::FIXARRAY, tag::FIXARRAY_MAX_LEN, tag::ARRAY16, tag::ARRAY32)?;
        match self.stack.as_mut() {
            Some(stack) if count > 0 => {
                stack.push_array(count as u32);
                Ok(())
            }
            _ => self.complete_value(),
        }
    }

    /// Write a map header. Exactly `pair_count` keys and as many values must
    /// follow, alternating.
    pub fn write_map_header(&mut self, pair_count: usize) -> Result<()> {
        self.check_slot()?;
        self.write_sized_header(pair_count, tag::FIXMAP, tag::FIXMAP_MAX_LEN, tag::MAP16, tag::MAP32)?;
        match self.stack.as_mut() {
            Some(stack) if pair_count > 0 => {
                stack.push_map(pair_count as u32);
                Ok(())
            }
            _ => self.complete_value(),
        }
    }

    /// Encode a whole [`Value`] tree. Nesting is walked with an explicit work
    /// list, so deep trees do not grow the call stack.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        let mut work = vec![value];
        while let Some(v) = work.pop() {
            match v {
                Value::Nil => self.write_nil()?,
                Value::Bool(b) => self.write_bool(*b)?,
                Value::Int(n) => self.write_i64(*n)?,
                Value::UInt(n) => self.write_u64(*n)?,
                Value::Float32(f) => self.write_f32(*f)?,
                Value::Float64(f) => self.write_f64(*f)?,
                Value::Raw(bytes) => self.write_bytes(bytes)?,
                Value::Array(items) => {
                    self.write_array_header(items.len())?;
                    work.extend(items.iter().rev());
                }
                Value::Map(entries) => {
                    self.write_map_header(entries.len())?;
                    for (key, val) in entries.iter().rev() {
                        work.push(val);
                        work.push(key);
                    }
                }
            }
        }
        Ok(())
    }
}
