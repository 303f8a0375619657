// ABOUTME: Callback interface the decoder dispatches each decoded token into.
// ABOUTME: Swapping the visitor turns the same dispatch into skipping or tree building.

use crate::error::{Error, Result};

/// Receives tokens from [`Decoder::decode_one`](crate::Decoder::decode_one).
///
/// Every method defaults to `Error::TypeMismatch`, so a visitor only accepts the
/// token kinds it implements. A rejected token is left in the stream: the next
/// read starts from it, and it is not counted against its container.
pub trait TokenVisitor {
    fn accept_nil(&mut self) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_bool(&mut self, _value: bool) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_int(&mut self, _value: i64) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_uint(&mut self, _value: u64) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_f32(&mut self, _value: f32) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_f64(&mut self, _value: f64) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_raw(&mut self, _value: &[u8]) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    /// A non-empty array header. Its elements follow as separate tokens.
    fn accept_array(&mut self, _count: u32) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    /// A non-empty map header. Its keys and values follow as separate tokens.
    fn accept_map(&mut self, _pair_count: u32) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_empty_array(&mut self) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    fn accept_empty_map(&mut self) -> Result<()> {
        Err(Error::TypeMismatch)
    }

    /// The innermost non-empty container has received all of its children.
    fn close_container(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Accepts every token and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreVisitor;

impl TokenVisitor for IgnoreVisitor {
    fn accept_nil(&mut self) -> Result<()> {
        Ok(())
    }

    fn accept_bool(&mut self, _value: bool) -> Result<()> {
        Ok(())
    }

    fn accept_int(&mut self, _value: i64) -> Result<()> {
        Ok(())
    }

    fn accept_uint(&mut self, _value: u64) -> Result<()> {
        Ok(())
    }

    fn accept_f32(&mut self, _value: f32) -> Result<()> {
        Ok(())
    }

    fn accept_f64(&mut self, _value: f64) -> Result<()> {
        Ok(())
    }

    fn accept_raw(&mut self, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn accept_array(&mut self, _count: u32) -> Result<()> {
        Ok(())
    }

    fn accept_map(&mut self, _pair_count: u32) -> Result<()> {
        Ok(())
    }

    fn accept_empty_array(&mut self) -> Result<()> {
        Ok(())
    }

    fn accept_empty_map(&mut self) -> Result<()> {
        Ok(())
    }
}
