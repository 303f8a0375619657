// ABOUTME: Byte sources consumed by the decoder: slices, blocking readers, and feedable buffers.
// ABOUTME: End of stream is reported distinctly from "no bytes available yet".

use crate::error::{Error, Result};
use std::io::Read;

/// A sequential provider of bytes for the decoder.
///
/// Fixed-width reads are atomic: either every requested byte is consumed or
/// none is. End of stream is `Error::IncompleteInput` for fixed-width reads and
/// `Ok(0)` for [`read_some`](ByteSource::read_some). A source that simply has
/// nothing buffered yet returns `Error::WouldBlock`.
pub trait ByteSource {
    /// Consume a single byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Consume exactly `buf.len()` bytes, or none of them.
    fn read_exact_atomic(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Copy up to `buf.len()` bytes. Returns 0 only at end of stream.
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Returns true once no further bytes will ever be produced.
    fn is_at_end(&mut self) -> Result<bool>;

    /// Read a fixed-size array.
    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]>
    where
        Self: Sized,
    {
        let mut buf = [0u8; N];
        self.read_exact_atomic(&mut buf)?;
        Ok(buf)
    }

    #[inline]
    fn read_u16(&mut self) -> Result<u16>
    where
        Self: Sized,
    {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    #[inline]
    fn read_u32(&mut self) -> Result<u32>
    where
        Self: Sized,
    {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    #[inline]
    fn read_u64(&mut self) -> Result<u64>
    where
        Self: Sized,
    {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    #[inline]
    fn read_f32(&mut self) -> Result<f32>
    where
        Self: Sized,
    {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    #[inline]
    fn read_f64(&mut self) -> Result<f64>
    where
        Self: Sized,
    {
        Ok(f64::from_be_bytes(self.read_array()?))
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    #[inline]
    fn read_exact_atomic(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact_atomic(buf)
    }

    #[inline]
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_some(buf)
    }

    #[inline]
    fn is_at_end(&mut self) -> Result<bool> {
        (**self).is_at_end()
    }
}

/// A source over an in-memory byte slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Get the current position in the input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(Error::IncompleteInput)?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_exact_atomic(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.pos + buf.len();
        if end > self.data.len() {
            return Err(Error::IncompleteInput);
        }
        buf.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    #[inline]
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    #[inline]
    fn is_at_end(&mut self) -> Result<bool> {
        Ok(self.pos >= self.data.len())
    }
}

const READER_BUFFER_SIZE: usize = 8 * 1024;

/// A buffered source over a blocking [`std::io::Read`].
///
/// Reads block inside the wrapped reader; this source never returns
/// `WouldBlock` unless the reader itself does.
pub struct ReaderSource<R: Read> {
    reader: R,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    eof: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: vec![0u8; READER_BUFFER_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            eof: false,
        }
    }

    /// Consume the source and return the underlying reader.
    ///
    /// Bytes already buffered but not yet consumed are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    #[inline]
    fn buffered(&self) -> usize {
        self.end - self.start
    }

    /// Read once from the underlying reader into the free tail of the buffer.
    fn fill_once(&mut self) -> Result<usize> {
        if self.start > 0 && self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
        loop {
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Make sure at least `n` bytes are buffered, compacting first if needed.
    fn ensure(&mut self, n: usize) -> Result<()> {
        if self.buffered() >= n {
            return Ok(());
        }
        if self.start + n > self.buf.len() {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        while self.buffered() < n {
            if self.eof || self.fill_once()? == 0 {
                return Err(Error::IncompleteInput);
            }
        }
        Ok(())
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let byte = self.buf[self.start];
        self.start += 1;
        Ok(byte)
    }

    fn read_exact_atomic(&mut self, out: &mut [u8]) -> Result<()> {
        // Fixed-width fields are at most 8 bytes, well under the buffer size.
        debug_assert!(out.len() <= self.buf.len());
        self.ensure(out.len())?;
        out.copy_from_slice(&self.buf[self.start..self.start + out.len()]);
        self.start += out.len();
        Ok(())
    }

    fn read_some(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if self.buffered() == 0 {
            if self.eof {
                return Ok(0);
            }
            // Large payloads bypass the buffer.
            if out.len() >= self.buf.len() {
                loop {
                    match self.reader.read(out) {
                        Ok(0) => {
                            self.eof = true;
                            return Ok(0);
                        }
                        Ok(n) => return Ok(n),
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            if self.fill_once()? == 0 {
                return Ok(0);
            }
        }
        let n = out.len().min(self.buffered());
        out[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        Ok(n)
    }

    fn is_at_end(&mut self) -> Result<bool> {
        if self.buffered() > 0 {
            return Ok(false);
        }
        if self.eof {
            return Ok(true);
        }
        Ok(self.fill_once()? == 0)
    }
}

/// A source that is fed input incrementally.
///
/// Until [`close`](FeedSource::close) is called, running out of buffered bytes
/// is reported as `Error::WouldBlock`, and the decoder keeps its partial state
/// so the same read can be retried after more input is fed.
#[derive(Debug, Default, Clone)]
pub struct FeedSource {
    buf: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl FeedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the end of the input.
    pub fn feed(&mut self, data: &[u8]) {
        if self.pos > 0 && self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        } else if self.pos > READER_BUFFER_SIZE {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Mark the input as complete; no more bytes will be fed.
    pub fn close(&mut self) {
        self.closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of buffered bytes not yet consumed.
    #[must_use]
    pub fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    fn starved(&self) -> Error {
        if self.closed {
            Error::IncompleteInput
        } else {
            Error::WouldBlock
        }
    }
}

impl ByteSource for FeedSource {
    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.pos).ok_or_else(|| self.starved())?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_exact_atomic(&mut self, out: &mut [u8]) -> Result<()> {
        if self.available() < out.len() {
            return Err(self.starved());
        }
        out.copy_from_slice(&self.buf[self.pos..self.pos + out.len()]);
        self.pos += out.len();
        Ok(())
    }

    fn read_some(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let n = out.len().min(self.available());
        if n == 0 {
            return if self.closed { Ok(0) } else { Err(Error::WouldBlock) };
        }
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn is_at_end(&mut self) -> Result<bool> {
        if self.available() > 0 {
            return Ok(false);
        }
        if self.closed {
            Ok(true)
        } else {
            Err(Error::WouldBlock)
        }
    }
}
