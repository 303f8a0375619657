// ABOUTME: Streaming MessagePack decoder: one tag byte at a time, explicit container stack.
// ABOUTME: Offers visitor dispatch, typed reads, skipping, and tree materialization.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

use crate::builder::ValueBuilder;
use crate::error::{Error, Result};
use crate::io::{ByteSource, ReaderSource, SliceSource};
use crate::stack::{ContainerStack, FrameKind};
use crate::types::{limits, tag, Token, TokenKind};
use crate::value::Value;
use crate::visitor::{IgnoreVisitor, TokenVisitor};
use std::io::Read;
use tracing::{debug, trace};

/// Validate a blob as UTF-8 and take ownership of it as a `String`.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
fn into_utf8(bytes: Vec<u8>) -> Result<String> {
    simdutf8::basic::from_utf8(&bytes).map_err(|_| Error::InvalidUtf8)?;
    // SAFETY: the bytes were validated as UTF-8 just above.
    Ok(unsafe { String::from_utf8_unchecked(bytes) })
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
fn into_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

/// Configuration options for the decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum container nesting depth
    pub max_depth: usize,
    /// Maximum blob length in bytes
    pub max_raw_length: usize,
    /// Maximum elements (arrays) or pairs (maps) in a container
    pub max_container_size: usize,
    /// Allow bytes after the document in [`Decoder::finish`] (default: false)
    pub allow_trailing_bytes: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: limits::MAX_DEPTH,
            max_raw_length: limits::MAX_RAW_LENGTH,
            max_container_size: limits::MAX_CONTAINER_SIZE,
            allow_trailing_bytes: false,
        }
    }
}

/// A blob payload being copied out of the source.
#[derive(Debug)]
struct RawFill {
    len: usize,
    filled: usize,
    buf: Vec<u8>,
}

impl RawFill {
    fn new(len: usize) -> Self {
        Self {
            len,
            filled: 0,
            buf: Vec::with_capacity(len.min(limits::RAW_PREALLOC)),
        }
    }

    /// Copy until the declared length is reached. The buffer grows as bytes
    /// arrive, so a bogus length cannot force a large allocation up front.
    fn fill_from<S: ByteSource>(&mut self, source: &mut S) -> Result<()> {
        while self.filled < self.len {
            let want = (self.len - self.filled).min(limits::RAW_PREALLOC);
            let end = self.filled + want;
            if self.buf.len() < end {
                self.buf.resize(end, 0);
            }
            let n = source.read_some(&mut self.buf[self.filled..end])?;
            if n == 0 {
                return Err(Error::IncompleteInput);
            }
            self.filled += n;
        }
        Ok(())
    }
}

/// A walk over one complete value that ran out of input part-way through.
enum Suspended {
    Skip { entry_depth: usize },
    Visit { entry_depth: usize },
    Value { entry_depth: usize, builder: ValueBuilder },
}

/// Everything that changes while decoding. Owned by exactly one decoder.
#[derive(Default)]
struct DecoderState {
    /// Tag byte read from the source but not yet fully consumed
    head: Option<u8>,
    /// Decoded token a visitor rejected; the next read starts from it
    pending: Option<Token>,
    /// Blob payload in progress
    raw: Option<RawFill>,
    stack: ContainerStack,
    suspended: Option<Suspended>,
    /// Set by a terminal error; every later call returns it
    failed: Option<Error>,
}

/// A MessagePack decoder that pulls tokens from a [`ByteSource`].
///
/// Open arrays and maps are tracked on an explicit stack, so nesting depth is
/// limited by memory rather than the call stack. When the source reports
/// `Error::WouldBlock`, the pending tag byte, any partially filled blob, and any
/// interrupted [`skip`](Self::skip) or [`read_value`](Self::read_value) are kept;
/// repeating the same call after more input arrives continues where it stopped.
pub struct Decoder<S: ByteSource> {
    source: S,
    config: DecoderConfig,
    state: DecoderState,
}

impl<'a> Decoder<SliceSource<'a>> {
    /// Create a decoder over an in-memory byte slice.
    #[must_use]
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(SliceSource::new(data))
    }
}

impl<R: Read> Decoder<ReaderSource<R>> {
    /// Create a decoder over a blocking reader.
    pub fn from_reader(reader: R) -> Self {
        Self::new(ReaderSource::new(reader))
    }
}

impl<S: ByteSource> Decoder<S> {
    /// Create a new decoder for the given source.
    pub fn new(source: S) -> Self {
        Self::with_config(source, DecoderConfig::default())
    }

    /// Create a new decoder with custom configuration.
    pub fn with_config(source: S, config: DecoderConfig) -> Self {
        Self {
            source,
            config,
            state: DecoderState::default(),
        }
    }

    /// Get the decoder configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Current container nesting depth. Zero at a top-level value boundary.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.stack.depth()
    }

    /// Child slots left in the innermost open container (0 at top level).
    /// Maps count keys and values separately.
    #[must_use]
    pub fn remaining_in_container(&self) -> u64 {
        self.state.stack.top_remaining()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the source, e.g. to feed more input.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the decoder and return the source.
    pub fn into_source(self) -> S {
        self.source
    }

    // =========================================================================
    // Call wrappers
    // =========================================================================

    /// Run a walk-aware operation, recording terminal errors.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if let Some(err) = &self.state.failed {
            return Err(err.clone());
        }
        let result = f(self);
        if let Err(err) = &result {
            if err.is_terminal() {
                debug!(error = %err, depth = self.state.stack.depth(), "decoder failed");
                self.state.head = None;
                self.state.raw = None;
                self.state.pending = None;
                self.state.failed = Some(err.clone());
            }
        }
        result
    }

    /// Run an operation that abandons any interrupted walk. The frames that
    /// walk opened stay on the stack; they are real open containers.
    fn op<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.guarded(|d| {
            d.state.suspended = None;
            f(d)
        })
    }

    // =========================================================================
    // Token layer
    // =========================================================================

    /// Read the tag byte, reusing a pending one.
    #[inline]
    fn head(&mut self) -> Result<u8> {
        if let Some(b) = self.state.head {
            return Ok(b);
        }
        let b = self.source.read_byte()?;
        self.state.head = Some(b);
        Ok(b)
    }

    /// Kind of the next token, without consuming it.
    fn peek_kind(&mut self) -> Result<TokenKind> {
        if let Some(token) = &self.state.pending {
            return Ok(token.kind());
        }
        if self.state.raw.is_some() {
            return Ok(TokenKind::Raw);
        }
        let b = self.head()?;
        TokenKind::of(b).ok_or(Error::InvalidTag(b))
    }

    /// Read a 32-bit length or count, rejecting values with the sign bit set.
    #[inline]
    fn read_len32(&mut self) -> Result<u32> {
        let n = self.source.read_u32()?;
        if n & 0x8000_0000 != 0 {
            return Err(Error::SizeError);
        }
        Ok(n)
    }

    #[inline]
    fn check_container_len(&self, n: u32) -> Result<u32> {
        if n as usize > self.config.max_container_size {
            return Err(Error::MaxContainerSizeExceeded);
        }
        Ok(n)
    }

    /// Start a blob payload and fill as much of it as the source allows.
    fn begin_raw(&mut self, len: u32) -> Result<Token> {
        let len = len as usize;
        if len > self.config.max_raw_length {
            return Err(Error::MaxRawLengthExceeded);
        }
        // The header is consumed; from here the fill state carries the token.
        self.state.head = None;
        self.state.raw = Some(RawFill::new(len));
        self.finish_raw()
    }

    fn finish_raw(&mut self) -> Result<Token> {
        if let Some(raw) = self.state.raw.as_mut() {
            raw.fill_from(&mut self.source)?;
        }
        let bytes = self.state.raw.take().map(|raw| raw.buf).unwrap_or_default();
        Ok(Token::Bytes(bytes))
    }

    /// Consume one complete token. Container headers do not touch the stack here.
    #[allow(clippy::cast_possible_wrap)]
    fn read_token(&mut self) -> Result<Token> {
        if let Some(token) = self.state.pending.take() {
            return Ok(token);
        }
        if self.state.raw.is_some() {
            return self.finish_raw();
        }

        let b = self.head()?;

        if tag::is_fixint(b) {
            self.state.head = None;
            return Ok(Token::Int(i64::from(tag::fixint_value(b))));
        }
        if tag::is_fixraw(b) {
            return self.begin_raw(tag::fixraw_len(b));
        }
        if tag::is_fixarray(b) {
            self.state.head = None;
            return Ok(Token::ArrayHeader(tag::fix_container_len(b)));
        }
        if tag::is_fixmap(b) {
            self.state.head = None;
            return Ok(Token::MapHeader(tag::fix_container_len(b)));
        }

        let token = match b {
            tag::NIL => Token::Nil,
            tag::FALSE => Token::Bool(false),
            tag::TRUE => Token::Bool(true),
            tag::FLOAT32 => Token::Float32(self.source.read_f32()?),
            tag::FLOAT64 => Token::Float64(self.source.read_f64()?),
            tag::UINT8 => Token::UInt(u64::from(self.source.read_byte()?)),
            tag::UINT16 => Token::UInt(u64::from(self.source.read_u16()?)),
            tag::UINT32 => Token::UInt(u64::from(self.source.read_u32()?)),
            tag::UINT64 => Token::UInt(self.source.read_u64()?),
            tag::INT8 => Token::Int(i64::from(self.source.read_byte()? as i8)),
            tag::INT16 => Token::Int(i64::from(self.source.read_u16()? as i16)),
            tag::INT32 => Token::Int(i64::from(self.source.read_u32()? as i32)),
            tag::INT64 => Token::Int(self.source.read_u64()? as i64),
            tag::RAW16 => {
                let len = self.source.read_u16()?;
                return self.begin_raw(u32::from(len));
            }
            tag::RAW32 => {
                let len = self.read_len32()?;
                return self.begin_raw(len);
            }
            tag::ARRAY16 => {
                let n = self.source.read_u16()?;
                Token::ArrayHeader(self.check_container_len(u32::from(n))?)
            }
            tag::ARRAY32 => {
                let n = self.read_len32()?;
                Token::ArrayHeader(self.check_container_len(n)?)
            }
            tag::MAP16 => {
                let n = self.source.read_u16()?;
                Token::MapHeader(self.check_container_len(u32::from(n))?)
            }
            tag::MAP32 => {
                let n = self.read_len32()?;
                Token::MapHeader(self.check_container_len(n)?)
            }
            _ => return Err(Error::InvalidTag(b)),
        };
        self.state.head = None;
        Ok(token)
    }

    #[inline]
    fn check_depth(&self) -> Result<()> {
        if self.state.stack.depth() >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        Ok(())
    }

    fn push_frame(&mut self, kind: FrameKind, count: u32) -> Result<()> {
        self.check_depth()?;
        match kind {
            FrameKind::Array => self.state.stack.push_array(count),
            FrameKind::Map => self.state.stack.push_map(count),
        }
        Ok(())
    }

    /// Decode one token into `visitor`. Returns true when the token is a complete
    /// value, false when it opened a container whose children follow.
    ///
    /// A token the visitor rejects is kept as pending: it is neither counted
    /// nor framed, and the next read starts from it.
    fn dispatch<V: TokenVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<bool> {
        let token = self.read_token()?;
        let opens = matches!(token, Token::ArrayHeader(n) | Token::MapHeader(n) if n > 0);
        if opens {
            self.check_depth()?;
        }
        let accepted = match &token {
            Token::Nil => visitor.accept_nil(),
            Token::Bool(b) => visitor.accept_bool(*b),
            Token::Int(n) => visitor.accept_int(*n),
            Token::UInt(n) => visitor.accept_uint(*n),
            Token::Float32(f) => visitor.accept_f32(*f),
            Token::Float64(f) => visitor.accept_f64(*f),
            Token::Bytes(bytes) => visitor.accept_raw(bytes),
            Token::ArrayHeader(0) => visitor.accept_empty_array(),
            Token::MapHeader(0) => visitor.accept_empty_map(),
            Token::ArrayHeader(n) => visitor.accept_array(*n),
            Token::MapHeader(n) => visitor.accept_map(*n),
        };
        if let Err(err) = accepted {
            self.state.pending = Some(token);
            return Err(err);
        }
        match token {
            Token::ArrayHeader(n) if opens => self.state.stack.push_array(n),
            Token::MapHeader(n) if opens => self.state.stack.push_map(n),
            _ => return Ok(true),
        }
        Ok(false)
    }

    /// [`dispatch`](Self::dispatch) plus child accounting on the innermost container.
    fn dispatch_tracked<V: TokenVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<bool> {
        self.state.stack.check_count()?;
        let complete = self.dispatch(visitor)?;
        if complete {
            self.state.stack.reduce_count();
        }
        Ok(complete)
    }

    /// Dispatch tokens until the stack is back at `entry_depth`, closing each
    /// container as its last child is consumed.
    fn walk<V: TokenVisitor + ?Sized>(&mut self, entry_depth: usize, visitor: &mut V) -> Result<()> {
        loop {
            if self.state.stack.depth() == entry_depth || self.state.stack.top_remaining() > 0 {
                self.dispatch_tracked(visitor)?;
            }
            while self.state.stack.depth() > entry_depth && self.state.stack.top_remaining() == 0 {
                self.state.stack.pop()?;
                visitor.close_container()?;
            }
            if self.state.stack.depth() <= entry_depth {
                return Ok(());
            }
        }
    }

    fn skip_from(&mut self, entry_depth: usize) -> Result<()> {
        match self.walk(entry_depth, &mut IgnoreVisitor) {
            Err(Error::WouldBlock) => {
                self.state.suspended = Some(Suspended::Skip { entry_depth });
                Err(Error::WouldBlock)
            }
            other => other,
        }
    }

    /// Read one scalar token whose kind passes `accept`. A rejected kind leaves
    /// the token unconsumed.
    fn read_scalar(&mut self, accept: impl Fn(TokenKind) -> bool) -> Result<Token> {
        self.op(|d| {
            d.state.stack.check_count()?;
            if !accept(d.peek_kind()?) {
                return Err(Error::TypeMismatch);
            }
            let token = d.read_token()?;
            d.state.stack.reduce_count();
            Ok(token)
        })
    }

    fn read_integer(&mut self) -> Result<i128> {
        self.read_scalar(|k| matches!(k, TokenKind::Int | TokenKind::UInt))?
            .as_i128()
            .ok_or(Error::TypeMismatch)
    }

    #[inline]
    fn read_narrow<T: TryFrom<i128>>(&mut self) -> Result<T> {
        T::try_from(self.read_integer()?).map_err(|_| Error::Overflow)
    }

    // =========================================================================
    // Dispatch primitives
    // =========================================================================

    /// Decode one token into `visitor` without child accounting.
    ///
    /// A non-empty container header pushes a frame and returns `Ok(false)`; the
    /// caller is expected to keep decoding its children.
    pub fn decode_one<V: TokenVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<bool> {
        self.op(|d| d.dispatch(visitor))
    }

    /// Like [`decode_one`](Self::decode_one), but fails with `StackUnderflow` if
    /// the innermost container is already exhausted, and counts a completed
    /// token as one of its children.
    pub fn decode_one_tracked<V: TokenVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<bool> {
        self.op(|d| d.dispatch_tracked(visitor))
    }

    /// Kind of the next token, without consuming it.
    pub fn next_kind(&mut self) -> Result<TokenKind> {
        self.op(Self::peek_kind)
    }

    // =========================================================================
    // Typed reads
    // =========================================================================

    /// Consume the next token if it is nil.
    pub fn try_read_nil(&mut self) -> Result<bool> {
        self.op(|d| {
            d.state.stack.check_count()?;
            if d.peek_kind()? != TokenKind::Nil {
                return Ok(false);
            }
            d.read_token()?;
            d.state.stack.reduce_count();
            Ok(true)
        })
    }

    /// Like [`try_read_nil`](Self::try_read_nil), but also returns true without
    /// consuming anything when the innermost container has no children left, so
    /// optional trailing fields may be omitted.
    pub fn try_skip_nil(&mut self) -> Result<bool> {
        if let Some(err) = &self.state.failed {
            return Err(err.clone());
        }
        if !self.state.stack.is_empty() && self.state.stack.top_remaining() == 0 {
            return Ok(true);
        }
        self.try_read_nil()
    }

    pub fn read_nil(&mut self) -> Result<()> {
        if self.try_read_nil()? {
            Ok(())
        } else {
            Err(Error::TypeMismatch)
        }
    }

    pub fn read_boolean(&mut self) -> Result<bool> {
        match self.read_scalar(|k| k == TokenKind::Bool)? {
            Token::Bool(b) => Ok(b),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn read_byte(&mut self) -> Result<i8> {
        self.read_narrow()
    }

    pub fn read_short(&mut self) -> Result<i16> {
        self.read_narrow()
    }

    pub fn read_int(&mut self) -> Result<i32> {
        self.read_narrow()
    }

    pub fn read_long(&mut self) -> Result<i64> {
        self.read_narrow()
    }

    /// Read any integer, including uint64 values above `i64::MAX`.
    pub fn read_big_int(&mut self) -> Result<i128> {
        self.read_integer()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_narrow()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_narrow()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_narrow()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_narrow()
    }

    /// Read a float32 or float64, narrowing to f32.
    pub fn read_float(&mut self) -> Result<f32> {
        match self.read_scalar(|k| matches!(k, TokenKind::Float32 | TokenKind::Float64))? {
            Token::Float32(f) => Ok(f),
            Token::Float64(f) => Ok(f as f32),
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Read a float32 or float64.
    pub fn read_double(&mut self) -> Result<f64> {
        match self.read_scalar(|k| matches!(k, TokenKind::Float32 | TokenKind::Float64))? {
            Token::Float32(f) => Ok(f64::from(f)),
            Token::Float64(f) => Ok(f),
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Read a blob as owned bytes.
    pub fn read_byte_string(&mut self) -> Result<Vec<u8>> {
        match self.read_scalar(|k| k == TokenKind::Raw)? {
            Token::Bytes(bytes) => Ok(bytes),
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Read a blob and validate it as UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        into_utf8(self.read_byte_string()?)
    }

    // =========================================================================
    // Containers
    // =========================================================================

    fn read_container_begin(&mut self, kind: FrameKind) -> Result<u32> {
        self.op(|d| {
            d.state.stack.check_count()?;
            let expected = match kind {
                FrameKind::Array => TokenKind::Array,
                FrameKind::Map => TokenKind::Map,
            };
            if d.peek_kind()? != expected {
                return Err(Error::TypeMismatch);
            }
            let count = match d.read_token()? {
                Token::ArrayHeader(n) | Token::MapHeader(n) => n,
                _ => return Err(Error::TypeMismatch),
            };
            // Empty containers get a frame too, so the matching end call succeeds.
            d.push_frame(kind, count)?;
            Ok(count)
        })
    }

    fn read_container_end(&mut self, kind: FrameKind, strict: bool) -> Result<()> {
        self.guarded(|d| {
            // Finish a drain that ran out of input last time.
            if !strict {
                if let Some(Suspended::Skip { entry_depth }) = d.state.suspended.take() {
                    d.skip_from(entry_depth)?;
                }
            }
            d.state.suspended = None;

            let remaining = match d.state.stack.top() {
                Some(frame) if frame.kind == kind => frame.remaining,
                _ => return Err(Error::StackMismatch),
            };
            if remaining > 0 {
                if strict {
                    return Err(Error::IncompleteContainer);
                }
                trace!(remaining, ?kind, "draining unread children");
                for _ in 0..remaining {
                    let entry_depth = d.state.stack.depth();
                    d.skip_from(entry_depth)?;
                }
            }
            d.state.stack.pop()?;
            Ok(())
        })
    }

    /// Read an array header and open it. Returns the element count.
    pub fn read_array_begin(&mut self) -> Result<u32> {
        self.read_container_begin(FrameKind::Array)
    }

    /// Close the innermost array. With `strict`, unread elements are an error;
    /// otherwise they are skipped.
    pub fn read_array_end(&mut self, strict: bool) -> Result<()> {
        self.read_container_end(FrameKind::Array, strict)
    }

    /// Read a map header and open it. Returns the pair count.
    pub fn read_map_begin(&mut self) -> Result<u32> {
        self.read_container_begin(FrameKind::Map)
    }

    /// Close the innermost map. With `strict`, unread keys or values are an
    /// error; otherwise they are skipped.
    pub fn read_map_end(&mut self, strict: bool) -> Result<()> {
        self.read_container_end(FrameKind::Map, strict)
    }

    // =========================================================================
    // Whole values
    // =========================================================================

    /// Consume one complete value, scalar or subtree, without building it.
    pub fn skip(&mut self) -> Result<()> {
        self.guarded(|d| {
            let entry_depth = match d.state.suspended.take() {
                Some(Suspended::Skip { entry_depth }) => entry_depth,
                _ => d.state.stack.depth(),
            };
            d.skip_from(entry_depth)
        })
    }

    /// Feed one complete value into `visitor`, including a `close_container`
    /// call each time a container receives its last child.
    pub fn visit_value<V: TokenVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        self.guarded(|d| {
            let entry_depth = match d.state.suspended.take() {
                Some(Suspended::Visit { entry_depth }) => entry_depth,
                _ => d.state.stack.depth(),
            };
            match d.walk(entry_depth, visitor) {
                Err(Error::WouldBlock) => {
                    d.state.suspended = Some(Suspended::Visit { entry_depth });
                    Err(Error::WouldBlock)
                }
                other => other,
            }
        })
    }

    /// Decode one complete value into a [`Value`] tree.
    pub fn read_value(&mut self) -> Result<Value> {
        self.guarded(|d| {
            let (entry_depth, mut builder) = match d.state.suspended.take() {
                Some(Suspended::Value { entry_depth, builder }) => (entry_depth, builder),
                _ => (d.state.stack.depth(), ValueBuilder::new()),
            };
            match d.walk(entry_depth, &mut builder) {
                Ok(()) => builder.finish(),
                Err(Error::WouldBlock) => {
                    d.state.suspended = Some(Suspended::Value { entry_depth, builder });
                    Err(Error::WouldBlock)
                }
                Err(e) => Err(e),
            }
        })
    }

    /// Returns true at a top-level value boundary with the source exhausted.
    pub fn is_at_end(&mut self) -> Result<bool> {
        self.guarded(|d| {
            if !d.state.stack.is_empty()
                || d.state.head.is_some()
                || d.state.pending.is_some()
                || d.state.raw.is_some()
                || d.state.suspended.is_some()
            {
                return Ok(false);
            }
            d.source.is_at_end()
        })
    }

    /// Finish decoding and check for errors.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(err) = &self.state.failed {
            return Err(err.clone());
        }
        if !self.state.stack.is_empty() || self.state.suspended.is_some() {
            return Err(Error::IncompleteContainer);
        }
        if !self.config.allow_trailing_bytes && !self.is_at_end()? {
            return Err(Error::TrailingBytes);
        }
        Ok(())
    }
}
