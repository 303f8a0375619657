// ABOUTME: Defines MessagePack tag bytes, token kinds, and the decoded Token type.
// ABOUTME: Tag constants map directly to the wire format's first byte of every token.

/// Tag bytes for MessagePack values.
pub mod tag {
    // Positive fixint: 0x00-0x7f (0 to 127)
    pub const POSITIVE_FIXINT_MAX: u8 = 0x7f;

    // Fixmap: 0x80-0x8f, pair count in the low 4 bits
    pub const FIXMAP: u8 = 0x80;
    pub const FIXMAP_MAX_LEN: usize = 15;

    // Fixarray: 0x90-0x9f, element count in the low 4 bits
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXARRAY_MAX_LEN: usize = 15;

    // Fixraw: 0xa0-0xbf, byte length in the low 5 bits
    pub const FIXRAW: u8 = 0xa0;
    pub const FIXRAW_MAX_LEN: usize = 31;

    pub const NIL: u8 = 0xc0;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;

    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;

    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;

    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;

    pub const RAW16: u8 = 0xda;
    pub const RAW32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;

    // Negative fixint: 0xe0-0xff (-32 to -1)
    pub const NEGATIVE_FIXINT_MIN: u8 = 0xe0;

    /// Check if a tag is a positive fixint (0 to 127)
    #[inline]
    pub const fn is_positive_fixint(tag: u8) -> bool {
        tag & 0x80 == 0
    }

    /// Check if a tag is a negative fixint (-32 to -1)
    #[inline]
    pub const fn is_negative_fixint(tag: u8) -> bool {
        tag >= NEGATIVE_FIXINT_MIN
    }

    /// Check if a tag is a fixint of either sign
    #[inline]
    pub const fn is_fixint(tag: u8) -> bool {
        is_positive_fixint(tag) || is_negative_fixint(tag)
    }

    /// Decode a fixint tag to its value
    #[inline]
    pub const fn fixint_value(tag: u8) -> i8 {
        tag as i8
    }

    /// Check if a tag is a fixraw (0-31 bytes)
    #[inline]
    pub const fn is_fixraw(tag: u8) -> bool {
        tag & 0xe0 == FIXRAW
    }

    /// Check if a tag is a fixarray (0-15 elements)
    #[inline]
    pub const fn is_fixarray(tag: u8) -> bool {
        tag & 0xf0 == FIXARRAY
    }

    /// Check if a tag is a fixmap (0-15 pairs)
    #[inline]
    pub const fn is_fixmap(tag: u8) -> bool {
        tag & 0xf0 == FIXMAP
    }

    /// Length embedded in a fixraw tag
    #[inline]
    pub const fn fixraw_len(tag: u8) -> u32 {
        (tag & 0x1f) as u32
    }

    /// Count embedded in a fixarray or fixmap tag
    #[inline]
    pub const fn fix_container_len(tag: u8) -> u32 {
        (tag & 0x0f) as u32
    }

    /// Check if a tag is one of the unsigned sized integers
    #[inline]
    pub const fn is_uint(tag: u8) -> bool {
        tag >= UINT8 && tag <= UINT64
    }

    /// Check if a tag is one of the signed sized integers
    #[inline]
    pub const fn is_int(tag: u8) -> bool {
        tag >= INT8 && tag <= INT64
    }
}

/// The kind of token a tag byte introduces, known before its payload is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Nil,
    Bool,
    Int,
    UInt,
    Float32,
    Float64,
    Raw,
    Array,
    Map,
}

impl TokenKind {
    /// Classify a tag byte. Returns `None` for bytes the format does not define.
    #[must_use]
    pub const fn of(b: u8) -> Option<TokenKind> {
        if tag::is_fixint(b) {
            return Some(TokenKind::Int);
        }
        if tag::is_fixraw(b) {
            return Some(TokenKind::Raw);
        }
        if tag::is_fixarray(b) {
            return Some(TokenKind::Array);
        }
        if tag::is_fixmap(b) {
            return Some(TokenKind::Map);
        }
        match b {
            tag::NIL => Some(TokenKind::Nil),
            tag::FALSE | tag::TRUE => Some(TokenKind::Bool),
            tag::FLOAT32 => Some(TokenKind::Float32),
            tag::FLOAT64 => Some(TokenKind::Float64),
            b if tag::is_uint(b) => Some(TokenKind::UInt),
            b if tag::is_int(b) => Some(TokenKind::Int),
            tag::RAW16 | tag::RAW32 => Some(TokenKind::Raw),
            tag::ARRAY16 | tag::ARRAY32 => Some(TokenKind::Array),
            tag::MAP16 | tag::MAP32 => Some(TokenKind::Map),
            _ => None,
        }
    }
}

/// One decoded wire unit.
///
/// Unsigned sized tags always decode to `UInt`, so a uint64 above `i64::MAX`
/// is never reinterpreted as a negative number.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
    ArrayHeader(u32),
    MapHeader(u32),
}

impl Token {
    /// The kind of this token.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Nil => TokenKind::Nil,
            Token::Bool(_) => TokenKind::Bool,
            Token::Int(_) => TokenKind::Int,
            Token::UInt(_) => TokenKind::UInt,
            Token::Float32(_) => TokenKind::Float32,
            Token::Float64(_) => TokenKind::Float64,
            Token::Bytes(_) => TokenKind::Raw,
            Token::ArrayHeader(_) => TokenKind::Array,
            Token::MapHeader(_) => TokenKind::Map,
        }
    }

    /// Widen an integer token to i128 so every integer tag fits.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Token::Int(n) => Some(i128::from(*n)),
            Token::UInt(n) => Some(i128::from(*n)),
            _ => None,
        }
    }
}

/// Default resource limits.
///
/// Defaults sit at the format ceiling; lower them when decoding untrusted input.
pub mod limits {
    /// Largest length or count a 32-bit field may declare (sign bit clear)
    pub const FORMAT_MAX_LEN: usize = 0x7fff_ffff;

    /// Maximum container nesting depth (bounded only by memory)
    pub const MAX_DEPTH: usize = usize::MAX;

    /// Maximum blob length in bytes
    pub const MAX_RAW_LENGTH: usize = FORMAT_MAX_LEN;

    /// Maximum elements (or pairs) in a single container
    pub const MAX_CONTAINER_SIZE: usize = FORMAT_MAX_LEN;

    /// Largest buffer reserved up front for a blob before its bytes arrive
    pub const RAW_PREALLOC: usize = 64 * 1024;
}
