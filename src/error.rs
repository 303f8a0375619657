// ABOUTME: Error types for MessagePack encoding and decoding.
// ABOUTME: Each variant has a stable snake_case name for matching in tests and logs.

use std::fmt;

/// The result type for MessagePack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during MessagePack encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unrecognized leading byte. Terminal for the decoder that saw it.
    InvalidTag(u8),

    /// The decoded token kind does not match the requested typed read.
    TypeMismatch,

    /// An integer does not fit the requested width.
    Overflow,

    /// A declared length or count has its sign bit set.
    SizeError,

    /// The source ended before a header or payload was complete.
    /// Terminal for the decoder that saw it.
    IncompleteInput,

    /// A read was attempted after every child of the current container was consumed.
    StackUnderflow,

    /// A container end call did not match the innermost open container.
    StackMismatch,

    /// A strict container end call found unread children.
    IncompleteContainer,

    /// The source has no bytes available yet. The call may be retried.
    WouldBlock,

    /// A blob read as a string is not valid UTF-8.
    InvalidUtf8,

    /// Unconsumed bytes after decoding a complete document.
    TrailingBytes,

    /// Container nesting is deeper than the configured limit.
    MaxDepthExceeded,

    /// A blob is longer than the configured limit.
    MaxRawLengthExceeded,

    /// A container declares more children than the configured limit.
    MaxContainerSizeExceeded,

    /// I/O error from the underlying reader or writer.
    Io(String),

    /// Custom error message (for serde integration).
    Custom(String),
}

impl Error {
    /// Returns the stable error type name.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidTag(_) => "invalid_tag",
            Error::TypeMismatch => "type_mismatch",
            Error::Overflow => "overflow",
            Error::SizeError => "size_error",
            Error::IncompleteInput => "incomplete_input",
            Error::StackUnderflow => "stack_underflow",
            Error::StackMismatch => "stack_mismatch",
            Error::IncompleteContainer => "incomplete_container",
            Error::WouldBlock => "would_block",
            Error::InvalidUtf8 => "invalid_utf8",
            Error::TrailingBytes => "trailing_bytes",
            Error::MaxDepthExceeded => "max_depth_exceeded",
            Error::MaxRawLengthExceeded => "max_raw_length_exceeded",
            Error::MaxContainerSizeExceeded => "max_container_size_exceeded",
            Error::Io(_) => "io_error",
            Error::Custom(_) => "custom",
        }
    }

    /// Returns true if a decoder that produced this error must not be used again.
    ///
    /// Besides bad tags and truncated input, this covers rejected lengths and
    /// limits: their header bytes are already consumed, so the decoder can no
    /// longer find the next token.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::InvalidTag(_)
                | Error::IncompleteInput
                | Error::SizeError
                | Error::MaxDepthExceeded
                | Error::MaxRawLengthExceeded
                | Error::MaxContainerSizeExceeded
                | Error::Io(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTag(tag) => write!(f, "invalid tag byte: 0x{tag:02x}"),
            Error::TypeMismatch => write!(f, "token type does not match the requested read"),
            Error::Overflow => write!(f, "integer out of range for the requested width"),
            Error::SizeError => write!(f, "declared length or count is too large"),
            Error::IncompleteInput => write!(f, "unexpected end of input"),
            Error::StackUnderflow => write!(f, "all children of the current container were already read"),
            Error::StackMismatch => write!(f, "container end does not match the open container"),
            Error::IncompleteContainer => write!(f, "container closed with unread children"),
            Error::WouldBlock => write!(f, "no input available yet"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            Error::TrailingBytes => write!(f, "trailing bytes after document"),
            Error::MaxDepthExceeded => write!(f, "maximum container depth exceeded"),
            Error::MaxRawLengthExceeded => write!(f, "maximum raw length exceeded"),
            Error::MaxContainerSizeExceeded => write!(f, "maximum container size exceeded"),
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::IncompleteInput,
            std::io::ErrorKind::WouldBlock => Error::WouldBlock,
            _ => Error::Io(err.to_string()),
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
