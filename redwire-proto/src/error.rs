//! # Decode Errors
//!
//! Purpose: Name every way an incoming byte stream can be malformed. A decode
//! error means the stream framing can no longer be trusted, so the owning
//! connection must be torn down rather than resynchronized.

use thiserror::Error;

/// Malformed-input failures raised by the reply parser.
///
/// These are distinct from incomplete input: the parser reports "need more
/// bytes" through its `Ok(None)` return, never through this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The first byte of a reply is not a known type prefix.
    #[error("unknown reply type prefix 0x{0:02x}")]
    UnknownPrefix(u8),
    /// A `$`/`*`/`%`/`~`/`>`/`=` size header is not a valid length.
    #[error("invalid length in size header")]
    InvalidLength,
    /// An integer reply holds a non-numeric or out-of-range literal.
    #[error("invalid integer literal")]
    InvalidInteger,
    /// A double reply holds an unparseable literal.
    #[error("invalid double literal")]
    InvalidDouble,
    /// A boolean reply holds something other than `t` or `f`.
    #[error("invalid boolean literal")]
    InvalidBoolean,
    /// A big-number reply holds non-digit characters.
    #[error("invalid big number literal")]
    InvalidBigNumber,
    /// A line that must be text is not valid UTF-8.
    #[error("reply text is not valid UTF-8")]
    InvalidUtf8,
    /// A payload is not terminated by CRLF where the protocol requires one.
    #[error("missing CRLF terminator")]
    MissingCrlf,
    /// A verbatim string payload is too short to carry its format tag.
    #[error("malformed verbatim string payload")]
    InvalidVerbatim,
    /// Aggregate replies nest deeper than the parser supports.
    #[error("reply nesting exceeds supported depth")]
    NestingTooDeep,
}
